//! Typed view of SANE options.
//!
//! Every backend option is classified once from its descriptor and wrapped in
//! one of the variants below. Options never call back into the session: they
//! queue [`OptionEvent`]s which the session drains after each operation.

mod action;
mod base;
mod batch;
mod boolean;
mod double;
mod gamma;
mod integer;
mod invert;
mod list;
mod page_size;
mod string;

pub use action::ActionOption;
pub use base::{state_of, BaseOption, DetectFailOption};
pub use batch::{BatchDelayOption, BatchModeOption};
pub use boolean::BoolOption;
pub use double::DoubleOption;
pub use gamma::GammaOption;
pub use integer::IntegerOption;
pub use invert::InvertOption;
pub use list::ListOption;
pub use page_size::{PageSize, PageSizeOption};
pub use string::StringOption;

pub(crate) use base::write_option;

use crate::{
    backend::DeviceHandle,
    codec::WORD_SIZE,
    descriptor::{Constraint, OptionDescriptor, Unit, ValueType},
    names,
    value::Value,
};
use std::sync::Arc;

/// Kind of option a descriptor maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    DetectFail,
    Bool,
    Integer,
    Double,
    ValueList,
    String,
    Gamma,
    Action,
}

impl OptionType {
    /// Picks the variant for a descriptor. `None` and anything not understood
    /// classify as `DetectFail`.
    pub fn classify(descriptor: Option<&OptionDescriptor>) -> Self {
        let Some(desc) = descriptor else {
            return Self::DetectFail;
        };

        let word_sized = desc.size == WORD_SIZE;

        let ty = match (&desc.constraint, desc.ty) {
            (Constraint::WordList(_) | Constraint::StringList(_), _) => Self::ValueList,

            (Constraint::None, ValueType::Bool) => Self::Bool,
            (Constraint::None, ValueType::Int) if word_sized => Self::Integer,
            (Constraint::None, ValueType::Fixed) if word_sized => Self::Double,
            (Constraint::None, ValueType::Button) => Self::Action,
            (Constraint::None, ValueType::String) => Self::String,

            (Constraint::Range { .. }, ValueType::Bool) => Self::Bool,
            (Constraint::Range { .. }, ValueType::Int) if word_sized => Self::Integer,
            (Constraint::Range { .. }, ValueType::Int) if names::is_gamma_vector(&desc.name) => {
                Self::Gamma
            }
            (Constraint::Range { .. }, ValueType::Fixed) if word_sized => Self::Double,
            (Constraint::Range { .. }, ValueType::Button) => Self::Action,

            _ => Self::DetectFail,
        };

        if ty == Self::DetectFail && desc.ty != ValueType::Group {
            log::debug!(
                "Can not handle option '{}': {:?} with {:?}, size {}",
                desc.name,
                desc.ty,
                desc.constraint,
                desc.size,
            );
        }

        ty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionState {
    Hidden,
    Disabled,
    Active,
}

/// Something an option wants the session to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionEvent {
    ValueChanged(Value),
    /// A write changed the set or layout of options.
    OptionsNeedReload,
    /// A write changed the values of other options.
    ValuesNeedReload,
    Reloaded,
    /// A page size was picked, the scan area has to follow. Sizes are in mm.
    PageSizeSelected { width: f64, height: f64 },
}

/// Operations shared by all option variants.
///
/// Defaults describe an inert option backed by [`BaseOption`].
pub trait OptionModel {
    fn base(&self) -> &BaseOption;

    fn base_mut(&mut self) -> &mut BaseOption;

    fn option_type(&self) -> OptionType;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn title(&self) -> &str {
        self.base().title()
    }

    fn description(&self) -> &str {
        self.base().description()
    }

    fn state(&self) -> OptionState {
        self.base().state(self.option_type())
    }

    /// Re-fetches the descriptor and everything derived from it.
    fn read_option(&mut self) {
        self.base_mut().begin_reload();
        self.base_mut().end_reload();
    }

    /// Re-reads the value from the device, queueing a change event when it differs.
    fn read_value(&mut self) {}

    fn value(&self) -> Option<Value> {
        None
    }

    /// Returns `false` on invalid input or when the option can't be written.
    fn set_value(&mut self, _value: &Value) -> bool {
        false
    }

    fn minimum_value(&self) -> Option<Value> {
        None
    }

    fn maximum_value(&self) -> Option<Value> {
        None
    }

    fn step_value(&self) -> Option<Value> {
        None
    }

    /// Entries as shown to a user.
    fn value_list(&self) -> Vec<Value> {
        Vec::new()
    }

    /// Entries as sent to the device.
    fn internal_value_list(&self) -> Vec<Value> {
        Vec::new()
    }

    fn unit(&self) -> Unit {
        self.base().unit()
    }

    fn value_size(&self) -> usize {
        self.base().value_size()
    }

    /// Text form for the settings map, empty to leave the option out.
    fn value_as_string(&self) -> String {
        String::new()
    }

    fn needs_polling(&self) -> bool {
        self.base().needs_polling()
    }

    fn store_current_data(&mut self) -> bool {
        let ty = self.option_type();
        self.base_mut().store_current_data(ty)
    }

    fn restore_saved_data(&mut self) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(mut data) = self.base().saved_data() else {
            return false;
        };

        write_option(self, &mut data);
        self.read_value();

        true
    }

    fn take_events(&mut self) -> Vec<OptionEvent> {
        self.base_mut().take_events()
    }
}

/// A scanner option of any kind.
pub enum ScanOption {
    Bool(BoolOption),
    Integer(IntegerOption),
    Double(DoubleOption),
    String(StringOption),
    ValueList(ListOption),
    Gamma(GammaOption),
    Action(ActionOption),
    PageSize(PageSizeOption),
    BatchMode(BatchModeOption),
    BatchDelay(BatchDelayOption),
    Invert(InvertOption),
    DetectFail(DetectFailOption),
}

macro_rules! each_variant {
    ($self:expr, $option:ident => $body:expr) => {
        match $self {
            ScanOption::Bool($option) => $body,
            ScanOption::Integer($option) => $body,
            ScanOption::Double($option) => $body,
            ScanOption::String($option) => $body,
            ScanOption::ValueList($option) => $body,
            ScanOption::Gamma($option) => $body,
            ScanOption::Action($option) => $body,
            ScanOption::PageSize($option) => $body,
            ScanOption::BatchMode($option) => $body,
            ScanOption::BatchDelay($option) => $body,
            ScanOption::Invert($option) => $body,
            ScanOption::DetectFail($option) => $body,
        }
    };
}

impl ScanOption {
    /// Wraps backend option `index` and reads its descriptor and value.
    pub fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        let ty = OptionType::classify(device.option_descriptor(index).as_ref());

        let mut option = match ty {
            OptionType::DetectFail => Self::DetectFail(DetectFailOption::new(device, index)),
            OptionType::Bool => Self::Bool(BoolOption::new(device, index)),
            OptionType::Integer => Self::Integer(IntegerOption::new(device, index)),
            OptionType::Double => Self::Double(DoubleOption::new(device, index)),
            OptionType::ValueList => Self::ValueList(ListOption::new(device, index)),
            OptionType::String => Self::String(StringOption::new(device, index)),
            OptionType::Gamma => Self::Gamma(GammaOption::new(device, index)),
            OptionType::Action => Self::Action(ActionOption::new(device, index)),
        };

        option.read_option();
        option.read_value();

        option
    }

    pub fn as_model(&self) -> &dyn OptionModel {
        each_variant!(self, option => option)
    }

    pub fn as_model_mut(&mut self) -> &mut dyn OptionModel {
        each_variant!(self, option => option)
    }

    /// Backend index, `None` for client-side options.
    pub fn index(&self) -> Option<i32> {
        self.base().index()
    }
}

impl OptionModel for ScanOption {
    fn base(&self) -> &BaseOption {
        self.as_model().base()
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        self.as_model_mut().base_mut()
    }

    fn option_type(&self) -> OptionType {
        self.as_model().option_type()
    }

    fn name(&self) -> &str {
        self.as_model().name()
    }

    fn title(&self) -> &str {
        self.as_model().title()
    }

    fn description(&self) -> &str {
        self.as_model().description()
    }

    fn state(&self) -> OptionState {
        self.as_model().state()
    }

    fn read_option(&mut self) {
        self.as_model_mut().read_option()
    }

    fn read_value(&mut self) {
        self.as_model_mut().read_value()
    }

    fn value(&self) -> Option<Value> {
        self.as_model().value()
    }

    fn set_value(&mut self, value: &Value) -> bool {
        self.as_model_mut().set_value(value)
    }

    fn minimum_value(&self) -> Option<Value> {
        self.as_model().minimum_value()
    }

    fn maximum_value(&self) -> Option<Value> {
        self.as_model().maximum_value()
    }

    fn step_value(&self) -> Option<Value> {
        self.as_model().step_value()
    }

    fn value_list(&self) -> Vec<Value> {
        self.as_model().value_list()
    }

    fn internal_value_list(&self) -> Vec<Value> {
        self.as_model().internal_value_list()
    }

    fn unit(&self) -> Unit {
        self.as_model().unit()
    }

    fn value_size(&self) -> usize {
        self.as_model().value_size()
    }

    fn value_as_string(&self) -> String {
        self.as_model().value_as_string()
    }

    fn needs_polling(&self) -> bool {
        self.as_model().needs_polling()
    }

    fn store_current_data(&mut self) -> bool {
        self.as_model_mut().store_current_data()
    }

    fn restore_saved_data(&mut self) -> bool {
        self.as_model_mut().restore_saved_data()
    }

    fn take_events(&mut self) -> Vec<OptionEvent> {
        self.as_model_mut().take_events()
    }
}

impl std::fmt::Debug for ScanOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOption")
            .field("index", &self.index())
            .field("name", &self.name())
            .field("type", &self.option_type())
            .field("state", &self.state())
            .field("value", &self.value())
            .finish()
    }
}
