use super::{OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::WORD_SIZE,
    descriptor::{Capabilities, ControlInfo, OptionDescriptor, Unit},
};
use std::{fmt, mem, sync::Arc};

/// State shared by all option variants: the device binding, the current
/// descriptor, a stored value snapshot and the queue of pending events.
pub struct BaseOption {
    device: Option<Arc<dyn DeviceHandle>>,
    index: i32,
    descriptor: Option<OptionDescriptor>,
    saved: Option<Vec<u8>>,
    events: Vec<OptionEvent>,
}

pub(crate) enum WriteOutcome {
    Refused,
    Failed,
    Written { inexact: bool },
}

/// Visibility of an option with `descriptor`, see [`OptionState`].
pub fn state_of(descriptor: Option<&OptionDescriptor>, ty: OptionType) -> OptionState {
    let Some(desc) = descriptor else {
        return OptionState::Hidden;
    };

    if !desc.is_detectable() || !desc.is_active() || (desc.size == 0 && ty != OptionType::Action) {
        OptionState::Hidden
    } else if !desc.is_settable() {
        OptionState::Disabled
    } else {
        OptionState::Active
    }
}

impl BaseOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            device: Some(device),
            index,
            descriptor: None,
            saved: None,
            events: Vec::new(),
        }
    }

    /// Base of an option that only exists on the client side.
    pub(crate) fn synthetic() -> Self {
        Self {
            device: None,
            index: -1,
            descriptor: None,
            saved: None,
            events: Vec::new(),
        }
    }

    pub fn index(&self) -> Option<i32> {
        self.device.as_ref().map(|_| self.index)
    }

    pub fn descriptor(&self) -> Option<&OptionDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn name(&self) -> &str {
        self.descriptor.as_ref().map_or("", |desc| desc.name.as_str())
    }

    pub fn title(&self) -> &str {
        self.descriptor.as_ref().map_or("", |desc| desc.title.as_str())
    }

    pub fn description(&self) -> &str {
        self.descriptor
            .as_ref()
            .map_or("", |desc| desc.description.as_str())
    }

    pub fn unit(&self) -> Unit {
        self.descriptor.as_ref().map_or(Unit::None, |desc| desc.unit)
    }

    /// Number of words in the value buffer.
    pub fn value_size(&self) -> usize {
        self.descriptor
            .as_ref()
            .map_or(0, |desc| desc.size / WORD_SIZE)
    }

    pub fn state(&self, ty: OptionType) -> OptionState {
        state_of(self.descriptor.as_ref(), ty)
    }

    /// Read-only options driven by the hardware, e.g. scan buttons.
    pub fn needs_polling(&self) -> bool {
        self.descriptor.as_ref().is_some_and(|desc| {
            desc.capabilities.contains(Capabilities::SOFT_DETECT)
                && !desc.capabilities.contains(Capabilities::SOFT_SELECT)
        })
    }

    pub(crate) fn begin_reload(&mut self) {
        if let Some(device) = &self.device {
            self.descriptor = device.option_descriptor(self.index);
        }
    }

    pub(crate) fn end_reload(&mut self) {
        self.emit(OptionEvent::Reloaded);
    }

    /// Current raw value, `None` when hidden or the device refuses.
    pub(crate) fn read_data(&self, ty: OptionType) -> Option<Vec<u8>> {
        if self.state(ty) == OptionState::Hidden {
            return None;
        }

        let device = self.device.as_ref()?;
        let desc = self.descriptor.as_ref()?;

        let mut data = vec![0u8; desc.size];
        match device.get_value(self.index, &mut data) {
            Ok(()) => Some(data),
            Err(err) => {
                log::debug!("Failed to read option '{}': {err}", desc.name);
                None
            }
        }
    }

    pub(crate) fn write_data(&mut self, ty: OptionType, data: &mut [u8]) -> WriteOutcome {
        if self.state(ty) != OptionState::Active {
            return WriteOutcome::Refused;
        }

        let Some(device) = &self.device else {
            return WriteOutcome::Refused;
        };

        match device.set_value(self.index, data) {
            Ok(info) => {
                if info.contains(ControlInfo::RELOAD_OPTIONS) {
                    self.emit(OptionEvent::OptionsNeedReload);
                } else if info.contains(ControlInfo::RELOAD_PARAMS) {
                    self.emit(OptionEvent::ValuesNeedReload);
                }

                WriteOutcome::Written {
                    inexact: info.contains(ControlInfo::INEXACT),
                }
            }
            Err(err) => {
                log::warn!("Failed to write option '{}': {err}", self.name());
                WriteOutcome::Failed
            }
        }
    }

    pub(crate) fn store_current_data(&mut self, ty: OptionType) -> bool {
        match self.read_data(ty) {
            Some(data) => {
                self.saved = Some(data);
                true
            }
            None => false,
        }
    }

    pub(crate) fn saved_data(&self) -> Option<Vec<u8>> {
        self.saved.clone()
    }

    pub(crate) fn emit(&mut self, event: OptionEvent) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<OptionEvent> {
        mem::take(&mut self.events)
    }
}

impl fmt::Debug for BaseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseOption")
            .field("index", &self.index)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Writes `data` to the device on behalf of `option` and resynchronizes it when
/// the device rejected or adjusted the value.
pub(crate) fn write_option<T: OptionModel + ?Sized>(option: &mut T, data: &mut [u8]) -> bool {
    let ty = option.option_type();

    match option.base_mut().write_data(ty, data) {
        WriteOutcome::Refused => false,
        WriteOutcome::Failed => {
            option.read_value();
            false
        }
        WriteOutcome::Written { inexact } => {
            if inexact {
                option.read_value();
            }
            true
        }
    }
}

/// An option that could not be interpreted, including group headers. Only its
/// descriptor is tracked.
#[derive(Debug)]
pub struct DetectFailOption {
    base: BaseOption,
}

impl DetectFailOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
        }
    }
}

impl OptionModel for DetectFailOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::DetectFail
    }

    fn store_current_data(&mut self) -> bool {
        false
    }

    fn restore_saved_data(&mut self) -> bool {
        false
    }
}
