use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{read_word, value_to_word},
    descriptor::Constraint,
    value::Value,
};
use std::sync::Arc;

#[derive(Debug)]
pub struct IntegerOption {
    base: BaseOption,
    value: i32,
}

impl IntegerOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            value: 0,
        }
    }

    fn range(&self) -> Option<(i32, i32, i32)> {
        match &self.base.descriptor()?.constraint {
            Constraint::Range { range, quant } => Some((*range.start(), *range.end(), *quant)),
            _ => None,
        }
    }
}

impl OptionModel for IntegerOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Integer
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::Integer) else {
            return;
        };

        let value = read_word(&data);
        if value != self.value {
            self.value = value;
            self.base.emit(OptionEvent::ValueChanged(Value::Int(value)));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => Some(Value::Int(self.value)),
        }
    }

    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(value) = value.to_int() else {
            return false;
        };

        if value == self.value {
            return true;
        }

        self.value = value;
        let mut data = value_to_word(value);
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(Value::Int(self.value)));
        true
    }

    fn minimum_value(&self) -> Option<Value> {
        let min = self.range().map_or(i32::MIN, |(min, _, _)| min);
        Some(Value::Int(min))
    }

    fn maximum_value(&self) -> Option<Value> {
        let max = self.range().map_or(i32::MAX, |(_, max, _)| max);
        Some(Value::Int(max))
    }

    fn step_value(&self) -> Option<Value> {
        // Some backends report a zero quantization.
        let step = match self.range() {
            Some((_, _, quant)) if quant != 0 => quant,
            _ => 1,
        };
        Some(Value::Int(step))
    }

    fn value_as_string(&self) -> String {
        match self.state() {
            OptionState::Hidden => String::new(),
            _ => self.value.to_string(),
        }
    }
}
