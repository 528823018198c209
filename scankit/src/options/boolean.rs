use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{read_word, value_to_word},
    value::Value,
};
use std::sync::Arc;

#[derive(Debug)]
pub struct BoolOption {
    base: BaseOption,
    checked: bool,
}

impl BoolOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            checked: false,
        }
    }
}

impl OptionModel for BoolOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Bool
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::Bool) else {
            return;
        };

        let checked = read_word(&data) != 0;
        if checked != self.checked {
            self.checked = checked;
            self.base.emit(OptionEvent::ValueChanged(Value::Bool(checked)));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => Some(Value::Bool(self.checked)),
        }
    }

    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(checked) = value.to_bool() else {
            return false;
        };

        if checked == self.checked {
            return true;
        }

        self.checked = checked;
        let mut data = value_to_word(checked as i32);
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(Value::Bool(self.checked)));
        true
    }

    fn value_as_string(&self) -> String {
        match self.state() {
            OptionState::Hidden => String::new(),
            _ => self.checked.to_string(),
        }
    }
}
