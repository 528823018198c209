use super::{write_option, BaseOption, OptionModel, OptionState, OptionType};
use crate::{backend::DeviceHandle, codec::WORD_SIZE, value::Value};
use std::sync::Arc;

/// A button on the device side, e.g. "calibrate now".
#[derive(Debug)]
pub struct ActionOption {
    base: BaseOption,
}

impl ActionOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
        }
    }
}

impl OptionModel for ActionOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Action
    }

    /// Triggers the action, the argument is ignored.
    fn set_value(&mut self, _value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let mut data = [0u8; WORD_SIZE];
        write_option(self, &mut data)
    }

    fn store_current_data(&mut self) -> bool {
        false
    }

    fn restore_saved_data(&mut self) -> bool {
        false
    }
}
