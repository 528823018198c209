use super::{BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{names, value::Value};

/// Invert the colours of acquired images.
#[derive(Debug)]
pub struct InvertOption {
    base: BaseOption,
    checked: bool,
}

impl InvertOption {
    pub fn new() -> Self {
        Self {
            base: BaseOption::synthetic(),
            checked: false,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

impl Default for InvertOption {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionModel for InvertOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Bool
    }

    fn name(&self) -> &str {
        names::INVERT_COLORS
    }

    fn title(&self) -> &str {
        "Invert colors"
    }

    fn description(&self) -> &str {
        "Invert the colors of the scanned image."
    }

    fn state(&self) -> OptionState {
        OptionState::Active
    }

    fn value(&self) -> Option<Value> {
        Some(Value::Bool(self.checked))
    }

    fn set_value(&mut self, value: &Value) -> bool {
        let Some(checked) = value.to_bool() else {
            return false;
        };

        if checked != self.checked {
            self.checked = checked;
            self.base.emit(OptionEvent::ValueChanged(Value::Bool(checked)));
        }
        true
    }

    fn value_size(&self) -> usize {
        1
    }

    fn value_as_string(&self) -> String {
        self.checked.to_string()
    }

    fn needs_polling(&self) -> bool {
        false
    }
}
