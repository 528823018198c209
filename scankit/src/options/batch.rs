use super::{BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{descriptor::Unit, names, value::Value};

const MAX_DELAY: i32 = 300;

/// Repeat the scan on a timer after each page.
#[derive(Debug)]
pub struct BatchModeOption {
    base: BaseOption,
    enabled: bool,
}

impl BatchModeOption {
    pub fn new() -> Self {
        Self {
            base: BaseOption::synthetic(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for BatchModeOption {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionModel for BatchModeOption {
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
        names::BATCH_MODE
    }

    fn title(&self) -> &str {
        "Batch mode with timer"
    }

    fn description(&self) -> &str {
        "Allows to scan images automatically after a given time delay."
    }

    fn state(&self) -> OptionState {
        OptionState::Active
    }

    fn value(&self) -> Option<Value> {
        Some(Value::Bool(self.enabled))
    }

    fn set_value(&mut self, value: &Value) -> bool {
        let Some(enabled) = value.to_bool() else {
            return false;
        };

        if enabled != self.enabled {
            self.enabled = enabled;
            self.base.emit(OptionEvent::ValueChanged(Value::Bool(enabled)));
        }
        true
    }

    fn value_size(&self) -> usize {
        1
    }

    fn value_as_string(&self) -> String {
        self.enabled.to_string()
    }

    fn needs_polling(&self) -> bool {
        false
    }
}

/// Delay between two pages in batch mode.
#[derive(Debug)]
pub struct BatchDelayOption {
    base: BaseOption,
    delay: i32,
}

impl BatchDelayOption {
    pub fn new() -> Self {
        Self {
            base: BaseOption::synthetic(),
            delay: 10,
        }
    }

    /// Delay in seconds.
    pub fn delay(&self) -> i32 {
        self.delay
    }
}

impl Default for BatchDelayOption {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionModel for BatchDelayOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Integer
    }

    fn name(&self) -> &str {
        names::BATCH_DELAY
    }

    fn title(&self) -> &str {
        "Batch mode time delay"
    }

    fn description(&self) -> &str {
        "Specify the time delay between each scan when in batch mode."
    }

    fn state(&self) -> OptionState {
        OptionState::Active
    }

    fn value(&self) -> Option<Value> {
        Some(Value::Int(self.delay))
    }

    fn set_value(&mut self, value: &Value) -> bool {
        let Some(delay) = value.to_int() else {
            return false;
        };
        let delay = delay.clamp(0, MAX_DELAY);

        if delay != self.delay {
            self.delay = delay;
            self.base.emit(OptionEvent::ValueChanged(Value::Int(delay)));
        }
        true
    }

    fn minimum_value(&self) -> Option<Value> {
        Some(Value::Int(0))
    }

    fn maximum_value(&self) -> Option<Value> {
        Some(Value::Int(MAX_DELAY))
    }

    fn step_value(&self) -> Option<Value> {
        Some(Value::Int(1))
    }

    fn unit(&self) -> Unit {
        Unit::Second
    }

    fn value_size(&self) -> usize {
        1
    }

    fn value_as_string(&self) -> String {
        self.delay.to_string()
    }

    fn needs_polling(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_side_options_are_always_active() {
        let mut mode = BatchModeOption::new();
        assert_eq!(mode.state(), OptionState::Active);
        assert!(mode.set_value(&Value::from("true")));
        assert!(mode.set_value(&Value::from(true)));
        assert_eq!(
            mode.take_events(),
            vec![OptionEvent::ValueChanged(Value::Bool(true))]
        );

        let mut delay = BatchDelayOption::new();
        assert!(delay.set_value(&Value::from("3")));
        assert!(!delay.set_value(&Value::from("soon")));
        assert_eq!(delay.delay(), 3);
        assert_eq!(delay.unit(), Unit::Second);
        assert_eq!(delay.maximum_value(), Some(Value::Int(300)));
        assert!(!delay.store_current_data());
        assert!(!delay.restore_saved_data());
    }
}
