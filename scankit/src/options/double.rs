use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{double_to_fixed, fixed_to_double, read_word, value_to_word, FIXED_PRECISION},
    descriptor::Constraint,
    value::Value,
};
use std::sync::Arc;

const MIN_FIXED_STEP: f64 = 0.0001;
const FIXED_MIN: f64 = -32768.0;
const FIXED_MAX: f64 = 32767.9999;

/// Fixed-point option.
#[derive(Debug)]
pub struct DoubleOption {
    base: BaseOption,
    value: f64,
    min_change: f64,
}

impl DoubleOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            value: 0.0,
            min_change: MIN_FIXED_STEP,
        }
    }

    fn range(&self) -> Option<(f64, f64, f64)> {
        match &self.base.descriptor()?.constraint {
            Constraint::Range { range, quant } => Some((
                fixed_to_double(*range.start()),
                fixed_to_double(*range.end()),
                fixed_to_double(*quant),
            )),
            _ => None,
        }
    }
}

impl OptionModel for DoubleOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Double
    }

    fn read_option(&mut self) {
        self.base.begin_reload();

        self.min_change = match self.range() {
            Some((_, _, step)) => step.max(MIN_FIXED_STEP),
            None => MIN_FIXED_STEP,
        };

        self.base.end_reload();
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::Double) else {
            return;
        };

        let value = fixed_to_double(read_word(&data));
        if (value - self.value).abs() >= FIXED_PRECISION {
            self.value = value;
            self.base.emit(OptionEvent::ValueChanged(Value::Double(value)));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => Some(Value::Double(self.value)),
        }
    }

    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(value) = value.to_double() else {
            return false;
        };

        if (value - self.value).abs() < self.min_change {
            return true;
        }

        self.value = value;
        let mut data = value_to_word(double_to_fixed(value));
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(Value::Double(self.value)));
        true
    }

    fn minimum_value(&self) -> Option<Value> {
        let min = self.range().map_or(FIXED_MIN, |(min, _, _)| min);
        Some(Value::Double(min))
    }

    fn maximum_value(&self) -> Option<Value> {
        let max = self.range().map_or(FIXED_MAX, |(_, max, _)| max);
        Some(Value::Double(max))
    }

    fn step_value(&self) -> Option<Value> {
        let step = match self.range() {
            Some((_, _, step)) if step != 0.0 => step,
            Some(_) => 0.1,
            None => MIN_FIXED_STEP,
        };
        Some(Value::Double(step))
    }

    fn value_as_string(&self) -> String {
        match self.state() {
            OptionState::Hidden => String::new(),
            _ => format!("{:.6}", self.value),
        }
    }
}
