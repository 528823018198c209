use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{
        bytes_to_string, fixed_to_double, read_word, string_to_bytes, value_to_word,
    },
    descriptor::{Constraint, Unit, ValueType},
    value::Value,
};
use std::sync::Arc;

/// Largest distance a numeric request may have from the entry it selects.
const NUMERIC_TOLERANCE: f64 = 1.0;

/// Option restricted to a list of words or strings.
#[derive(Debug)]
pub struct ListOption {
    base: BaseOption,
    current: Option<Value>,
}

/// One entry of the constraint list.
#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Word { word: i32, value: Value },
    Text(String),
}

impl Entry {
    fn value(&self) -> Value {
        match self {
            Self::Word { value, .. } => value.clone(),
            Self::Text(text) => Value::String(text.clone()),
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Self::Word { value, .. } => value.to_double(),
            Self::Text(_) => None,
        }
    }
}

impl ListOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            current: None,
        }
    }

    fn value_type(&self) -> Option<ValueType> {
        self.base.descriptor().map(|desc| desc.ty)
    }

    fn entries(&self) -> Vec<Entry> {
        let Some(desc) = self.base.descriptor() else {
            return Vec::new();
        };

        match (&desc.constraint, desc.ty) {
            (Constraint::WordList(words), ValueType::Fixed) => words
                .iter()
                .map(|word| Entry::Word {
                    word: *word,
                    value: Value::Double(fixed_to_double(*word)),
                })
                .collect(),
            (Constraint::WordList(words), _) => words
                .iter()
                .map(|word| Entry::Word {
                    word: *word,
                    value: Value::Int(*word),
                })
                .collect(),
            (Constraint::StringList(strings), _) => {
                strings.iter().cloned().map(Entry::Text).collect()
            }
            _ => Vec::new(),
        }
    }

    /// User facing text for a raw value, with its unit.
    fn label(&self, value: &Value) -> String {
        let unit = self.base.unit();

        let number = match value {
            Value::Int(int) => int.to_string(),
            Value::Double(double) if unit == Unit::None => return format!("{double:.4}"),
            Value::Double(double) => format_decimal(*double),
            other => return other.to_text(),
        };

        let singular = value.to_double() == Some(1.0);

        match unit {
            Unit::None => number,
            Unit::Pixel if singular => format!("{number} Pixel"),
            Unit::Pixel => format!("{number} Pixels"),
            Unit::Bit if singular => format!("{number} Bit"),
            Unit::Bit => format!("{number} Bits"),
            Unit::Mm => format!("{number} mm"),
            Unit::Dpi => format!("{number} DPI"),
            Unit::Percent => format!("{number} %"),
            Unit::Microsecond => format!("{number} µs"),
            Unit::Second => format!("{number} s"),
        }
    }

    fn nearest(&self, requested: f64) -> Option<Entry> {
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.number().map(|number| ((number - requested).abs(), entry)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .filter(|(distance, _)| *distance < NUMERIC_TOLERANCE)
            .map(|(_, entry)| entry)
    }

    fn find(&self, value: &Value) -> Option<Entry> {
        match value {
            Value::String(text) => {
                let by_label = self
                    .entries()
                    .into_iter()
                    .find(|entry| self.label(&entry.value()) == *text);

                by_label.or_else(|| match self.value_type() {
                    Some(ValueType::String) => None,
                    _ => text.trim().parse().ok().and_then(|number| self.nearest(number)),
                })
            }
            Value::Int(int) => match self.value_type() {
                Some(ValueType::String) => self.find(&Value::String(int.to_string())),
                _ => self.nearest(*int as f64),
            },
            Value::Double(double) => match self.value_type() {
                Some(ValueType::String) => self.find(&Value::String(format_decimal(*double))),
                _ => self.nearest(*double),
            },
            Value::Bool(_) | Value::IntList(_) => None,
        }
    }

    fn numbers(&self) -> impl Iterator<Item = (f64, Value)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.number().map(|number| (number, entry.value())))
    }
}

/// Shortest decimal form with at most four fractional digits.
fn format_decimal(value: f64) -> String {
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

impl OptionModel for ListOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::ValueList
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::ValueList) else {
            return;
        };

        let value = match self.value_type() {
            Some(ValueType::Fixed) => Value::Double(fixed_to_double(read_word(&data))),
            Some(ValueType::String) => Value::String(bytes_to_string(&data)),
            _ => Value::Int(read_word(&data)),
        };

        if self.current.as_ref() != Some(&value) {
            self.current = Some(value.clone());
            self.base.emit(OptionEvent::ValueChanged(value));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => self.current.clone(),
        }
    }

    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(entry) = self.find(value) else {
            log::debug!("'{value}' is not an entry of option '{}'", self.name());
            return false;
        };

        let selected = entry.value();
        if self.current.as_ref() == Some(&selected) {
            return true;
        }

        let mut data = match &entry {
            Entry::Word { word, .. } => value_to_word(*word).to_vec(),
            Entry::Text(text) => {
                let size = self.base.descriptor().map_or(0, |desc| desc.size);
                string_to_bytes(text, size)
            }
        };

        self.current = Some(selected.clone());
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(selected));
        true
    }

    /// Smallest entry of a numeric list.
    fn minimum_value(&self) -> Option<Value> {
        self.numbers()
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, value)| value)
    }

    fn maximum_value(&self) -> Option<Value> {
        self.numbers()
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, value)| value)
    }

    fn value_list(&self) -> Vec<Value> {
        self.entries()
            .iter()
            .map(|entry| Value::String(self.label(&entry.value())))
            .collect()
    }

    fn internal_value_list(&self) -> Vec<Value> {
        self.entries().iter().map(Entry::value).collect()
    }

    fn value_as_string(&self) -> String {
        if self.state() == OptionState::Hidden {
            return String::new();
        }

        self.current
            .as_ref()
            .map(|value| self.label(value))
            .unwrap_or_default()
    }
}
