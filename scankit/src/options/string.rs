use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{bytes_to_string, string_to_bytes},
    value::Value,
};
use std::sync::Arc;

#[derive(Debug)]
pub struct StringOption {
    base: BaseOption,
    text: String,
}

impl StringOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            text: String::new(),
        }
    }

    fn declared_size(&self) -> usize {
        self.base.descriptor().map_or(0, |desc| desc.size)
    }
}

/// Cuts `text` to at most `size` bytes without splitting a character.
fn truncate(text: &str, size: usize) -> &str {
    if text.len() <= size {
        return text;
    }

    let mut end = size;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl OptionModel for StringOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::String
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::String) else {
            return;
        };

        let text = bytes_to_string(&data);
        if text != self.text {
            self.text = text;
            self.base.emit(OptionEvent::ValueChanged(Value::String(self.text.clone())));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => Some(Value::String(self.text.clone())),
        }
    }

    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let size = self.declared_size();
        let text = value.to_text();
        let text = truncate(&text, size);

        if text == self.text {
            return true;
        }

        self.text = text.to_owned();
        let mut data = string_to_bytes(text, size);
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(Value::String(self.text.clone())));
        true
    }

    /// Size of the value buffer in bytes.
    fn value_size(&self) -> usize {
        self.declared_size()
    }

    fn value_as_string(&self) -> String {
        match self.state() {
            OptionState::Hidden => String::new(),
            _ => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("abcdefghij", 8), "abcdefgh");
        assert_eq!(truncate("abc", 8), "abc");
        assert_eq!(truncate("aé", 2), "a");
    }
}
