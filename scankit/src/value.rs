use std::fmt;

/// Value of an option as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    IntList(Vec<i32>),
}

impl Value {
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(value) => Some(*value != 0),
            Self::Double(value) => Some(*value != 0.0),
            Self::String(text) => match text.trim() {
                "" | "0" | "false" => Some(false),
                _ => Some(true),
            },
            Self::IntList(_) => None,
        }
    }

    pub fn to_int(&self) -> Option<i32> {
        match self {
            Self::Bool(value) => Some(*value as i32),
            Self::Int(value) => Some(*value),
            Self::Double(value) => Some(value.round() as i32),
            Self::String(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|value| value.round() as i32))
            }
            Self::IntList(_) => None,
        }
    }

    pub fn to_double(&self) -> Option<f64> {
        match self {
            Self::Bool(value) => Some(*value as i32 as f64),
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            Self::String(text) => text.trim().parse().ok(),
            Self::IntList(_) => None,
        }
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value:.6}"),
            Self::String(text) => f.write_str(text),
            Self::IntList(values) => {
                let values: Vec<String> = values.iter().map(i32::to_string).collect();
                f.write_str(&values.join(":"))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<i32>> for Value {
    fn from(value: Vec<i32>) -> Self {
        Self::IntList(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_conversions() {
        assert_eq!(Value::from("false").to_bool(), Some(false));
        assert_eq!(Value::from("").to_bool(), Some(false));
        assert_eq!(Value::from("true").to_bool(), Some(true));
        assert_eq!(Value::from(" 42 ").to_int(), Some(42));
        assert_eq!(Value::from("2.6").to_int(), Some(3));
        assert_eq!(Value::from("abc").to_int(), None);
        assert_eq!(Value::from(3).to_double(), Some(3.0));
        assert_eq!(Value::from(vec![1, 2]).to_int(), None);
    }

    #[test]
    fn text_forms() {
        assert_eq!(Value::from(true).to_text(), "true");
        assert_eq!(Value::from(1.5).to_text(), "1.500000");
        assert_eq!(Value::from(vec![0, 10, 100]).to_text(), "0:10:100");
    }
}
