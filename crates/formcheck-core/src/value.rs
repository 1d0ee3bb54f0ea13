//! Raw field values and coercion to strings

use serde::{Deserialize, Serialize};

/// A non-file value handed over by the attribute layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing or undefined
    #[default]
    Empty,
    Text(String),
    List(Vec<String>),
    Number(f64),
}

impl FieldValue {
    /// Coerce to the string the rules operate on.
    ///
    /// Empty becomes `""`, numbers use their shortest display form and
    /// lists are joined with commas.
    pub fn as_raw(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(","),
            FieldValue::Number(number) => number.to_string(),
        }
    }

    /// Selected entries for choice fields
    pub fn as_list(&self) -> Vec<String> {
        match self {
            FieldValue::Empty => Vec::new(),
            FieldValue::Text(text) if text.is_empty() => Vec::new(),
            FieldValue::Text(text) => vec![text.clone()],
            FieldValue::List(items) => items.clone(),
            FieldValue::Number(number) => vec![number.to_string()],
        }
    }

    /// True for empty input or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|item| item.trim().is_empty()),
            FieldValue::Number(number) => number.is_nan(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
