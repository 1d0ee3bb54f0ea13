//! Values handed to the router

use formcheck_core::FieldValue;
use formcheck_media::FileInput;

/// Either a plain field value or the files picked for an upload field
#[derive(Debug, Clone)]
pub enum InputValue {
    Field(FieldValue),
    Files(Vec<FileInput>),
}

impl InputValue {
    pub fn is_files(&self) -> bool {
        matches!(self, InputValue::Files(_))
    }
}

impl Default for InputValue {
    fn default() -> Self {
        InputValue::Field(FieldValue::Empty)
    }
}

impl From<FieldValue> for InputValue {
    fn from(value: FieldValue) -> Self {
        InputValue::Field(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Field(value.into())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Field(value.into())
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Field(value.into())
    }
}

impl From<Vec<String>> for InputValue {
    fn from(values: Vec<String>) -> Self {
        InputValue::Field(values.into())
    }
}

impl From<FileInput> for InputValue {
    fn from(file: FileInput) -> Self {
        InputValue::Files(vec![file])
    }
}

impl From<Vec<FileInput>> for InputValue {
    fn from(files: Vec<FileInput>) -> Self {
        InputValue::Files(files)
    }
}
