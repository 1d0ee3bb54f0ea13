//! Text and textarea validation
//!
//! Order: required, pattern, length. A pattern failure stops before the
//! length check. Empty optional values pass without further checks.

use serde::{Deserialize, Serialize};

use crate::base::{BaseValidator, PATTERN_MESSAGE, compile_pattern, strip_tags};
use crate::store::ErrorStore;
use crate::value::FieldValue;
use crate::FormResult;

/// One or more Unicode letters
pub const DEFAULT_TEXT_PATTERN: &str = r"^\p{L}+$";
/// Anything, newlines included
pub const DEFAULT_TEXTAREA_PATTERN: &str = r"(?s)^.+$";

/// Options shared by every text-like field.
///
/// `Default` disables every check; [`TextOptions::defaults`] gives the
/// category defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextOptions {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    /// Message used when `pattern` does not match
    pub pattern_message: Option<String>,
    /// Remove PHP blocks and HTML tags before checking
    pub strip_tags: bool,
}

impl TextOptions {
    pub fn defaults() -> Self {
        Self {
            pattern: Some(DEFAULT_TEXT_PATTERN.to_string()),
            ..Default::default()
        }
    }

    pub fn textarea_defaults() -> Self {
        Self {
            pattern: Some(DEFAULT_TEXTAREA_PATTERN.to_string()),
            ..Default::default()
        }
    }
}

/// Text rule validator; other text-like validators delegate to [`TextValidator::check`]
#[derive(Debug, Clone)]
pub struct TextValidator {
    base: BaseValidator,
}

impl TextValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self { base }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store))
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    /// Clear prior state, run the text rules, and report field validity
    pub fn validate(
        &self,
        value: &FieldValue,
        field: &str,
        options: &TextOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_raw(), field, options)?;
        Ok(self.base.is_field_valid(field))
    }

    /// Run the text rules without clearing first.
    ///
    /// Returns whether every rule passed.
    pub fn check(&self, raw: &str, field: &str, options: &TextOptions) -> FormResult<bool> {
        let stripped;
        let value = if options.strip_tags {
            stripped = strip_tags(raw);
            stripped.as_str()
        } else {
            raw
        };

        if !self.base.required_validator(value, options.required, field) {
            return Ok(false);
        }
        if value.is_empty() {
            return Ok(true);
        }

        if let Some(pattern) = &options.pattern {
            let regex = compile_pattern(pattern)?;
            if !regex.is_match(value) {
                let message = options.pattern_message.as_deref().unwrap_or(PATTERN_MESSAGE);
                return Ok(self.base.fail(field, message));
            }
        }

        Ok(self
            .base
            .length_validator(value, options.min_length, options.max_length, field))
    }
}
