//! Base validator contract
//!
//! Shared checks and error store access for every rule validator. A
//! validator clears the field before it runs, then records failures
//! through [`BaseValidator::set_validation_state`]. Most validators stop at
//! the first failure.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::events::{EventSender, ValidationEvent};
use crate::store::ErrorStore;
use crate::{FormError, FormResult};

static PHP_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<\?(?:php)?.*?(?:\?>|$)").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

pub const REQUIRED_MESSAGE: &str = "Please fill out this field.";
pub const PATTERN_MESSAGE: &str = "Please match the requested format.";

/// Store access plus the checks every validator shares
#[derive(Debug, Clone)]
pub struct BaseValidator {
    store: ErrorStore,
    events: Option<EventSender>,
}

impl BaseValidator {
    pub fn new(store: ErrorStore) -> Self {
        Self { store, events: None }
    }

    /// Publish side-channel events on `sender`
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn store(&self) -> &ErrorStore {
        &self.store
    }

    /// Drop whatever an earlier pass recorded for `field`
    pub fn begin(&self, field: &str) {
        self.store.clear_field_state(field);
    }

    /// Record an outcome. `false` appends `message`; `true` clears residual state.
    pub fn set_validation_state(&self, valid: bool, message: Option<&str>, field: &str) {
        if valid {
            self.store.set_field_valid(field, true);
            return;
        }
        match message {
            Some(message) => {
                tracing::trace!(field, message, "rule failed");
                self.store.add_field_error(field, message);
            }
            None => self.store.set_field_valid(field, false),
        }
    }

    /// Record `message` and return `false` so callers can `return self.fail(..)`
    pub fn fail(&self, field: &str, message: impl AsRef<str>) -> bool {
        self.set_validation_state(false, Some(message.as_ref()), field);
        false
    }

    /// Fails when `required` and the value is empty or whitespace only
    pub fn required_validator(&self, value: &str, required: bool, field: &str) -> bool {
        if required && value.trim().is_empty() {
            return self.fail(field, REQUIRED_MESSAGE);
        }
        true
    }

    /// Character-length bounds
    pub fn length_validator(
        &self,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
        field: &str,
    ) -> bool {
        let length = value.chars().count();
        if let Some(min) = min {
            if length < min {
                return self.fail(
                    field,
                    format!("Please lengthen this text to at least {min} characters."),
                );
            }
        }
        if let Some(max) = max {
            if length > max {
                return self.fail(
                    field,
                    format!("Please shorten this text to no more than {max} characters."),
                );
            }
        }
        true
    }

    pub fn is_field_valid(&self, field: &str) -> bool {
        self.store.is_field_valid(field)
    }

    pub fn field_errors(&self, field: &str) -> Vec<String> {
        self.store.get_field_errors(field)
    }

    /// Publish an event; a closed or missing channel is ignored
    pub fn emit(&self, event: ValidationEvent) {
        if let Some(sender) = &self.events {
            if sender.try_send(event).is_err() {
                tracing::debug!("validation event dropped: no receiver");
            }
        }
    }
}

/// Compile a caller-supplied pattern
pub fn compile_pattern(pattern: &str) -> FormResult<Regex> {
    Regex::new(pattern).map_err(|source| FormError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Remove PHP blocks and HTML tags
pub fn strip_tags(value: &str) -> String {
    let without_php = PHP_BLOCK.replace_all(value, "");
    HTML_TAG.replace_all(&without_php, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let base = BaseValidator::new(ErrorStore::new());
        assert!(!base.required_validator("   ", true, "name"));
        assert_eq!(base.field_errors("name"), vec![REQUIRED_MESSAGE]);

        assert!(base.required_validator("", false, "other"));
        assert!(base.is_field_valid("other"));
    }

    #[test]
    fn test_length_counts_chars() {
        let base = BaseValidator::new(ErrorStore::new());
        assert!(base.length_validator("héllo", Some(5), Some(5), "word"));
        assert!(!base.length_validator("hi", Some(3), None, "word"));
        assert!(!base.is_field_valid("word"));
    }

    #[test]
    fn test_begin_clears() {
        let base = BaseValidator::new(ErrorStore::new());
        base.fail("field", "broken");
        base.begin("field");
        assert!(base.is_field_valid("field"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>bold</b> text"), "bold text");
        assert_eq!(strip_tags("a<?php echo 1; ?>b"), "ab");
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        assert!(matches!(
            compile_pattern("(unclosed"),
            Err(FormError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_events_delivered() {
        let (sender, receiver) = smol::channel::unbounded();
        let base = BaseValidator::new(ErrorStore::new()).with_events(sender);
        base.emit(ValidationEvent::TelNormalized {
            input: "phone".into(),
            value: "+14155552671".into(),
        });
        assert!(receiver.try_recv().is_ok());
    }
}
