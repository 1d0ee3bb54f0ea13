//! Telephone validation
//!
//! Requires a leading `+`, hands the grammar to a [`PhoneNumberParser`] and
//! finishes with the text rules. A successfully parsed number is published
//! in normalized form on the event channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::base::BaseValidator;
use crate::events::ValidationEvent;
use crate::phone::{CallingCodeParser, PhoneNumberParser};
use crate::store::ErrorStore;
use crate::text::{TextOptions, TextValidator};
use crate::value::FieldValue;
use crate::FormResult;

pub const DEFAULT_COUNTRY: &str = "US";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelOptions {
    #[serde(flatten)]
    pub text: TextOptions,
    /// ISO 3166 region used when a calling code is shared
    pub default_country: Option<String>,
    /// Publish the E.164 form when it differs from the input
    pub normalize: bool,
}

impl TelOptions {
    pub fn defaults() -> Self {
        Self {
            default_country: Some(DEFAULT_COUNTRY.to_string()),
            normalize: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelValidator {
    base: BaseValidator,
    text: TextValidator,
    parser: Arc<dyn PhoneNumberParser>,
}

impl TelValidator {
    pub fn new(base: BaseValidator, parser: Arc<dyn PhoneNumberParser>) -> Self {
        Self {
            text: TextValidator::new(base.clone()),
            base,
            parser,
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store), Arc::new(CallingCodeParser::new()))
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    pub fn validate(
        &self,
        value: &FieldValue,
        field: &str,
        options: &TelOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_raw(), field, options)?;
        Ok(self.base.is_field_valid(field))
    }

    pub fn check(&self, raw: &str, field: &str, options: &TelOptions) -> FormResult<bool> {
        let value = raw.trim();
        if value.is_empty() {
            return self.text.check(value, field, &options.text);
        }
        if !value.starts_with('+') {
            return Ok(self
                .base
                .fail(field, "Please start the number with a country code, such as +1."));
        }

        let country = options.default_country.as_deref().unwrap_or(DEFAULT_COUNTRY);
        let Some(number) = self.parser.parse(value, country) else {
            return Ok(self.base.fail(field, "Please enter a valid phone number."));
        };

        let normalized = number.e164();
        if options.normalize && normalized != value {
            self.base.emit(ValidationEvent::TelNormalized {
                input: field.to_string(),
                value: normalized,
            });
        }

        self.text.check(value, field, &options.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_plus() {
        let v = TelValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&"415 555 2671".into(), "phone", &TelOptions::defaults()).unwrap());
        assert!(v.validate(&"+1 415 555 2671".into(), "phone", &TelOptions::defaults()).unwrap());
        assert!(!v.validate(&"+1 415".into(), "phone", &TelOptions::defaults()).unwrap());
    }

    #[test]
    fn test_text_rules_apply_last() {
        let v = TelValidator::with_store(ErrorStore::new());
        let options = TelOptions {
            text: TextOptions {
                max_length: Some(12),
                ..Default::default()
            },
            ..TelOptions::defaults()
        };
        assert!(!v.validate(&"+1 (415) 555-2671".into(), "phone", &options).unwrap());
        assert!(v.validate(&"+14155552671".into(), "phone", &options).unwrap());
    }

    #[test]
    fn test_normalized_value_published() {
        let (sender, receiver) = smol::channel::unbounded();
        let base = BaseValidator::new(ErrorStore::new()).with_events(sender);
        let v = TelValidator::new(base, Arc::new(CallingCodeParser::new()));
        v.validate(&"+44 20 7946 0958".into(), "phone", &TelOptions::defaults()).unwrap();

        assert_eq!(
            receiver.try_recv().unwrap(),
            ValidationEvent::TelNormalized {
                input: "phone".into(),
                value: "+442079460958".into(),
            }
        );
    }
}
