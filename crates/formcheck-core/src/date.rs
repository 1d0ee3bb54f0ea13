//! Date validation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::base::BaseValidator;
use crate::store::ErrorStore;
use crate::value::FieldValue;
use crate::FormResult;

/// ISO calendar date, the format of `<input type="date">`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateOptions {
    pub required: bool,
    /// `chrono` format string; `None` means ISO dates
    pub format: Option<String>,
    /// Earliest accepted date, in `format`
    pub min: Option<String>,
    /// Latest accepted date, in `format`
    pub max: Option<String>,
}

impl DateOptions {
    pub fn defaults() -> Self {
        Self {
            format: Some(DEFAULT_DATE_FORMAT.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DateValidator {
    base: BaseValidator,
}

impl DateValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self { base }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store))
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    pub fn validate(
        &self,
        value: &FieldValue,
        field: &str,
        options: &DateOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_raw(), field, options);
        Ok(self.base.is_field_valid(field))
    }

    pub fn check(&self, raw: &str, field: &str, options: &DateOptions) -> bool {
        let raw = raw.trim();
        if !self.base.required_validator(raw, options.required, field) {
            return false;
        }
        if raw.is_empty() {
            return true;
        }

        let format = options.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        let Ok(date) = NaiveDate::parse_from_str(raw, format) else {
            return self.base.fail(field, "Please enter a valid date.");
        };

        let bound = |limit: &Option<String>| {
            limit
                .as_deref()
                .and_then(|limit| NaiveDate::parse_from_str(limit, format).ok())
        };
        if let Some(min) = bound(&options.min) {
            if date < min {
                return self
                    .base
                    .fail(field, format!("Date must be on or after {}.", min.format(format)));
            }
        }
        if let Some(max) = bound(&options.max) {
            if date > max {
                return self
                    .base
                    .fail(field, format!("Date must be on or before {}.", max.format(format)));
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_dates() {
        let v = DateValidator::with_store(ErrorStore::new());
        assert!(v.validate(&"2024-02-29".into(), "dob", &DateOptions::defaults()).unwrap());
        assert!(!v.validate(&"2023-02-29".into(), "dob", &DateOptions::defaults()).unwrap());
        assert!(!v.validate(&"29/02/2024".into(), "dob", &DateOptions::defaults()).unwrap());
    }

    #[test]
    fn test_bounds_and_format() {
        let v = DateValidator::with_store(ErrorStore::new());
        let options = DateOptions {
            format: Some("%d/%m/%Y".into()),
            min: Some("01/01/2020".into()),
            max: Some("31/12/2020".into()),
            ..Default::default()
        };
        assert!(v.validate(&"15/06/2020".into(), "when", &options).unwrap());
        assert!(!v.validate(&"15/06/2021".into(), "when", &options).unwrap());
        assert_eq!(
            v.base().field_errors("when"),
            vec!["Date must be on or before 31/12/2020."]
        );
    }
}
