//! Numeric validation
//!
//! Parse, range, step, then an optional pattern on the original string.

use serde::{Deserialize, Serialize};

use crate::base::{BaseValidator, PATTERN_MESSAGE, compile_pattern};
use crate::store::ErrorStore;
use crate::value::FieldValue;
use crate::FormResult;

/// Tolerance for the step remainder
pub const STEP_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberOptions {
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Values must sit on `min + k * step`
    pub step: Option<f64>,
    pub pattern: Option<String>,
}

impl NumberOptions {
    pub fn defaults() -> Self {
        Self::default()
    }
}

/// True when `value` sits on the step grid anchored at `base`.
///
/// The remainder may drift from `0` or `step` by float error, so both ends
/// are compared with [`STEP_EPSILON`].
pub fn is_step_multiple(value: f64, base: f64, step: f64) -> bool {
    if step <= 0.0 || !step.is_finite() {
        return true;
    }
    let remainder = ((value - base) % step).abs();
    remainder <= STEP_EPSILON || (remainder - step).abs() <= STEP_EPSILON
}

#[derive(Debug, Clone)]
pub struct NumberValidator {
    base: BaseValidator,
}

impl NumberValidator {
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
        options: &NumberOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(value, field, options)?;
        Ok(self.base.is_field_valid(field))
    }

    pub fn check(&self, value: &FieldValue, field: &str, options: &NumberOptions) -> FormResult<bool> {
        let raw = value.as_raw();
        let raw = raw.trim();
        if !self.base.required_validator(raw, options.required, field) {
            return Ok(false);
        }
        if raw.is_empty() {
            return Ok(true);
        }

        let number = match value {
            FieldValue::Number(number) => *number,
            _ => raw.parse::<f64>().unwrap_or(f64::NAN),
        };
        if number.is_nan() {
            return Ok(self.base.fail(field, "Please enter a number."));
        }

        if let Some(min) = options.min {
            if number < min {
                return Ok(self.base.fail(field, format!("Value must be at least {min}.")));
            }
        }
        if let Some(max) = options.max {
            if number > max {
                return Ok(self.base.fail(field, format!("Value must be at most {max}.")));
            }
        }
        if let Some(step) = options.step {
            if !is_step_multiple(number, options.min.unwrap_or(0.0), step) {
                return Ok(self.base.fail(field, format!("Value must be a multiple of {step}.")));
            }
        }

        if let Some(pattern) = &options.pattern {
            if !compile_pattern(pattern)?.is_match(raw) {
                return Ok(self.base.fail(field, PATTERN_MESSAGE));
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepped() -> NumberOptions {
        NumberOptions {
            min: Some(0.0),
            max: Some(10.0),
            step: Some(2.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_step_with_epsilon() {
        let v = NumberValidator::with_store(ErrorStore::new());
        assert!(v.validate(&"7.5".into(), "qty", &stepped()).unwrap());
        assert!(!v.validate(&"7".into(), "qty", &stepped()).unwrap());
        assert_eq!(v.base().field_errors("qty"), vec!["Value must be a multiple of 2.5."]);
    }

    #[test]
    fn test_float_drift_accepted() {
        assert!(is_step_multiple(0.3, 0.0, 0.1));
        assert!(is_step_multiple(1.1, 0.2, 0.3));
        assert!(!is_step_multiple(1.15, 0.0, 0.1));
    }

    #[test]
    fn test_range() {
        let v = NumberValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&FieldValue::Number(-1.0), "qty", &stepped()).unwrap());
        assert!(!v.validate(&"12.5".into(), "qty", &stepped()).unwrap());
        assert!(v.validate(&FieldValue::Number(10.0), "qty", &stepped()).unwrap());
    }

    #[test]
    fn test_not_a_number() {
        let v = NumberValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&"abc".into(), "qty", &NumberOptions::default()).unwrap());
        assert_eq!(v.base().field_errors("qty"), vec!["Please enter a number."]);
        assert!(!v.validate(&"NaN".into(), "qty", &NumberOptions::default()).unwrap());
    }

    #[test]
    fn test_trailing_pattern() {
        let v = NumberValidator::with_store(ErrorStore::new());
        let options = NumberOptions {
            pattern: Some(r"^\d+$".into()),
            ..Default::default()
        };
        assert!(v.validate(&"42".into(), "age", &options).unwrap());
        assert!(!v.validate(&"4.2".into(), "age", &options).unwrap());
    }
}
