//! Choice fields: select, checkbox groups and radio groups
//!
//! Checkbox and radio fields are validated by group name; a missing group
//! name is a caller error rather than a validation failure.

use serde::{Deserialize, Serialize};

use crate::base::{BaseValidator, REQUIRED_MESSAGE, strip_tags};
use crate::store::ErrorStore;
use crate::value::FieldValue;
use crate::{FormError, FormResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectOptions {
    pub required: bool,
    /// Allowed values; empty means unrestricted
    pub options: Vec<String>,
    pub strip_tags: bool,
}

impl SelectOptions {
    pub fn defaults() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckboxOptions {
    pub required: bool,
    pub min_allowed: Option<usize>,
    pub max_allowed: Option<usize>,
    /// Values of every checkbox in the group
    pub options: Vec<String>,
}

impl CheckboxOptions {
    pub fn defaults() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadioOptions {
    pub required: bool,
}

impl RadioOptions {
    pub fn defaults() -> Self {
        Self::default()
    }
}

/// Select validator: every chosen value must be one of the options
#[derive(Debug, Clone)]
pub struct SelectValidator {
    base: BaseValidator,
}

impl SelectValidator {
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
        options: &SelectOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_list(), field, options);
        Ok(self.base.is_field_valid(field))
    }

    /// Subset check without clearing first
    pub fn check(&self, selected: &[String], field: &str, options: &SelectOptions) -> bool {
        let selected: Vec<String> = selected
            .iter()
            .map(|value| if options.strip_tags { strip_tags(value) } else { value.clone() })
            .filter(|value| !value.trim().is_empty())
            .collect();

        if selected.is_empty() {
            return self
                .base
                .required_validator("", options.required, field);
        }
        if options.options.is_empty() {
            return true;
        }

        let unmatched: Vec<&str> = selected
            .iter()
            .filter(|value| !options.options.contains(*value))
            .map(String::as_str)
            .collect();
        if unmatched.is_empty() {
            return true;
        }
        self.base
            .fail(field, format!("Invalid selection: {}.", unmatched.join(", ")))
    }
}

/// Checkbox group validator: count bounds, then the subset check
#[derive(Debug, Clone)]
pub struct CheckboxValidator {
    base: BaseValidator,
    select: SelectValidator,
}

impl CheckboxValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self {
            select: SelectValidator::new(base.clone()),
            base,
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store))
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    /// `value` holds the checked values; `group` is the shared group name
    pub fn validate(
        &self,
        value: &FieldValue,
        group: &str,
        options: &CheckboxOptions,
    ) -> FormResult<bool> {
        if group.trim().is_empty() {
            return Err(FormError::MissingGroup);
        }
        self.base.begin(group);

        let selected = value.as_list();
        let count = selected.len();

        if options.required && count == 0 {
            self.base.fail(group, "Please select at least one option.");
            return Ok(false);
        }
        // An optional group left empty skips the count bounds
        if count == 0 {
            return Ok(true);
        }
        if let Some(max) = options.max_allowed {
            if count > max {
                self.base
                    .fail(group, format!("You can only select up to {max} options."));
                return Ok(false);
            }
        }
        if let Some(min) = options.min_allowed {
            if count < min {
                self.base
                    .fail(group, format!("You must select at least {min} options."));
                return Ok(false);
            }
        }

        let subset = SelectOptions {
            required: options.required,
            options: options.options.clone(),
            strip_tags: false,
        };
        Ok(self.select.check(&selected, group, &subset))
    }
}

/// Radio group validator
#[derive(Debug, Clone)]
pub struct RadioValidator {
    base: BaseValidator,
}

impl RadioValidator {
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
        group: &str,
        options: &RadioOptions,
    ) -> FormResult<bool> {
        if group.trim().is_empty() {
            return Err(FormError::MissingGroup);
        }
        self.base.begin(group);
        if options.required && value.is_blank() {
            self.base.fail(group, "Please select one of these options.");
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[&str]) -> FieldValue {
        FieldValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_select_reports_unmatched() {
        let v = SelectValidator::with_store(ErrorStore::new());
        let options = SelectOptions {
            options: vec!["red".into(), "green".into()],
            ..Default::default()
        };
        assert!(v.validate(&"red".into(), "color", &options).unwrap());
        assert!(!v.validate(&list(&["red", "blue", "pink"]), "color", &options).unwrap());
        assert_eq!(v.base().field_errors("color"), vec!["Invalid selection: blue, pink."]);
    }

    #[test]
    fn test_select_required_and_stripping() {
        let v = SelectValidator::with_store(ErrorStore::new());
        let options = SelectOptions {
            required: true,
            options: vec!["red".into()],
            strip_tags: true,
        };
        assert!(!v.validate(&FieldValue::Empty, "color", &options).unwrap());
        assert_eq!(v.base().field_errors("color"), vec![REQUIRED_MESSAGE]);
        assert!(v.validate(&"<i>red</i>".into(), "color", &options).unwrap());
    }

    #[test]
    fn test_checkbox_bounds() {
        let v = CheckboxValidator::with_store(ErrorStore::new());
        let options = CheckboxOptions {
            min_allowed: Some(2),
            max_allowed: Some(3),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Default::default()
        };

        assert!(!v.validate(&list(&["a"]), "toppings", &options).unwrap());
        assert!(v.base().field_errors("toppings")[0].contains("must select at least 2"));

        assert!(!v.validate(&list(&["a", "b", "c", "d"]), "toppings", &options).unwrap());
        assert!(v.base().field_errors("toppings")[0].contains("can only select up to 3"));

        let three = CheckboxOptions {
            options: vec!["a".into(), "b".into(), "c".into()],
            ..options
        };
        assert!(v.validate(&list(&["a", "c"]), "toppings", &three).unwrap());
        assert!(!v.validate(&list(&["a", "z"]), "toppings", &three).unwrap());
    }

    #[test]
    fn test_checkbox_required() {
        let v = CheckboxValidator::with_store(ErrorStore::new());
        let options = CheckboxOptions {
            required: true,
            ..Default::default()
        };
        assert!(!v.validate(&FieldValue::Empty, "terms", &options).unwrap());
        assert!(v.validate(&list(&["yes"]), "terms", &options).unwrap());
    }

    #[test]
    fn test_optional_empty_group_skips_bounds() {
        let v = CheckboxValidator::with_store(ErrorStore::new());
        let options = CheckboxOptions {
            min_allowed: Some(2),
            options: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        assert!(v.validate(&FieldValue::Empty, "toppings", &options).unwrap());
        assert!(v.base().field_errors("toppings").is_empty());

        let required = CheckboxOptions {
            required: true,
            ..options
        };
        assert!(!v.validate(&FieldValue::Empty, "toppings", &required).unwrap());
        assert_eq!(
            v.base().field_errors("toppings"),
            vec!["Please select at least one option."]
        );
    }

    #[test]
    fn test_groups_need_a_name() {
        let checkbox = CheckboxValidator::with_store(ErrorStore::new());
        assert!(matches!(
            checkbox.validate(&FieldValue::Empty, "", &CheckboxOptions::default()),
            Err(FormError::MissingGroup)
        ));
        let radio = RadioValidator::with_store(ErrorStore::new());
        assert!(matches!(
            radio.validate(&FieldValue::Empty, " ", &RadioOptions::default()),
            Err(FormError::MissingGroup)
        ));
    }

    #[test]
    fn test_radio() {
        let v = RadioValidator::with_store(ErrorStore::new());
        let required = RadioOptions { required: true };
        assert!(!v.validate(&FieldValue::Empty, "plan", &required).unwrap());
        assert!(v.validate(&"pro".into(), "plan", &required).unwrap());
        assert!(v.validate(&FieldValue::Empty, "plan", &RadioOptions::default()).unwrap());
    }
}
