//! Validator registry
//!
//! Remembers which validator last handled each field so the UI layer can
//! introspect it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use formcheck_core::{
    BaseValidator, CheckboxValidator, DateValidator, EmailValidator, FormError, FormResult,
    FqdnValidator, NumberValidator, PasswordValidator, RadioValidator, SelectValidator,
    TelValidator, TextValidator, UrlValidator,
};
use formcheck_media::{DocumentValidator, ImageValidator, VideoValidator};

/// The validator instance registered for a field
#[derive(Debug, Clone)]
pub enum FieldValidator {
    Text(Arc<TextValidator>),
    Email(Arc<EmailValidator>),
    Fqdn(Arc<FqdnValidator>),
    Url(Arc<UrlValidator>),
    Date(Arc<DateValidator>),
    Number(Arc<NumberValidator>),
    Password(Arc<PasswordValidator>),
    Tel(Arc<TelValidator>),
    Select(Arc<SelectValidator>),
    Checkbox(Arc<CheckboxValidator>),
    Radio(Arc<RadioValidator>),
    Image(Arc<ImageValidator>),
    Video(Arc<VideoValidator>),
    Document(Arc<DocumentValidator>),
}

impl FieldValidator {
    pub fn name(&self) -> &'static str {
        match self {
            FieldValidator::Text(_) => "text",
            FieldValidator::Email(_) => "email",
            FieldValidator::Fqdn(_) => "fqdn",
            FieldValidator::Url(_) => "url",
            FieldValidator::Date(_) => "date",
            FieldValidator::Number(_) => "number",
            FieldValidator::Password(_) => "password",
            FieldValidator::Tel(_) => "tel",
            FieldValidator::Select(_) => "select",
            FieldValidator::Checkbox(_) => "checkbox",
            FieldValidator::Radio(_) => "radio",
            FieldValidator::Image(_) => "image",
            FieldValidator::Video(_) => "video",
            FieldValidator::Document(_) => "document",
        }
    }

    /// Keyed by group name rather than field name
    pub fn is_group(&self) -> bool {
        matches!(self, FieldValidator::Checkbox(_) | FieldValidator::Radio(_))
    }

    pub fn base(&self) -> &BaseValidator {
        match self {
            FieldValidator::Text(v) => v.base(),
            FieldValidator::Email(v) => v.base(),
            FieldValidator::Fqdn(v) => v.base(),
            FieldValidator::Url(v) => v.base(),
            FieldValidator::Date(v) => v.base(),
            FieldValidator::Number(v) => v.base(),
            FieldValidator::Password(v) => v.base(),
            FieldValidator::Tel(v) => v.base(),
            FieldValidator::Select(v) => v.base(),
            FieldValidator::Checkbox(v) => v.base(),
            FieldValidator::Radio(v) => v.base(),
            FieldValidator::Image(v) => v.base(),
            FieldValidator::Video(v) => v.base(),
            FieldValidator::Document(v) => v.base(),
        }
    }
}

/// Field name to the validator that last processed it
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    entries: Arc<Mutex<HashMap<String, FieldValidator>>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, FieldValidator>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fails when `name` is registered as a group and is now used as a
    /// plain field, or the other way round
    pub fn check_collision(&self, name: &str, is_group: bool) -> FormResult<()> {
        match self.entries().get(name) {
            Some(existing) if existing.is_group() != is_group => Err(FormError::FieldNameCollision {
                name: name.to_string(),
                existing: existing.name().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Replaces any earlier entry for `name`
    pub fn register(&self, name: &str, validator: FieldValidator) {
        self.entries().insert(name.to_string(), validator);
    }

    pub fn get_validator(&self, name: &str) -> Option<FieldValidator> {
        self.entries().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<FieldValidator> {
        self.entries().remove(name)
    }

    /// Registered names, sorted
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_core::ErrorStore;

    #[test]
    fn test_register_replaces() {
        let registry = ValidatorRegistry::new();
        let store = ErrorStore::new();
        registry.register("contact", FieldValidator::Text(Arc::new(TextValidator::with_store(store.clone()))));
        registry.register("contact", FieldValidator::Email(Arc::new(EmailValidator::with_store(store))));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_validator("contact").unwrap().name(), "email");
        assert!(registry.get_validator("missing").is_none());
    }

    #[test]
    fn test_group_collision() {
        let registry = ValidatorRegistry::new();
        registry.register(
            "plan",
            FieldValidator::Radio(Arc::new(RadioValidator::with_store(ErrorStore::new()))),
        );
        assert!(registry.check_collision("plan", true).is_ok());
        assert!(matches!(
            registry.check_collision("plan", false),
            Err(FormError::FieldNameCollision { existing, .. }) if existing == "radio"
        ));
        assert!(registry.check_collision("other", false).is_ok());
    }
}
