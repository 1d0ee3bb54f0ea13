//! Error Store
//!
//! Keyed validation state for every field a validator has touched.
//! Unknown fields read as valid with no errors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// Validity and ordered, de-duplicated messages for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    /// False whenever `errors` is non-empty
    pub is_valid: bool,
    /// Messages in the order they were recorded
    pub errors: Vec<String>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ValidationState {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }
}

/// Shared error store.
///
/// Cloning yields another handle to the same map, so one store can be
/// injected into every validator of a session. Each method is a single
/// map mutation under the lock.
#[derive(Debug, Clone, Default)]
pub struct ErrorStore {
    fields: Arc<Mutex<HashMap<String, ValidationState>>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fields(&self) -> MutexGuard<'_, HashMap<String, ValidationState>> {
        self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the valid flag. Marking a field valid also drops its messages.
    pub fn set_field_valid(&self, field: &str, valid: bool) {
        let mut fields = self.fields();
        let state = fields.entry(field.to_string()).or_default();
        state.is_valid = valid;
        if valid {
            state.errors.clear();
        }
    }

    /// Append a message (exact duplicates are skipped) and mark the field invalid
    pub fn add_field_error(&self, field: &str, message: impl Into<String>) {
        self.add_field_errors(field, [message.into()]);
    }

    /// Append several messages in order
    pub fn add_field_errors<I, S>(&self, field: &str, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = self.fields();
        let state = fields.entry(field.to_string()).or_default();
        for message in messages {
            let message = message.into();
            if !state.errors.contains(&message) {
                state.errors.push(message);
            }
        }
        if !state.errors.is_empty() {
            state.is_valid = false;
        }
    }

    /// Reset the field to valid with no messages
    pub fn clear_field_state(&self, field: &str) {
        self.fields().insert(field.to_string(), ValidationState::new());
    }

    /// Forget the field entirely
    pub fn remove_field(&self, field: &str) -> Option<ValidationState> {
        self.fields().remove(field)
    }

    /// Drop every recorded field
    pub fn clear_all(&self) {
        self.fields().clear();
    }

    /// Unknown fields are valid
    pub fn is_field_valid(&self, field: &str) -> bool {
        self.fields().get(field).is_none_or(|state| state.is_valid)
    }

    pub fn get_field_errors(&self, field: &str) -> Vec<String> {
        self.fields()
            .get(field)
            .map(|state| state.errors.clone())
            .unwrap_or_default()
    }

    /// Snapshot of one field's state, if it was ever recorded
    pub fn field_state(&self, field: &str) -> Option<ValidationState> {
        self.fields().get(field).cloned()
    }

    /// Names of every field currently holding errors, sorted
    pub fn invalid_fields(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .fields()
            .iter()
            .filter(|(_, state)| !state.is_valid)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_is_valid() {
        let store = ErrorStore::new();
        assert!(store.is_field_valid("never-touched"));
        assert!(store.get_field_errors("never-touched").is_empty());
        assert!(store.field_state("never-touched").is_none());
    }

    #[test]
    fn test_add_error_marks_invalid() {
        let store = ErrorStore::new();
        store.add_field_error("email", "Invalid email");

        assert!(!store.is_field_valid("email"));
        assert_eq!(store.get_field_errors("email"), vec!["Invalid email"]);
    }

    #[test]
    fn test_duplicate_messages_skipped() {
        let store = ErrorStore::new();
        store.add_field_error("name", "Too short");
        store.add_field_errors("name", ["Too short", "Bad format", "Too short"]);

        assert_eq!(store.get_field_errors("name"), vec!["Too short", "Bad format"]);
    }

    #[test]
    fn test_clear_resets_state() {
        let store = ErrorStore::new();
        store.add_field_error("age", "Too young");
        store.clear_field_state("age");

        assert!(store.is_field_valid("age"));
        assert!(store.get_field_errors("age").is_empty());

        store.clear_field_state("age");
        assert!(store.is_field_valid("age"));
    }

    #[test]
    fn test_set_valid_true_drops_errors() {
        let store = ErrorStore::new();
        store.add_field_error("zip", "Bad zip");
        store.set_field_valid("zip", true);

        let state = store.field_state("zip").unwrap();
        assert!(state.is_valid);
        assert!(state.errors.is_empty());
    }

    #[test]
    fn test_handles_share_state() {
        let store = ErrorStore::new();
        let other = store.clone();
        other.add_field_error("title", "Required");

        assert!(!store.is_field_valid("title"));
        assert_eq!(store.invalid_fields(), vec!["title"]);
        assert!(store.remove_field("title").is_some());
        assert!(store.is_empty());
    }
}
