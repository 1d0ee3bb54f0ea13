//! formcheck core
//!
//! Field validation primitives shared by every formcheck validator.
//!
//! Features:
//! - Error store (per-field validity and ordered messages)
//! - Base validator contract (required, length, raw value coercion)
//! - Text family: text, textarea, email, FQDN, URL, date, number, password, tel
//! - Choice family: select, checkbox groups, radio groups
//! - Option defaults with last-write-wins deep merge

pub mod store;
pub mod value;
pub mod merge;
pub mod events;
pub mod base;
pub mod text;
pub mod fqdn;
pub mod email;
pub mod url;
pub mod number;
pub mod date;
pub mod password;
pub mod phone;
pub mod tel;
pub mod choice;

pub use store::{ErrorStore, ValidationState};
pub use value::FieldValue;
pub use merge::{merge_json, resolve_options};
pub use events::{EventSender, PasswordScore, ValidationEvent, WordAnalysis};
pub use base::BaseValidator;
pub use text::{TextOptions, TextValidator};
pub use fqdn::{FqdnOptions, FqdnValidator};
pub use email::{EmailOptions, EmailValidator};
pub use crate::url::{UrlOptions, UrlParts, UrlValidator};
pub use number::{NumberOptions, NumberValidator};
pub use date::{DateOptions, DateValidator};
pub use password::{CharClassRule, PasswordOptions, PasswordValidator};
pub use phone::{CallingCodeParser, PhoneNumber, PhoneNumberParser};
pub use tel::{TelOptions, TelValidator};
pub use choice::{
    CheckboxOptions, CheckboxValidator, RadioOptions, RadioValidator, SelectOptions,
    SelectValidator,
};

/// Structural or configuration error.
///
/// Rule failures never show up here: they are recorded in the [`ErrorStore`].
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Checkbox and radio groups require a group name")]
    MissingGroup,

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid options for {field_type}: {source}")]
    InvalidOptions {
        field_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field '{name}' is already registered as a {existing} field")]
    FieldNameCollision { name: String, existing: String },

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
}

/// Result type for validator calls
pub type FormResult<T> = Result<T, FormError>;
