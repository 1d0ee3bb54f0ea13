//! formcheck
//!
//! A field validation engine for form inputs.
//!
//! # Goals
//! - One call validates any field category
//! - Soft failures: rule violations land in a shared error store, never in `Err`
//! - Deterministic messages in rule order and file order
//!
//! # Example
//! ```rust,ignore
//! use formcheck::{FieldType, FormValidator, InputValue};
//! use serde_json::json;
//!
//! let form = FormValidator::new();
//! let valid = form
//!     .validate_tagged(&"ada@example.com".into(), "email", "email", json!({}), false)
//!     .await?;
//! assert!(valid && form.get_field_errors("email").is_empty());
//! ```

mod field_type;
mod input;
mod options;
mod registry;
mod validator;

pub use field_type::{FieldType, UnknownFieldType};
pub use input::InputValue;
pub use options::ValidationOptions;
pub use registry::{FieldValidator, ValidatorRegistry};
pub use validator::{FormValidator, FormValidatorBuilder};

pub use formcheck_core::{ErrorStore, EventSender, FieldValue, FormError, FormResult, ValidationEvent};
pub use formcheck_media::{FileInput, MediaError};

// Re-export the validator crates
pub use formcheck_core as core;
pub use formcheck_media as media;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
