//! FormValidator - central router

use std::sync::Arc;

use formcheck_core::{
    BaseValidator, CallingCodeParser, CheckboxValidator, DateValidator, EmailValidator,
    ErrorStore, EventSender, FieldValue, FormError, FormResult, FqdnValidator, NumberValidator,
    PasswordValidator, PhoneNumberParser, RadioValidator, SelectValidator, TelValidator,
    TextValidator, UrlValidator,
};
use formcheck_media::{
    ContainerProbe, DocumentParser, DocumentParsers, DocumentValidator, FileInput,
    ImageValidator, VideoProbe, VideoValidator,
};
use serde_json::Value;

use crate::field_type::FieldType;
use crate::input::InputValue;
use crate::options::ValidationOptions;
use crate::registry::{FieldValidator, ValidatorRegistry};

/// Validates any field by category and records outcomes in one shared store
#[derive(Debug, Clone)]
pub struct FormValidator {
    store: ErrorStore,
    registry: ValidatorRegistry,
    text: Arc<TextValidator>,
    email: Arc<EmailValidator>,
    fqdn: Arc<FqdnValidator>,
    url: Arc<UrlValidator>,
    date: Arc<DateValidator>,
    number: Arc<NumberValidator>,
    password: Arc<PasswordValidator>,
    tel: Arc<TelValidator>,
    select: Arc<SelectValidator>,
    checkbox: Arc<CheckboxValidator>,
    radio: Arc<RadioValidator>,
    image: Arc<ImageValidator>,
    video: Arc<VideoValidator>,
    document: Arc<DocumentValidator>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> FormValidatorBuilder {
        FormValidatorBuilder::default()
    }

    pub fn store(&self) -> &ErrorStore {
        &self.store
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Validate `value` for `field` with typed options.
    ///
    /// Checkbox and radio fields are addressed by group name. Returns the
    /// field's validity after the pass; `Err` only for caller mistakes.
    pub async fn validate(
        &self,
        value: &InputValue,
        field: &str,
        options: &ValidationOptions,
    ) -> FormResult<bool> {
        let field_type = options.field_type();
        tracing::debug!(field, %field_type, "validating field");
        self.registry.check_collision(field, field_type.is_group())?;

        let (valid, validator) = match value {
            InputValue::Files(files) => self.dispatch_files(files, field, options).await?,
            InputValue::Field(value) if field_type.is_media() => {
                if !value.is_blank() {
                    return Err(FormError::UnsupportedMedia(format!(
                        "{field_type} fields expect files"
                    )));
                }
                self.dispatch_files(&[], field, options).await?
            }
            InputValue::Field(value) => self.dispatch_value(value, field, options)?,
        };

        self.registry.register(field, validator);
        Ok(valid)
    }

    /// Validate with a string type tag and JSON options.
    ///
    /// An unknown tag is logged and skipped; the field keeps whatever state
    /// it had.
    pub async fn validate_tagged(
        &self,
        value: &InputValue,
        field: &str,
        type_tag: &str,
        options: Value,
        skip_default_merge: bool,
    ) -> FormResult<bool> {
        let field_type = match type_tag.parse::<FieldType>() {
            Ok(field_type) => field_type,
            Err(err) => {
                tracing::warn!(field, type_tag, "{err}; skipping validation");
                return Ok(self.is_field_valid(field));
            }
        };
        let field_type = match (field_type, value) {
            (FieldType::File, InputValue::Files(files)) => media_subtype(files),
            (field_type, _) => field_type,
        };
        let options = ValidationOptions::from_json(field_type, options, skip_default_merge)?;
        self.validate(value, field, &options).await
    }

    fn dispatch_value(
        &self,
        value: &FieldValue,
        field: &str,
        options: &ValidationOptions,
    ) -> FormResult<(bool, FieldValidator)> {
        Ok(match options {
            ValidationOptions::Text(o) | ValidationOptions::Textarea(o) => (
                self.text.validate(value, field, o)?,
                FieldValidator::Text(self.text.clone()),
            ),
            ValidationOptions::Email(o) => (
                self.email.validate(value, field, o)?,
                FieldValidator::Email(self.email.clone()),
            ),
            ValidationOptions::Fqdn(o) => (
                self.fqdn.validate(value, field, o)?,
                FieldValidator::Fqdn(self.fqdn.clone()),
            ),
            ValidationOptions::Url(o) => (
                self.url.validate(value, field, o)?,
                FieldValidator::Url(self.url.clone()),
            ),
            ValidationOptions::Date(o) => (
                self.date.validate(value, field, o)?,
                FieldValidator::Date(self.date.clone()),
            ),
            ValidationOptions::Number(o) => (
                self.number.validate(value, field, o)?,
                FieldValidator::Number(self.number.clone()),
            ),
            ValidationOptions::Password(o) => (
                self.password.validate(value, field, o)?,
                FieldValidator::Password(self.password.clone()),
            ),
            ValidationOptions::Tel(o) => (
                self.tel.validate(value, field, o)?,
                FieldValidator::Tel(self.tel.clone()),
            ),
            ValidationOptions::Select(o) => (
                self.select.validate(value, field, o)?,
                FieldValidator::Select(self.select.clone()),
            ),
            ValidationOptions::Checkbox(o) => (
                self.checkbox.validate(value, field, o)?,
                FieldValidator::Checkbox(self.checkbox.clone()),
            ),
            ValidationOptions::Radio(o) => (
                self.radio.validate(value, field, o)?,
                FieldValidator::Radio(self.radio.clone()),
            ),
            ValidationOptions::Image(_)
            | ValidationOptions::Video(_)
            | ValidationOptions::Document(_) => {
                return Err(FormError::UnsupportedMedia(format!(
                    "{} fields expect files",
                    options.field_type()
                )));
            }
        })
    }

    async fn dispatch_files(
        &self,
        files: &[FileInput],
        field: &str,
        options: &ValidationOptions,
    ) -> FormResult<(bool, FieldValidator)> {
        Ok(match options {
            ValidationOptions::Image(o) => (
                self.image.validate(files, field, o).await?,
                FieldValidator::Image(self.image.clone()),
            ),
            ValidationOptions::Video(o) => (
                self.video.validate(files, field, o).await?,
                FieldValidator::Video(self.video.clone()),
            ),
            ValidationOptions::Document(o) => (
                self.document.validate(files, field, o).await?,
                FieldValidator::Document(self.document.clone()),
            ),
            other => {
                return Err(FormError::UnsupportedMedia(format!(
                    "{} fields do not accept files",
                    other.field_type()
                )));
            }
        })
    }

    pub fn is_field_valid(&self, field: &str) -> bool {
        self.store.is_field_valid(field)
    }

    pub fn get_field_errors(&self, field: &str) -> Vec<String> {
        self.store.get_field_errors(field)
    }

    pub fn clear_field_state(&self, field: &str) {
        self.store.clear_field_state(field);
    }

    pub fn get_validator(&self, field: &str) -> Option<FieldValidator> {
        self.registry.get_validator(field)
    }
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Image, video or document, from the first file's declared type
fn media_subtype(files: &[FileInput]) -> FieldType {
    let declared = files.first().map(FileInput::declared_mime).unwrap_or_default();
    if declared.starts_with("image/") {
        FieldType::Image
    } else if declared.starts_with("video/") {
        FieldType::Video
    } else {
        FieldType::File
    }
}

/// Collaborators and shared state for a [`FormValidator`]
#[derive(Debug, Default)]
pub struct FormValidatorBuilder {
    store: Option<ErrorStore>,
    events: Option<EventSender>,
    phone_parser: Option<Arc<dyn PhoneNumberParser>>,
    video_probe: Option<Arc<dyn VideoProbe>>,
    document_parsers: Option<DocumentParsers>,
}

impl FormValidatorBuilder {
    /// Share an existing store instead of creating one
    pub fn store(mut self, store: ErrorStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish password scores and normalized phone numbers
    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn phone_parser(mut self, parser: Arc<dyn PhoneNumberParser>) -> Self {
        self.phone_parser = Some(parser);
        self
    }

    pub fn video_probe(mut self, probe: Arc<dyn VideoProbe>) -> Self {
        self.video_probe = Some(probe);
        self
    }

    /// Add a parser on top of the built-in ones
    pub fn document_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.document_parsers
            .get_or_insert_with(DocumentParsers::with_defaults)
            .register(parser);
        self
    }

    /// Replace the built-in parsers entirely
    pub fn document_parsers(mut self, parsers: DocumentParsers) -> Self {
        self.document_parsers = Some(parsers);
        self
    }

    pub fn build(self) -> FormValidator {
        let store = self.store.unwrap_or_default();
        let base = match self.events {
            Some(sender) => BaseValidator::new(store.clone()).with_events(sender),
            None => BaseValidator::new(store.clone()),
        };
        let phone_parser = self
            .phone_parser
            .unwrap_or_else(|| Arc::new(CallingCodeParser::new()));
        let video_probe = self.video_probe.unwrap_or_else(|| Arc::new(ContainerProbe));
        let document_parsers = self
            .document_parsers
            .unwrap_or_else(DocumentParsers::with_defaults);

        tracing::debug!(parsers = document_parsers.len(), "form validator ready");
        FormValidator {
            registry: ValidatorRegistry::new(),
            text: Arc::new(TextValidator::new(base.clone())),
            email: Arc::new(EmailValidator::new(base.clone())),
            fqdn: Arc::new(FqdnValidator::new(base.clone())),
            url: Arc::new(UrlValidator::new(base.clone())),
            date: Arc::new(DateValidator::new(base.clone())),
            number: Arc::new(NumberValidator::new(base.clone())),
            password: Arc::new(PasswordValidator::new(base.clone())),
            tel: Arc::new(TelValidator::new(base.clone(), phone_parser)),
            select: Arc::new(SelectValidator::new(base.clone())),
            checkbox: Arc::new(CheckboxValidator::new(base.clone())),
            radio: Arc::new(RadioValidator::new(base.clone())),
            image: Arc::new(ImageValidator::new(base.clone())),
            video: Arc::new(VideoValidator::new(base.clone(), video_probe)),
            document: Arc::new(DocumentValidator::new(base, Arc::new(document_parsers))),
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_core::TextOptions;

    #[test]
    fn test_registers_after_dispatch() {
        let validator = FormValidator::new();
        let options = ValidationOptions::Text(TextOptions::defaults());
        assert!(smol::block_on(validator.validate(&"Ada".into(), "name", &options)).unwrap());
        assert_eq!(validator.get_validator("name").unwrap().name(), "text");
    }

    #[test]
    fn test_media_subtype() {
        let png = FileInput::from_bytes("a.png", "image/png", vec![]);
        let mp4 = FileInput::from_bytes("a.mp4", "video/mp4", vec![]);
        let pdf = FileInput::from_bytes("a.pdf", "application/pdf", vec![]);
        assert_eq!(media_subtype(&[png]), FieldType::Image);
        assert_eq!(media_subtype(&[mp4]), FieldType::Video);
        assert_eq!(media_subtype(&[pdf]), FieldType::File);
        assert_eq!(media_subtype(&[]), FieldType::File);
    }

    #[test]
    fn test_files_for_text_field() {
        let validator = FormValidator::new();
        let files = InputValue::from(FileInput::from_bytes("a.txt", "text/plain", vec![]));
        let options = ValidationOptions::Text(TextOptions::defaults());
        assert!(matches!(
            smol::block_on(validator.validate(&files, "name", &options)),
            Err(FormError::UnsupportedMedia(_))
        ));
        assert!(validator.get_validator("name").is_none());
    }
}
