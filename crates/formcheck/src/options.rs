//! Options for every field category
//!
//! Callers hand over JSON shaped like the field's data attributes; it is
//! merged over the category defaults and deserialized into the matching
//! variant.

use formcheck_core::{
    CheckboxOptions, DateOptions, EmailOptions, FormResult, FqdnOptions, NumberOptions,
    PasswordOptions, RadioOptions, SelectOptions, TelOptions, TextOptions, UrlOptions,
    resolve_options,
};
use formcheck_media::{FileOptions, ImageOptions, VideoOptions};
use serde_json::Value;

use crate::field_type::FieldType;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOptions {
    Text(TextOptions),
    Textarea(TextOptions),
    Email(EmailOptions),
    Fqdn(FqdnOptions),
    Url(UrlOptions),
    Date(DateOptions),
    Number(NumberOptions),
    Password(PasswordOptions),
    Tel(TelOptions),
    Select(SelectOptions),
    Checkbox(CheckboxOptions),
    Radio(RadioOptions),
    Image(ImageOptions),
    Video(VideoOptions),
    Document(FileOptions),
}

impl ValidationOptions {
    /// Category defaults
    pub fn defaults(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Self::Text(TextOptions::defaults()),
            FieldType::Textarea => Self::Textarea(TextOptions::textarea_defaults()),
            FieldType::Email => Self::Email(EmailOptions::defaults()),
            FieldType::Fqdn => Self::Fqdn(FqdnOptions::defaults()),
            FieldType::Url => Self::Url(UrlOptions::defaults()),
            FieldType::Date => Self::Date(DateOptions::defaults()),
            FieldType::Number => Self::Number(NumberOptions::defaults()),
            FieldType::Password => Self::Password(PasswordOptions::defaults()),
            FieldType::Tel => Self::Tel(TelOptions::defaults()),
            FieldType::Select => Self::Select(SelectOptions::defaults()),
            FieldType::Checkbox => Self::Checkbox(CheckboxOptions::defaults()),
            FieldType::Radio => Self::Radio(RadioOptions::defaults()),
            FieldType::Image => Self::Image(ImageOptions::defaults()),
            FieldType::Video => Self::Video(VideoOptions::defaults()),
            FieldType::File => Self::Document(FileOptions::defaults()),
        }
    }

    /// Deserialize caller JSON, merged over the category defaults unless
    /// `skip_default_merge`
    pub fn from_json(
        field_type: FieldType,
        json: Value,
        skip_default_merge: bool,
    ) -> FormResult<Self> {
        let tag = field_type.as_str();
        let skip = skip_default_merge;
        Ok(match field_type {
            FieldType::Text => Self::Text(resolve_options(tag, &TextOptions::defaults(), json, skip)?),
            FieldType::Textarea => Self::Textarea(resolve_options(
                tag,
                &TextOptions::textarea_defaults(),
                json,
                skip,
            )?),
            FieldType::Email => Self::Email(resolve_options(tag, &EmailOptions::defaults(), json, skip)?),
            FieldType::Fqdn => Self::Fqdn(resolve_options(tag, &FqdnOptions::defaults(), json, skip)?),
            FieldType::Url => Self::Url(resolve_options(tag, &UrlOptions::defaults(), json, skip)?),
            FieldType::Date => Self::Date(resolve_options(tag, &DateOptions::defaults(), json, skip)?),
            FieldType::Number => {
                Self::Number(resolve_options(tag, &NumberOptions::defaults(), json, skip)?)
            }
            FieldType::Password => {
                Self::Password(resolve_options(tag, &PasswordOptions::defaults(), json, skip)?)
            }
            FieldType::Tel => Self::Tel(resolve_options(tag, &TelOptions::defaults(), json, skip)?),
            FieldType::Select => {
                Self::Select(resolve_options(tag, &SelectOptions::defaults(), json, skip)?)
            }
            FieldType::Checkbox => {
                Self::Checkbox(resolve_options(tag, &CheckboxOptions::defaults(), json, skip)?)
            }
            FieldType::Radio => Self::Radio(resolve_options(tag, &RadioOptions::defaults(), json, skip)?),
            FieldType::Image => Self::Image(resolve_options(tag, &ImageOptions::defaults(), json, skip)?),
            FieldType::Video => Self::Video(resolve_options(tag, &VideoOptions::defaults(), json, skip)?),
            FieldType::File => {
                Self::Document(resolve_options(tag, &FileOptions::defaults(), json, skip)?)
            }
        })
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Textarea(_) => FieldType::Textarea,
            Self::Email(_) => FieldType::Email,
            Self::Fqdn(_) => FieldType::Fqdn,
            Self::Url(_) => FieldType::Url,
            Self::Date(_) => FieldType::Date,
            Self::Number(_) => FieldType::Number,
            Self::Password(_) => FieldType::Password,
            Self::Tel(_) => FieldType::Tel,
            Self::Select(_) => FieldType::Select,
            Self::Checkbox(_) => FieldType::Checkbox,
            Self::Radio(_) => FieldType::Radio,
            Self::Image(_) => FieldType::Image,
            Self::Video(_) => FieldType::Video,
            Self::Document(_) => FieldType::File,
        }
    }
}
