//! Field categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every field category the router dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Fqdn,
    Url,
    Date,
    Number,
    Password,
    Tel,
    Select,
    Checkbox,
    Radio,
    Image,
    Video,
    /// Generic upload; the media subtype is taken from the files
    File,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Fqdn => "fqdn",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Password => "password",
            FieldType::Tel => "tel",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Image => "image",
            FieldType::Video => "video",
            FieldType::File => "file",
        }
    }

    /// Validated by group name rather than field name
    pub fn is_group(self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Radio)
    }

    pub fn is_media(self) -> bool {
        matches!(self, FieldType::Image | FieldType::Video | FieldType::File)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field type: {0}")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "email" => Ok(FieldType::Email),
            "fqdn" => Ok(FieldType::Fqdn),
            "url" => Ok(FieldType::Url),
            "date" => Ok(FieldType::Date),
            "number" => Ok(FieldType::Number),
            "password" => Ok(FieldType::Password),
            "tel" => Ok(FieldType::Tel),
            "select" | "select-one" | "select-multiple" => Ok(FieldType::Select),
            "checkbox" => Ok(FieldType::Checkbox),
            "radio" => Ok(FieldType::Radio),
            "image" => Ok(FieldType::Image),
            "video" => Ok(FieldType::Video),
            "file" | "document" => Ok(FieldType::File),
            _ => Err(UnknownFieldType(tag.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!("select-multiple".parse::<FieldType>().unwrap(), FieldType::Select);
        assert_eq!(" EMAIL ".parse::<FieldType>().unwrap(), FieldType::Email);
        assert_eq!("document".parse::<FieldType>().unwrap(), FieldType::File);
        assert_eq!(
            "color".parse::<FieldType>(),
            Err(UnknownFieldType("color".into()))
        );
    }

    #[test]
    fn test_display_round_trips() {
        for field_type in [FieldType::Tel, FieldType::Checkbox, FieldType::Video] {
            assert_eq!(field_type.to_string().parse::<FieldType>().unwrap(), field_type);
        }
    }

    #[test]
    fn test_categories() {
        assert!(FieldType::Radio.is_group());
        assert!(!FieldType::Select.is_group());
        assert!(FieldType::File.is_media());
        assert!(!FieldType::Url.is_media());
    }
}
