//! Image validation
//!
//! Per file: extension, size, magic-byte sniff against the declared type,
//! then dimension bounds. Each file stops at its own first failure.

use std::io::Cursor;

use formcheck_core::{BaseValidator, ErrorStore, FormResult};
use image::ImageReader;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::file::{FileInput, FileOptions, FileRules, SizeUnit};
use crate::signature::{ImageKind, MARKUP_SNIFF_LEN, SNIFF_LEN};
use crate::MediaError;

static SVG_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<svg\b[^>]*>").unwrap());
static SVG_WIDTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\swidth\s*=\s*["']\s*([0-9]*\.?[0-9]+)\s*(?:px)?\s*["']"#).unwrap());
static SVG_HEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\sheight\s*=\s*["']\s*([0-9]*\.?[0-9]+)\s*(?:px)?\s*["']"#).unwrap());
static SVG_VIEWBOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\sviewbox\s*=\s*["']\s*-?[0-9.]+[\s,]+-?[0-9.]+[\s,]+([0-9.]+)[\s,]+([0-9.]+)\s*["']"#)
        .unwrap()
});

/// Pixel bounds shared by images and videos
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DimensionBounds {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

impl DimensionBounds {
    pub fn is_unbounded(&self) -> bool {
        self.min_width.is_none()
            && self.max_width.is_none()
            && self.min_height.is_none()
            && self.max_height.is_none()
    }

    /// Every violated bound, in width-then-height order
    pub fn violations(&self, width: u32, height: u32) -> Vec<String> {
        let mut violations = Vec::new();
        if let Some(min) = self.min_width.filter(|min| width < *min) {
            violations.push(format!("must be at least {min}px wide."));
        }
        if let Some(max) = self.max_width.filter(|max| width > *max) {
            violations.push(format!("must be at most {max}px wide."));
        }
        if let Some(min) = self.min_height.filter(|min| height < *min) {
            violations.push(format!("must be at least {min}px tall."));
        }
        if let Some(max) = self.max_height.filter(|max| height > *max) {
            violations.push(format!("must be at most {max}px tall."));
        }
        violations
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageOptions {
    #[serde(flatten)]
    pub file: FileOptions,
    #[serde(flatten)]
    pub dimensions: DimensionBounds,
}

impl ImageOptions {
    /// jpg, png, gif, bmp, webp and svg up to 5 MB
    pub fn defaults() -> Self {
        Self {
            file: FileOptions {
                allowed_mime_types: [
                    "image/jpeg",
                    "image/png",
                    "image/gif",
                    "image/bmp",
                    "image/webp",
                    "image/svg+xml",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                max_size: Some(5.0),
                unit: SizeUnit::MB,
                ..Default::default()
            },
            dimensions: DimensionBounds::default(),
        }
    }
}

/// Sniff the head of `file`, reading further when a long XML prolog hides the root
async fn sniff_file(file: &FileInput) -> Result<Option<ImageKind>, MediaError> {
    let head = file.read_head(SNIFF_LEN).await?;
    if let Some(kind) = ImageKind::sniff(&head) {
        return Ok(Some(kind));
    }
    if head.len() < SNIFF_LEN || !ImageKind::may_be_markup(&head) {
        return Ok(None);
    }
    let head = file.read_head(MARKUP_SNIFF_LEN).await?;
    Ok(ImageKind::sniff(&head))
}

/// Width and height of an image the sniffer already identified
pub fn image_dimensions(kind: ImageKind, bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    let Some(format) = kind.raster_format() else {
        return svg_dimensions(bytes);
    };
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|err| MediaError::Decode(err.to_string()))
}

/// Width and height attributes of the root element, falling back to the viewBox
pub fn svg_dimensions(bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    let text = String::from_utf8_lossy(bytes);
    let root = SVG_ROOT
        .find(&text)
        .ok_or_else(|| MediaError::Decode("no <svg> element".into()))?
        .as_str();

    let attribute = |pattern: &Regex| -> Option<f64> {
        pattern.captures(root)?.get(1)?.as_str().parse().ok()
    };
    let (width, height) = match (attribute(&SVG_WIDTH), attribute(&SVG_HEIGHT)) {
        (Some(width), Some(height)) => (width, height),
        _ => {
            let view_box = SVG_VIEWBOX
                .captures(root)
                .ok_or_else(|| MediaError::Decode("svg has no size".into()))?;
            let parse = |index: usize| -> Result<f64, MediaError> {
                view_box
                    .get(index)
                    .and_then(|m| m.as_str().parse().ok())
                    .ok_or_else(|| MediaError::Decode("malformed viewBox".into()))
            };
            (parse(1)?, parse(2)?)
        }
    };
    Ok((width.round() as u32, height.round() as u32))
}

#[derive(Debug, Clone)]
pub struct ImageValidator {
    rules: FileRules,
}

impl ImageValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self {
            rules: FileRules::new(base),
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store))
    }

    pub fn base(&self) -> &BaseValidator {
        self.rules.base()
    }

    pub async fn validate(
        &self,
        files: &[FileInput],
        field: &str,
        options: &ImageOptions,
    ) -> FormResult<bool> {
        if self.rules.begin(files, field, &options.file) {
            for file in files {
                self.check_file(file, field, options).await;
            }
        }
        Ok(self.base().is_field_valid(field))
    }

    async fn check_file(&self, file: &FileInput, field: &str, options: &ImageOptions) -> bool {
        if !self.rules.check_extension(file, field, &options.file)
            || !self.rules.check_size(file, field, &options.file)
        {
            return false;
        }

        let kind = match sniff_file(file).await {
            Ok(kind) => kind,
            Err(err) => {
                tracing::warn!(file = %file.name, error = %err, "could not read image");
                return self.rules.fail(file, field, "could not be read.");
            }
        };
        let Some(kind) = kind else {
            return self.rules.fail(file, field, "is not a valid image.");
        };

        let declared = file.declared_mime();
        if declared != kind.mime_type() {
            return self.rules.fail(
                file,
                field,
                &format!(
                    "looks like a disguised file: it is declared as {} but contains {}.",
                    if declared.is_empty() { "an unknown type" } else { declared.as_str() },
                    kind.mime_type()
                ),
            );
        }
        if !options.file.allows_mime(kind.mime_type()) {
            return self.rules.fail(
                file,
                field,
                &format!("is a {} image, which is not allowed.", kind.mime_type()),
            );
        }

        if options.dimensions.is_unbounded() {
            return true;
        }
        let dimensions = match file.read_all().await {
            Ok(bytes) => image_dimensions(kind, &bytes),
            Err(err) => Err(err),
        };
        let (width, height) = match dimensions {
            Ok(dimensions) => dimensions,
            Err(err) => {
                tracing::debug!(file = %file.name, error = %err, "image dimensions unavailable");
                return self.rules.fail(file, field, "could not be decoded.");
            }
        };

        let violations = options.dimensions.violations(width, height);
        for violation in &violations {
            self.rules.fail(file, field, violation);
        }
        violations.is_empty()
    }
}
