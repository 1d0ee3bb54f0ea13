//! File inputs and the checks every media validator shares

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use formcheck_core::BaseValidator;
use serde::{Deserialize, Serialize};
use smol::io::AsyncReadExt;

use crate::MediaError;

/// Where a file's bytes live
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Arc<[u8]>),
    Disk(PathBuf),
}

/// One selected file
#[derive(Debug, Clone)]
pub struct FileInput {
    /// File name as shown to the user
    pub name: String,
    /// Declared content type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    source: FileSource,
}

impl FileInput {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Arc<[u8]> = bytes.into().into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// Describe a file on disk; its bytes are read lazily
    pub async fn from_path(
        path: impl AsRef<Path>,
        mime_type: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let metadata = smol::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            mime_type: mime_type.into(),
            size: metadata.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Lowercase extension without the dot
    pub fn extension(&self) -> Option<String> {
        let (stem, extension) = self.name.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }

    /// Declared type, lowercased, with common aliases folded
    pub fn declared_mime(&self) -> String {
        normalize_mime(&self.mime_type)
    }

    /// Up to `len` leading bytes
    pub async fn read_head(&self, len: usize) -> Result<Vec<u8>, MediaError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes[..len.min(bytes.len())].to_vec()),
            FileSource::Disk(path) => {
                let file = smol::fs::File::open(path).await?;
                let mut head = Vec::with_capacity(len);
                file.take(len as u64).read_to_end(&mut head).await?;
                Ok(head)
            }
        }
    }

    pub async fn read_all(&self) -> Result<Vec<u8>, MediaError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
            FileSource::Disk(path) => Ok(smol::fs::read(path).await?),
        }
    }
}

/// Fold content-type aliases onto one spelling
pub fn normalize_mime(mime: &str) -> String {
    let mime = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-ms-bmp" => "image/bmp".to_string(),
        "image/svg" => "image/svg+xml".to_string(),
        "application/csv" | "text/comma-separated-values" => "text/csv".to_string(),
        _ => mime,
    }
}

/// Content type to file extensions
const MIME_EXTENSIONS: &[(&str, &[&str])] = &[
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/bmp", &["bmp"]),
    ("image/webp", &["webp"]),
    ("image/svg+xml", &["svg"]),
    ("video/mp4", &["mp4", "m4v"]),
    ("video/webm", &["webm"]),
    ("video/ogg", &["ogv", "ogg"]),
    ("video/quicktime", &["mov"]),
    ("application/pdf", &["pdf"]),
    ("application/msword", &["doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    ("application/vnd.ms-excel", &["xls"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
    ("application/vnd.ms-powerpoint", &["ppt"]),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["pptx"],
    ),
    ("text/csv", &["csv"]),
    ("text/plain", &["txt"]),
];

/// Extensions registered for a content type
pub fn extensions_for_mime(mime: &str) -> &'static [&'static str] {
    let mime = normalize_mime(mime);
    MIME_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == mime)
        .map(|(_, extensions)| *extensions)
        .unwrap_or(&[])
}

/// Unit for `max_size`, 1024-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    B,
    KB,
    #[default]
    MB,
    GB,
}

impl SizeUnit {
    pub fn bytes(self) -> f64 {
        match self {
            SizeUnit::B => 1.0,
            SizeUnit::KB => 1024.0,
            SizeUnit::MB => 1024.0 * 1024.0,
            SizeUnit::GB => 1024.0 * 1024.0 * 1024.0,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SizeUnit::B => "B",
            SizeUnit::KB => "KB",
            SizeUnit::MB => "MB",
            SizeUnit::GB => "GB",
        };
        write!(f, "{label}")
    }
}

/// Options every file field carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileOptions {
    pub required: bool,
    pub allowed_mime_types: Vec<String>,
    /// Replaces the extensions derived from `allowed_mime_types`
    pub extensions: Option<Vec<String>>,
    pub max_size: Option<f64>,
    pub unit: SizeUnit,
}

impl FileOptions {
    /// Documents: PDF, Word, Excel, CSV and plain text up to 10 MB
    pub fn defaults() -> Self {
        Self {
            allowed_mime_types: [
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.ms-excel",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "text/csv",
                "text/plain",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_size: Some(10.0),
            unit: SizeUnit::MB,
            ..Default::default()
        }
    }

    /// Allowed extensions, lowercase
    pub fn allowed_extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(extensions) => extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => self
                .allowed_mime_types
                .iter()
                .flat_map(|mime| extensions_for_mime(mime).iter().map(|ext| ext.to_string()))
                .collect(),
        }
    }

    pub fn allows_mime(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.allowed_mime_types
            .iter()
            .any(|allowed| normalize_mime(allowed) == mime)
    }
}

/// Per-file checks shared by the image, video and document validators
#[derive(Debug, Clone)]
pub struct FileRules {
    base: BaseValidator,
}

impl FileRules {
    pub fn new(base: BaseValidator) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    /// Clear the field and handle an empty selection.
    ///
    /// Returns `true` when there are files left to check.
    pub fn begin(&self, files: &[FileInput], field: &str, options: &FileOptions) -> bool {
        self.base.begin(field);
        if files.is_empty() {
            if options.required {
                self.base.fail(field, "Please select a file.");
            }
            return false;
        }
        true
    }

    pub fn check_extension(&self, file: &FileInput, field: &str, options: &FileOptions) -> bool {
        let allowed = options.allowed_extensions();
        match file.extension() {
            Some(extension) if allowed.contains(&extension) => true,
            Some(extension) => self
                .base
                .fail(field, format!("{}: .{extension} files are not allowed.", file.name)),
            None => self.base.fail(
                field,
                format!("{}: files without an extension are not allowed.", file.name),
            ),
        }
    }

    pub fn check_size(&self, file: &FileInput, field: &str, options: &FileOptions) -> bool {
        let Some(max_size) = options.max_size else {
            return true;
        };
        if file.size as f64 > max_size * options.unit.bytes() {
            return self.base.fail(
                field,
                format!("{} is larger than {max_size} {}.", file.name, options.unit),
            );
        }
        true
    }

    /// Record `message` for `file` and return `false`
    pub fn fail(&self, file: &FileInput, field: &str, message: &str) -> bool {
        tracing::debug!(field, file = %file.name, message, "file rejected");
        self.base.fail(field, format!("{} {message}", file.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_core::ErrorStore;

    #[test]
    fn test_extension() {
        assert_eq!(FileInput::from_bytes("Photo.JPG", "image/jpeg", vec![]).extension().as_deref(), Some("jpg"));
        assert_eq!(FileInput::from_bytes(".bashrc", "", vec![]).extension(), None);
        assert_eq!(FileInput::from_bytes("README", "", vec![]).extension(), None);
    }

    #[test]
    fn test_allowed_extensions_from_mime() {
        let options = FileOptions {
            allowed_mime_types: vec!["image/jpeg".into(), "image/png".into()],
            ..Default::default()
        };
        assert_eq!(options.allowed_extensions(), vec!["jpg", "jpeg", "png"]);

        let explicit = FileOptions {
            extensions: Some(vec![".PDF".into()]),
            ..options
        };
        assert_eq!(explicit.allowed_extensions(), vec!["pdf"]);
    }

    #[test]
    fn test_mime_aliases() {
        assert_eq!(normalize_mime("image/JPG"), "image/jpeg");
        assert_eq!(normalize_mime("text/csv; charset=utf-8"), "text/csv");
    }

    #[test]
    fn test_size_limit() {
        let rules = FileRules::new(BaseValidator::new(ErrorStore::new()));
        let options = FileOptions {
            max_size: Some(1.0),
            unit: SizeUnit::KB,
            ..Default::default()
        };
        let small = FileInput::from_bytes("a.txt", "text/plain", vec![0; 1024]);
        let large = FileInput::from_bytes("b.txt", "text/plain", vec![0; 1025]);
        assert!(rules.check_size(&small, "upload", &options));
        assert!(!rules.check_size(&large, "upload", &options));
        assert_eq!(
            rules.base().field_errors("upload"),
            vec!["b.txt is larger than 1 KB."]
        );
    }

    #[test]
    fn test_read_head_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello world").unwrap();

        smol::block_on(async {
            let file = FileInput::from_path(&path, "text/plain").await.unwrap();
            assert_eq!(file.name, "note.txt");
            assert_eq!(file.size, 11);
            assert_eq!(file.read_head(5).await.unwrap(), b"hello");
            assert_eq!(file.read_all().await.unwrap(), b"hello world");
        });
    }
}
