//! formcheck media
//!
//! File validators for formcheck.
//!
//! Features:
//! - File inputs backed by memory or disk
//! - Magic-byte signature sniffing (jpg, png, gif, bmp, webp, svg, pdf, zip, ole)
//! - Image validation with dimension bounds
//! - Video validation with metadata probing (MP4/MOV and WebM built in)
//! - Document validation with deep content parsing (PDF, OOXML, OLE, CSV, text)
//!
//! Files in one field are validated one after another; a failing file
//! records its error and the next file is still checked.

pub mod file;
pub mod signature;
pub mod image;
pub mod video;
pub mod document;

pub use file::{FileInput, FileOptions, FileRules, FileSource, SizeUnit};
pub use signature::{DocumentKind, ImageKind};
pub use image::{DimensionBounds, ImageOptions, ImageValidator};
pub use video::{
    ContainerProbe, IsoBmffProbe, MatroskaProbe, VideoMetadata, VideoOptions, VideoProbe,
    VideoValidator,
};
pub use document::{
    CsvParser, DocumentParser, DocumentParsers, DocumentValidator, OleParser, OoxmlParser,
    PdfParser, PlainTextParser,
};

/// Media error
///
/// Raised while reading or parsing one file; validators record it as that
/// file's failure and move on.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
