//! Magic-byte signatures
//!
//! Detects what a file really is from its leading bytes, independent of
//! its name and declared type.

use image::ImageFormat;

/// Leading bytes read for sniffing
pub const SNIFF_LEN: usize = 512;

/// Leading bytes read when a markup prolog outgrows [`SNIFF_LEN`]
pub const MARKUP_SNIFF_LEN: usize = 64 * 1024;

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Image types the image validator recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
    Svg,
}

impl ImageKind {
    /// Detect the image type from magic bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        // BMP: "BM" then the file size and two reserved zero words
        if data.len() >= 14 && data.starts_with(b"BM") && data[6..10] == [0, 0, 0, 0] {
            return Some(Self::Bmp);
        }

        if looks_like_svg(data) {
            return Some(Self::Svg);
        }

        None
    }

    /// Whether `data` opens like XML, so a longer head may still reach `<svg`
    pub fn may_be_markup(data: &[u8]) -> bool {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        data.iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'<')
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Raster format for the image crate; `None` for SVG
    pub fn raster_format(self) -> Option<ImageFormat> {
        match self {
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Png => Some(ImageFormat::Png),
            Self::Gif => Some(ImageFormat::Gif),
            Self::Bmp => Some(ImageFormat::Bmp),
            Self::WebP => Some(ImageFormat::WebP),
            Self::Svg => None,
        }
    }
}

/// Text markup whose root element is `<svg`
fn looks_like_svg(data: &[u8]) -> bool {
    let text = String::from_utf8_lossy(data);
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();

    // Skip the XML declaration, comments and a doctype before the root
    loop {
        if let Some(after) = rest.strip_prefix("<?") {
            match after.find("?>") {
                Some(end) => rest = after[end + 2..].trim_start(),
                None => return false,
            }
        } else if let Some(after) = rest.strip_prefix("<!--") {
            match after.find("-->") {
                Some(end) => rest = after[end + 3..].trim_start(),
                None => return false,
            }
        } else if starts_with_ignore_case(rest, "<!doctype") {
            match doctype_end(rest) {
                Some(end) => rest = rest[end..].trim_start(),
                None => return false,
            }
        } else {
            break;
        }
    }

    starts_with_ignore_case(rest, "<svg")
}

/// Byte offset just past a doctype, including any `[ ... ]` internal subset
fn doctype_end(doctype: &str) -> Option<usize> {
    let close = doctype.find('>')?;
    let Some(open) = doctype.find('[').filter(|open| *open < close) else {
        return Some(close + 1);
    };

    let mut from = open + 1;
    while let Some(offset) = doctype[from..].find(']') {
        let after = from + offset + 1;
        let tail = doctype[after..].trim_start();
        if tail.starts_with('>') {
            return Some(doctype.len() - tail.len() + 1);
        }
        from = after;
    }
    None
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Document container families, keyed by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// docx, xlsx, pptx: a zip package
    OfficeOpenXml,
    /// doc, xls, ppt: a compound file
    Ole,
    /// csv, txt
    Text,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "xlsx" | "pptx" => Some(Self::OfficeOpenXml),
            "doc" | "xls" | "ppt" => Some(Self::Ole),
            "csv" | "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Whether `head` carries this family's signature
    pub fn matches(self, head: &[u8]) -> bool {
        match self {
            Self::Pdf => head.starts_with(b"%PDF-"),
            Self::OfficeOpenXml => head.starts_with(b"PK\x03\x04"),
            Self::Ole => head.starts_with(&OLE_MAGIC),
            Self::Text => !head.contains(&0),
        }
    }
}
