//! Office containers: OOXML zip packages and legacy compound files

use std::io::Cursor;

use zip::ZipArchive;

use super::DocumentParser;
use crate::MediaError;

const CONTENT_TYPES: &str = "[Content_Types].xml";
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const OLE_HEADER_LEN: usize = 512;

/// Opens the zip package and requires the content-type map and main part
#[derive(Debug, Clone, Copy)]
pub struct OoxmlParser {
    name: &'static str,
    extensions: &'static [&'static str],
    main_part: &'static str,
}

impl OoxmlParser {
    pub fn word() -> Self {
        Self {
            name: "word",
            extensions: &["docx"],
            main_part: "word/document.xml",
        }
    }

    pub fn spreadsheet() -> Self {
        Self {
            name: "spreadsheet",
            extensions: &["xlsx"],
            main_part: "xl/workbook.xml",
        }
    }

    pub fn presentation() -> Self {
        Self {
            name: "presentation",
            extensions: &["pptx"],
            main_part: "ppt/presentation.xml",
        }
    }
}

impl DocumentParser for OoxmlParser {
    fn name(&self) -> &str {
        self.name
    }

    fn extensions(&self) -> &[&str] {
        self.extensions
    }

    fn parse(&self, data: &[u8]) -> Result<(), MediaError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| MediaError::Parse(format!("Invalid package: {e}")))?;

        for part in [CONTENT_TYPES, self.main_part] {
            archive
                .by_name(part)
                .map_err(|e| MediaError::Parse(format!("Missing {part}: {e}")))?;
        }
        Ok(())
    }
}

/// Checks the compound file header of .doc, .xls and .ppt files
#[derive(Debug, Clone, Copy, Default)]
pub struct OleParser;

impl DocumentParser for OleParser {
    fn name(&self) -> &str {
        "compound file"
    }

    fn extensions(&self) -> &[&str] {
        &["doc", "xls", "ppt"]
    }

    fn parse(&self, data: &[u8]) -> Result<(), MediaError> {
        if data.len() < OLE_HEADER_LEN || !data.starts_with(&OLE_MAGIC) {
            return Err(MediaError::Parse("truncated compound file header".into()));
        }
        // Byte order mark, always little-endian
        if data[28..30] != [0xFE, 0xFF] {
            return Err(MediaError::Parse("bad byte order mark".into()));
        }
        // Sector size is 2^9 (v3) or 2^12 (v4)
        let sector_shift = u16::from_le_bytes([data[30], data[31]]);
        if sector_shift != 9 && sector_shift != 12 {
            return Err(MediaError::Parse(format!("unsupported sector shift {sector_shift}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn package(parts: &[&str]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for part in parts {
            zip.start_file(*part, options).unwrap();
            zip.write_all(b"<?xml version=\"1.0\"?><root/>").unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_ooxml_parts() {
        let word = OoxmlParser::word();
        assert!(word.parse(&package(&[CONTENT_TYPES, "word/document.xml"])).is_ok());
        let err = word.parse(&package(&[CONTENT_TYPES, "xl/workbook.xml"])).unwrap_err();
        assert!(err.to_string().contains("Missing word/document.xml"));
        assert!(OoxmlParser::spreadsheet()
            .parse(&package(&[CONTENT_TYPES, "xl/workbook.xml"]))
            .is_ok());
        assert!(word.parse(b"PK\x03\x04 truncated").is_err());
    }

    #[test]
    fn test_ole_header() {
        let mut header = vec![0u8; OLE_HEADER_LEN];
        header[..8].copy_from_slice(&OLE_MAGIC);
        header[28..30].copy_from_slice(&[0xFE, 0xFF]);
        header[30..32].copy_from_slice(&9u16.to_le_bytes());
        assert!(OleParser.parse(&header).is_ok());

        header[30..32].copy_from_slice(&7u16.to_le_bytes());
        let err = OleParser.parse(&header).unwrap_err();
        assert!(err.to_string().contains("unsupported sector shift 7"));
        assert!(OleParser.parse(&OLE_MAGIC).is_err());
    }
}
