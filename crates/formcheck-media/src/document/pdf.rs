use super::DocumentParser;
use crate::MediaError;

/// Bytes searched at the end of the file for the trailer
const TRAILER_WINDOW: usize = 1024;

/// Header version, then `startxref` and `%%EOF` in the trailer
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

impl DocumentParser for PdfParser {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn parse(&self, data: &[u8]) -> Result<(), MediaError> {
        let version = data
            .strip_prefix(b"%PDF-")
            .ok_or_else(|| MediaError::Parse("missing %PDF header".into()))?;
        match version {
            [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {}
            _ => return Err(MediaError::Parse("malformed version in header".into())),
        }

        let tail = &data[data.len().saturating_sub(TRAILER_WINDOW)..];
        if !contains(tail, b"%%EOF") {
            return Err(MediaError::Parse("missing %%EOF marker".into()));
        }
        if !contains(tail, b"startxref") {
            return Err(MediaError::Parse("missing cross-reference offset".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_structure() {
        let parser = PdfParser;
        assert!(parser.parse(b"%PDF-1.7\n...\nstartxref\n0\n%%EOF").is_ok());
        assert!(parser.parse(b"%PDF-1.7\n...").is_err());
        assert!(parser.parse(b"%PDF-x\nstartxref\n%%EOF").is_err());
        assert!(parser.parse(b"hello").is_err());
    }
}
