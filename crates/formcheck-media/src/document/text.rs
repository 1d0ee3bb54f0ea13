//! Text documents

use super::DocumentParser;
use crate::MediaError;

fn decode(data: &[u8]) -> Result<&str, MediaError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let text = std::str::from_utf8(data)
        .map_err(|e| MediaError::Parse(format!("not UTF-8 text: {e}")))?;
    if text.contains('\0') {
        return Err(MediaError::Parse("contains NUL bytes".into()));
    }
    Ok(text)
}

/// UTF-8 without NUL bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn name(&self) -> &str {
        "text"
    }

    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn parse(&self, data: &[u8]) -> Result<(), MediaError> {
        decode(data).map(|_| ())
    }
}

/// Quote-aware CSV reader; every record must have the same field count
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

/// Field count of each non-blank record
fn record_widths(text: &str) -> Result<Vec<usize>, MediaError> {
    let mut widths = Vec::new();
    let mut fields = 1;
    let mut blank = true;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => {
                in_quotes = true;
                blank = false;
            }
            ',' if !in_quotes => {
                fields += 1;
                blank = false;
            }
            '\n' if !in_quotes => {
                if !blank {
                    widths.push(fields);
                }
                fields = 1;
                blank = true;
            }
            c if !c.is_whitespace() => blank = false,
            _ => {}
        }
    }

    if in_quotes {
        return Err(MediaError::Parse("unterminated quoted field".into()));
    }
    if !blank {
        widths.push(fields);
    }
    Ok(widths)
}

impl DocumentParser for CsvParser {
    fn name(&self) -> &str {
        "csv"
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn parse(&self, data: &[u8]) -> Result<(), MediaError> {
        let widths = record_widths(decode(data)?)?;
        let Some(expected) = widths.first().copied() else {
            return Err(MediaError::Parse("no records".into()));
        };
        if let Some((index, width)) = widths
            .iter()
            .enumerate()
            .find(|(_, width)| **width != expected)
        {
            let record = index + 1;
            return Err(MediaError::Parse(format!(
                "record {record} has {width} fields, expected {expected}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_quotes() {
        let csv = "name,quote\r\n\"Lovelace, Ada\",\"She said \"\"hi\"\"\nthen left\"\r\n";
        assert_eq!(record_widths(csv).unwrap(), vec![2, 2]);
        assert!(CsvParser.parse(csv.as_bytes()).is_ok());
    }

    #[test]
    fn test_csv_rejects_ragged_rows() {
        let err = CsvParser.parse(b"a,b,c\n1,2\n").unwrap_err();
        assert!(err.to_string().contains("record 2 has 2 fields, expected 3"));
        assert!(CsvParser.parse(b"a,\"open\n").is_err());
        assert!(CsvParser.parse(b"\n\n").is_err());
    }

    #[test]
    fn test_plain_text() {
        assert!(PlainTextParser.parse("\u{feff}notes: café".as_bytes()).is_ok());
        let err = PlainTextParser.parse(b"\xff\xfe\x00").unwrap_err();
        assert!(err.to_string().contains("not UTF-8 text"));
    }
}
