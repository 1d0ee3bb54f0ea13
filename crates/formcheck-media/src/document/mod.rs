//! Document validation
//!
//! Per file: extension, size, container signature, then a deep parse by
//! the parser registered for the extension. A parse failure is recorded as
//! that file's error; it never aborts the field.

mod office;
mod pdf;
mod text;

pub use office::{OleParser, OoxmlParser};
pub use pdf::PdfParser;
pub use text::{CsvParser, PlainTextParser};

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use formcheck_core::{BaseValidator, ErrorStore, FormResult};

use crate::file::{FileInput, FileOptions, FileRules};
use crate::signature::{DocumentKind, SNIFF_LEN};
use crate::MediaError;

/// Deep content check for one document family
pub trait DocumentParser: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Extensions this parser handles, without the dot
    fn extensions(&self) -> &[&str];

    /// Walk the document structure; `Err` when it is damaged
    fn parse(&self, data: &[u8]) -> Result<(), MediaError>;
}

/// Parsers keyed by file extension
#[derive(Debug, Clone, Default)]
pub struct DocumentParsers {
    parsers: Vec<Arc<dyn DocumentParser>>,
    by_extension: HashMap<String, usize>,
}

impl DocumentParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// PDF, Word, Excel, PowerPoint, CSV and plain text
    pub fn with_defaults() -> Self {
        let mut parsers = Self::new();
        parsers.register(Arc::new(PdfParser));
        parsers.register(Arc::new(OoxmlParser::word()));
        parsers.register(Arc::new(OoxmlParser::spreadsheet()));
        parsers.register(Arc::new(OoxmlParser::presentation()));
        parsers.register(Arc::new(OleParser));
        parsers.register(Arc::new(CsvParser));
        parsers.register(Arc::new(PlainTextParser));
        parsers
    }

    /// Later registrations for the same extension override earlier ones
    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        let index = self.parsers.len();
        for extension in parser.extensions() {
            let key = extension.trim_start_matches('.').to_ascii_lowercase();
            if !key.is_empty() {
                self.by_extension.insert(key, index);
            }
        }
        self.parsers.push(parser);
    }

    pub fn for_extension(&self, extension: &str) -> Option<&dyn DocumentParser> {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        let index = self.by_extension.get(&key)?;
        self.parsers.get(*index).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentValidator {
    rules: FileRules,
    parsers: Arc<DocumentParsers>,
}

impl DocumentValidator {
    pub fn new(base: BaseValidator, parsers: Arc<DocumentParsers>) -> Self {
        Self {
            rules: FileRules::new(base),
            parsers,
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(
            BaseValidator::new(store),
            Arc::new(DocumentParsers::with_defaults()),
        )
    }

    pub fn base(&self) -> &BaseValidator {
        self.rules.base()
    }

    pub async fn validate(
        &self,
        files: &[FileInput],
        field: &str,
        options: &FileOptions,
    ) -> FormResult<bool> {
        if self.rules.begin(files, field, options) {
            for file in files {
                self.check_file(file, field, options).await;
            }
        }
        Ok(self.base().is_field_valid(field))
    }

    async fn check_file(&self, file: &FileInput, field: &str, options: &FileOptions) -> bool {
        if !self.rules.check_extension(file, field, options)
            || !self.rules.check_size(file, field, options)
        {
            return false;
        }
        let Some(extension) = file.extension() else {
            return false;
        };

        if let Some(kind) = DocumentKind::from_extension(&extension) {
            let head = match file.read_head(SNIFF_LEN).await {
                Ok(head) => head,
                Err(err) => {
                    tracing::warn!(file = %file.name, error = %err, "could not read document");
                    return self.rules.fail(file, field, "could not be read.");
                }
            };
            if !kind.matches(&head) {
                return self.rules.fail(
                    file,
                    field,
                    &format!("does not look like a .{extension} file."),
                );
            }
        }

        let Some(parser) = self.parsers.for_extension(&extension) else {
            return true;
        };
        let parsed = match file.read_all().await {
            Ok(data) => parser.parse(&data),
            Err(err) => Err(err),
        };
        if let Err(err) = parsed {
            tracing::debug!(file = %file.name, parser = parser.name(), error = %err, "document rejected");
            return self.rules.fail(file, field, "appears to be damaged and could not be opened.");
        }
        true
    }
}
