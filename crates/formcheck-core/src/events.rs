//! Side-channel notifications
//!
//! Events are informational only and never affect field validity.

use serde::Serialize;

/// Sender half validators publish on
pub type EventSender = smol::channel::Sender<ValidationEvent>;

/// Character breakdown of a password
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    pub length: usize,
    pub unique_chars: usize,
    pub repeated_chars: usize,
    pub uppercase: usize,
    pub lowercase: usize,
    pub numbers: usize,
    pub symbols: usize,
    pub punctuation: usize,
}

/// Password strength payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordScore {
    pub score: u32,
    pub analysis: WordAnalysis,
    /// Field the password was typed into
    pub input: String,
}

/// Event emitted while validating
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidationEvent {
    PasswordScore(PasswordScore),
    /// A phone number was rewritten into its normalized form
    TelNormalized { input: String, value: String },
}
