//! Password validation and strength scoring
//!
//! Text rules run first. Each enabled character class is then checked on
//! its own, with its own regex, so classes can be switched off or swapped
//! individually. Scoring is reported on the event channel and never marks
//! the field invalid.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::base::{BaseValidator, compile_pattern};
use crate::events::{PasswordScore, ValidationEvent, WordAnalysis};
use crate::store::ErrorStore;
use crate::text::{TextOptions, TextValidator};
use crate::value::FieldValue;
use crate::FormResult;

pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

const UPPER_PATTERN: &str = r"\p{Lu}";
const LOWER_PATTERN: &str = r"\p{Ll}";
const NUMBER_PATTERN: &str = r"\p{Nd}";
const SYMBOL_PATTERN: &str = r#"[-!$%^&*()_+|~=`{}\[\]:";'<>?,./]"#;
const PUNCTUATION_PATTERN: &str = r#"[.,;:!?'"-]"#;
const PUNCTUATION_CHARS: &str = ".,;:!?'\"-";

/// One character class requirement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharClassRule {
    pub enabled: bool,
    /// Replaces the built-in regex for this class
    pub pattern: Option<String>,
}

impl CharClassRule {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            pattern: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordOptions {
    #[serde(flatten)]
    pub text: TextOptions,
    pub upper: CharClassRule,
    pub lower: CharClassRule,
    pub number: CharClassRule,
    pub symbol: CharClassRule,
    pub punctuation: CharClassRule,
    pub enable_scoring: bool,
}

impl PasswordOptions {
    /// At least 8 characters with an uppercase letter, a lowercase letter,
    /// a digit and a symbol
    pub fn defaults() -> Self {
        Self {
            text: TextOptions {
                min_length: Some(DEFAULT_MIN_PASSWORD_LENGTH),
                ..Default::default()
            },
            upper: CharClassRule::enabled(),
            lower: CharClassRule::enabled(),
            number: CharClassRule::enabled(),
            symbol: CharClassRule::enabled(),
            punctuation: CharClassRule::default(),
            enable_scoring: false,
        }
    }
}

/// Break a password down by character class
pub fn analyze_word(word: &str) -> WordAnalysis {
    let mut analysis = WordAnalysis::default();
    let mut seen = HashSet::new();
    for c in word.chars() {
        analysis.length += 1;
        seen.insert(c);
        if c.is_uppercase() {
            analysis.uppercase += 1;
        } else if c.is_lowercase() {
            analysis.lowercase += 1;
        } else if c.is_numeric() {
            analysis.numbers += 1;
        } else if PUNCTUATION_CHARS.contains(c) {
            analysis.punctuation += 1;
        } else if !c.is_whitespace() {
            analysis.symbols += 1;
        }
    }
    analysis.unique_chars = seen.len();
    analysis.repeated_chars = analysis.length - analysis.unique_chars;
    analysis
}

/// Composite 0..=100 score: length, variety, and a bonus per class present
pub fn score_word(analysis: &WordAnalysis) -> u32 {
    let classes = [
        analysis.uppercase,
        analysis.lowercase,
        analysis.numbers,
        analysis.symbols,
        analysis.punctuation,
    ]
    .iter()
    .filter(|count| **count > 0)
    .count();

    let score = 4 * analysis.length as i64 + 2 * analysis.unique_chars as i64
        - analysis.repeated_chars as i64
        + 10 * classes as i64;
    score.clamp(0, 100) as u32
}

#[derive(Debug, Clone)]
pub struct PasswordValidator {
    base: BaseValidator,
    text: TextValidator,
}

impl PasswordValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self {
            text: TextValidator::new(base.clone()),
            base,
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store))
    }

    pub fn base(&self) -> &BaseValidator {
        &self.base
    }

    pub fn validate(
        &self,
        value: &FieldValue,
        field: &str,
        options: &PasswordOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        let raw = value.as_raw();
        self.check(&raw, field, options)?;
        if options.enable_scoring && !raw.is_empty() {
            let analysis = analyze_word(&raw);
            self.base.emit(ValidationEvent::PasswordScore(PasswordScore {
                score: score_word(&analysis),
                analysis,
                input: field.to_string(),
            }));
        }
        Ok(self.base.is_field_valid(field))
    }

    pub fn check(&self, raw: &str, field: &str, options: &PasswordOptions) -> FormResult<bool> {
        if !self.text.check(raw, field, &options.text)? || raw.is_empty() {
            return Ok(self.base.is_field_valid(field));
        }

        let classes = [
            (&options.upper, UPPER_PATTERN, "an uppercase letter"),
            (&options.lower, LOWER_PATTERN, "a lowercase letter"),
            (&options.number, NUMBER_PATTERN, "a number"),
            (&options.symbol, SYMBOL_PATTERN, "a symbol"),
            (&options.punctuation, PUNCTUATION_PATTERN, "a punctuation mark"),
        ];

        let mut valid = true;
        for (rule, default_pattern, label) in classes {
            if !rule.enabled {
                continue;
            }
            let regex = compile_pattern(rule.pattern.as_deref().unwrap_or(default_pattern))?;
            if !regex.is_match(raw) {
                valid = self
                    .base
                    .fail(field, format!("Password must contain at least {label}."));
            }
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password() {
        let v = PasswordValidator::with_store(ErrorStore::new());
        assert!(v.validate(&"Str0ng!pass".into(), "pw", &PasswordOptions::defaults()).unwrap());
    }

    #[test]
    fn test_each_missing_class_reported() {
        let v = PasswordValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&"alllowercase".into(), "pw", &PasswordOptions::defaults()).unwrap());
        assert_eq!(
            v.base().field_errors("pw"),
            vec![
                "Password must contain at least an uppercase letter.",
                "Password must contain at least a number.",
                "Password must contain at least a symbol.",
            ]
        );
    }

    #[test]
    fn test_default_symbol_class() {
        let v = PasswordValidator::with_store(ErrorStore::new());
        let defaults = PasswordOptions::defaults();
        for password in ["Passw0rd@", "Passw0rd#", "Passw0rd\\"] {
            assert!(!v.validate(&password.into(), "pw", &defaults).unwrap(), "{password}");
            assert_eq!(
                v.base().field_errors("pw"),
                vec!["Password must contain at least a symbol."]
            );
        }
        for password in ["Passw0rd!", "Passw0rd`", "Passw0rd]", "Passw0rd/"] {
            assert!(v.validate(&password.into(), "pw", &defaults).unwrap(), "{password}");
        }
    }

    #[test]
    fn test_short_password_stops_at_length() {
        let v = PasswordValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&"Ab1!".into(), "pw", &PasswordOptions::defaults()).unwrap());
        assert_eq!(v.base().field_errors("pw").len(), 1);
    }

    #[test]
    fn test_disabled_and_custom_classes() {
        let v = PasswordValidator::with_store(ErrorStore::new());
        let options = PasswordOptions {
            symbol: CharClassRule::default(),
            number: CharClassRule {
                enabled: true,
                pattern: Some(r"\d.*\d".into()),
            },
            ..PasswordOptions::defaults()
        };
        assert!(v.validate(&"Password12".into(), "pw", &options).unwrap());
        assert!(!v.validate(&"Password1".into(), "pw", &options).unwrap());
    }

    #[test]
    fn test_scoring_event() {
        let (sender, receiver) = smol::channel::unbounded();
        let base = BaseValidator::new(ErrorStore::new()).with_events(sender);
        let v = PasswordValidator::new(base);
        let options = PasswordOptions {
            enable_scoring: true,
            ..PasswordOptions::defaults()
        };
        v.validate(&"weak".into(), "pw", &options).unwrap();

        let Ok(ValidationEvent::PasswordScore(score)) = receiver.try_recv() else {
            panic!("expected a score event");
        };
        assert_eq!(score.input, "pw");
        assert_eq!(score.analysis.length, 4);
        assert_eq!(score.analysis.lowercase, 4);
        // 4*4 + 2*4 - 0 + 10
        assert_eq!(score.score, 34);
        assert!(!v.base().is_field_valid("pw"));
    }

    #[test]
    fn test_analysis_counts_repeats() {
        let analysis = analyze_word("aaB1-");
        assert_eq!(analysis.unique_chars, 4);
        assert_eq!(analysis.repeated_chars, 1);
        assert_eq!(analysis.punctuation, 1);
        assert_eq!(score_word(&analysis), 67);
    }
}
