//! Fully qualified domain name grammar
//!
//! A label-by-label scan rather than one regex, so each failing rule can
//! report its own message. The first failing rule wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::base::{BaseValidator, compile_pattern};
use crate::store::ErrorStore;
use crate::value::FieldValue;
use crate::FormResult;

static TLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[a-z\u{00a1}-\u{ffff}]{2,}|xn[a-z0-9-]{2,})$").unwrap());
static LABEL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z_\u{00a1}-\u{ffff}0-9-]+$").unwrap());
static FULL_WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{ff01}-\u{ff5e}]").unwrap());

const MAX_LABEL_LENGTH: usize = 63;

/// Domain grammar policy.
///
/// `Default` turns every knob off; [`FqdnOptions::defaults`] requires a TLD
/// and allows hyphens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FqdnOptions {
    #[serde(rename = "requireTLD")]
    pub require_tld: bool,
    pub allowed_underscores: bool,
    pub allow_trailing_dot: bool,
    pub allow_numeric_tld: bool,
    pub allow_wildcard: bool,
    pub ignore_max_length: bool,
    pub allow_hyphens: bool,
}

impl FqdnOptions {
    pub fn defaults() -> Self {
        Self {
            require_tld: true,
            allow_hyphens: true,
            ..Default::default()
        }
    }
}

/// Domain-name validator
#[derive(Debug, Clone)]
pub struct FqdnValidator {
    base: BaseValidator,
}

impl FqdnValidator {
    pub fn new(base: BaseValidator) -> Self {
        Self { base }
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
        options: &FqdnOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        let raw = value.as_raw();
        if !raw.is_empty() {
            self.check(&raw, field, options);
        }
        Ok(self.base.is_field_valid(field))
    }

    /// Scan `domain` without clearing the field first
    pub fn check(&self, domain: &str, field: &str, options: &FqdnOptions) -> bool {
        match fqdn_violation(domain, options) {
            Some(message) => self.base.fail(field, message),
            None => true,
        }
    }
}

/// True when `host` matches an entry of `list`.
///
/// Entries wrapped in slashes (`/pattern/`) are regular expressions; anything
/// else is compared case-insensitively.
pub fn host_matches(host: &str, list: &[String]) -> FormResult<bool> {
    for entry in list {
        let matched = match entry.strip_prefix('/').and_then(|e| e.strip_suffix('/')) {
            Some(pattern) if !pattern.is_empty() => compile_pattern(pattern)?.is_match(host),
            _ => entry.eq_ignore_ascii_case(host),
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

/// First rule `domain` breaks, if any
pub fn fqdn_violation(domain: &str, options: &FqdnOptions) -> Option<&'static str> {
    let mut domain = domain;
    if options.allow_trailing_dot {
        domain = domain.strip_suffix('.').unwrap_or(domain);
    }
    if options.allow_wildcard {
        domain = domain.strip_prefix("*.").unwrap_or(domain);
    }
    if domain.is_empty() {
        return Some("Please enter a domain name.");
    }

    let labels: Vec<&str> = domain.split('.').collect();

    if options.require_tld {
        if labels.len() < 2 {
            return Some("Domain name must include a top-level domain.");
        }
        let tld = labels[labels.len() - 1];
        let numeric = !tld.is_empty() && tld.chars().all(|c| c.is_ascii_digit());
        if numeric {
            if !options.allow_numeric_tld {
                return Some("Top-level domain cannot be numeric.");
            }
        } else if !TLD.is_match(tld) {
            return Some("Top-level domain is invalid.");
        }
        if tld.chars().any(char::is_whitespace) {
            return Some("Top-level domain is invalid.");
        }
    }

    for label in &labels {
        if label.is_empty() {
            return Some("Domain name contains an empty label.");
        }
        if label.chars().count() > MAX_LABEL_LENGTH && !options.ignore_max_length {
            return Some("Domain labels cannot exceed 63 characters.");
        }
        if !LABEL_CHARS.is_match(label) || FULL_WIDTH.is_match(label) {
            return Some("Domain name contains invalid characters.");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Some("Domain labels cannot start or end with a hyphen.");
        }
        let body = label.strip_prefix("xn--").unwrap_or(label);
        if !options.allow_hyphens && body.contains('-') {
            return Some("Hyphens are not allowed in domain names.");
        }
        if !options.allowed_underscores && label.contains('_') {
            return Some("Underscores are not allowed in domain names.");
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(domain: &str, options: &FqdnOptions) -> bool {
        fqdn_violation(domain, options).is_none()
    }

    #[test]
    fn test_punycode_domain() {
        assert!(ok("xn--d1acufc.xn--p1ai", &FqdnOptions::defaults()));
        assert!(ok("example.com", &FqdnOptions::defaults()));
        assert!(ok("sub.domain-name.co.uk", &FqdnOptions::defaults()));
    }

    #[test]
    fn test_hyphen_edges() {
        assert_eq!(
            fqdn_violation("-bad-.com", &FqdnOptions::defaults()),
            Some("Domain labels cannot start or end with a hyphen.")
        );
        let no_hyphens = FqdnOptions {
            allow_hyphens: false,
            ..FqdnOptions::defaults()
        };
        assert!(!ok("my-site.com", &no_hyphens));
        assert!(ok("xn--d1acufc.xn--p1ai", &no_hyphens));
    }

    #[test]
    fn test_underscores() {
        assert!(!ok("a_b.com", &FqdnOptions::defaults()));
        let allowed = FqdnOptions {
            allowed_underscores: true,
            ..FqdnOptions::defaults()
        };
        assert!(ok("a_b.com", &allowed));
    }

    #[test]
    fn test_tld_rules() {
        assert!(!ok("localhost", &FqdnOptions::defaults()));
        assert!(!ok("example.123", &FqdnOptions::defaults()));
        assert!(!ok("example.c", &FqdnOptions::defaults()));
        let numeric = FqdnOptions {
            allow_numeric_tld: true,
            ..FqdnOptions::defaults()
        };
        assert!(ok("example.123", &numeric));
        assert!(ok("localhost", &FqdnOptions::default()));
    }

    #[test]
    fn test_label_length() {
        let long = format!("{}.com", "a".repeat(64));
        assert!(!ok(&long, &FqdnOptions::defaults()));
        let ignore = FqdnOptions {
            ignore_max_length: true,
            ..FqdnOptions::defaults()
        };
        assert!(ok(&long, &ignore));
    }

    #[test]
    fn test_trailing_dot_and_wildcard() {
        assert!(!ok("example.com.", &FqdnOptions::defaults()));
        assert!(!ok("*.example.com", &FqdnOptions::defaults()));
        let lenient = FqdnOptions {
            allow_trailing_dot: true,
            allow_wildcard: true,
            ..FqdnOptions::defaults()
        };
        assert!(ok("*.example.com.", &lenient));
    }

    #[test]
    fn test_host_lists() {
        let list = vec!["Example.com".to_string(), r"/\.test$/".to_string()];
        assert!(host_matches("example.com", &list).unwrap());
        assert!(host_matches("mail.test", &list).unwrap());
        assert!(!host_matches("other.org", &list).unwrap());
    }

    #[test]
    fn test_validator_records_message() {
        let v = FqdnValidator::with_store(ErrorStore::new());
        assert!(!v.validate(&"bad..com".into(), "domain", &FqdnOptions::defaults()).unwrap());
        assert_eq!(
            v.base().field_errors("domain"),
            vec!["Domain name contains an empty label."]
        );
    }
}
