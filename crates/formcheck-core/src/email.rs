//! Email address validation
//!
//! Accepts an optional display name (`"Name" <addr>` or `Name <addr>`),
//! runs the text rules on the bare address, then checks the local part
//! grammar, length limits, host lists and the domain. Bracketed IP literals
//! go through an IP grammar check instead of the FQDN scan.

use std::net::{Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::base::BaseValidator;
use crate::fqdn::{FqdnOptions, fqdn_violation, host_matches};
use crate::store::ErrorStore;
use crate::text::{TextOptions, TextValidator};
use crate::value::FieldValue;
use crate::FormResult;

/// Something, an `@`, then a host without whitespace
pub const DEFAULT_EMAIL_PATTERN: &str = r"(?s)^.+@[^@\s]+$";

const MAX_LOCAL_PART_BYTES: usize = 64;
const DEFAULT_DOMAIN_MAX_BYTES: usize = 254;

static ATOM_ASCII: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z\d!#$%&'*+\-/=?^_`{|}~]+$").unwrap());
static ATOM_UTF8: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z\d!#$%&'*+\-/=?^_`{|}~\u{00a0}-\u{d7ff}\u{f900}-\u{fdcf}\u{fdf0}-\u{ffef}]+$",
    )
    .unwrap()
});

/// Email options: text rules, domain grammar and address policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailOptions {
    #[serde(flatten)]
    pub text: TextOptions,
    #[serde(flatten)]
    pub fqdn: FqdnOptions,
    pub allow_display_name: bool,
    pub require_display_name: bool,
    #[serde(rename = "allowUTF8LocalPart")]
    pub allow_utf8_local_part: bool,
    pub allow_ip_domain: bool,
    /// Byte limit for the domain; `None` means 254
    pub domain_max_length: Option<usize>,
    /// Characters refused in the local part
    pub blacklisted_chars: String,
    pub host_blacklist: Vec<String>,
    pub host_whitelist: Vec<String>,
}

impl EmailOptions {
    pub fn defaults() -> Self {
        Self {
            text: TextOptions {
                pattern: Some(DEFAULT_EMAIL_PATTERN.to_string()),
                pattern_message: Some("Please enter an email address.".to_string()),
                ..Default::default()
            },
            fqdn: FqdnOptions::defaults(),
            allow_display_name: true,
            allow_utf8_local_part: true,
            ..Default::default()
        }
    }
}

/// Outcome of splitting `Name <address>`
#[derive(Debug, PartialEq, Eq)]
enum DisplayName<'a> {
    /// No angle brackets at all
    Absent,
    Present { name: &'a str, address: &'a str },
    /// Brackets present but unbalanced or misplaced
    Malformed,
}

fn split_display_name(value: &str) -> DisplayName<'_> {
    if !value.contains('<') && !value.contains('>') {
        return DisplayName::Absent;
    }
    let Some(inner) = value.strip_suffix('>') else {
        return DisplayName::Malformed;
    };
    let Some(open) = inner.rfind('<') else {
        return DisplayName::Malformed;
    };
    let address = &inner[open + 1..];
    let name = inner[..open].trim();
    if address.is_empty() || address.contains('>') {
        return DisplayName::Malformed;
    }
    DisplayName::Present { name, address }
}

fn display_name_violation(name: &str) -> Option<&'static str> {
    if name.chars().any(char::is_control) {
        return Some("Display name contains invalid characters.");
    }
    let quoted = name.len() >= 2 && name.starts_with('"') && name.ends_with('"');
    if quoted {
        let inner = &name[1..name.len() - 1];
        let mut escaped = false;
        for c in inner.chars() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return Some("Quotes inside a display name must be escaped."),
                _ => {}
            }
        }
        return None;
    }
    if name.contains(['"', '.', ';', '<', '>']) {
        return Some("Display names with special characters must be quoted.");
    }
    None
}

fn local_part_is_valid(local: &str, allow_utf8: bool) -> bool {
    if local.is_empty() {
        return false;
    }
    let printable = |c: char| (' '..='~').contains(&c) || (allow_utf8 && !c.is_ascii() && !c.is_control());

    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        let inner = &local[1..local.len() - 1];
        let mut escaped = false;
        for c in inner.chars() {
            if !printable(c) {
                return false;
            }
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return false,
                _ => {}
            }
        }
        return !escaped;
    }

    let atom = if allow_utf8 { &*ATOM_UTF8 } else { &*ATOM_ASCII };
    local.split('.').all(|part| !part.is_empty() && atom.is_match(part))
}

/// Email validator
#[derive(Debug, Clone)]
pub struct EmailValidator {
    base: BaseValidator,
    text: TextValidator,
}

impl EmailValidator {
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
        options: &EmailOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_raw(), field, options)?;
        Ok(self.base.is_field_valid(field))
    }

    /// Run the email rules without clearing first
    pub fn check(&self, raw: &str, field: &str, options: &EmailOptions) -> FormResult<bool> {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.text.check(raw, field, &options.text);
        }

        let address = if options.allow_display_name || options.require_display_name {
            match split_display_name(raw) {
                DisplayName::Present { name, address } => {
                    if name.is_empty() && options.require_display_name {
                        return Ok(self.base.fail(field, "Please include a display name."));
                    }
                    if let Some(message) = display_name_violation(name) {
                        return Ok(self.base.fail(field, message));
                    }
                    address
                }
                DisplayName::Absent if options.require_display_name => {
                    return Ok(self.base.fail(field, "Please include a display name."));
                }
                DisplayName::Absent => raw,
                DisplayName::Malformed => {
                    return Ok(self.base.fail(
                        field,
                        "Please wrap the address in matching angle brackets: Name <address>.",
                    ));
                }
            }
        } else {
            if raw.contains(['<', '>']) {
                return Ok(self.base.fail(field, "Display names are not allowed."));
            }
            raw
        };

        if !self.text.check(address, field, &options.text)? {
            return Ok(false);
        }

        let Some((local, domain)) = address.split_once('@') else {
            return Ok(self.base.fail(field, "Please include an '@' in the email address."));
        };
        let domain = domain.to_lowercase();

        if !options.fqdn.ignore_max_length {
            if local.len() > MAX_LOCAL_PART_BYTES {
                return Ok(self.base.fail(field, "The part before '@' is too long."));
            }
            let max = options.domain_max_length.unwrap_or(DEFAULT_DOMAIN_MAX_BYTES);
            if domain.len() > max {
                return Ok(self.base.fail(field, "The part after '@' is too long."));
            }
        }

        if host_matches(&domain, &options.host_blacklist)? {
            return Ok(self.base.fail(field, format!("Addresses at '{domain}' are not allowed.")));
        }
        if !options.host_whitelist.is_empty() && !host_matches(&domain, &options.host_whitelist)? {
            return Ok(self.base.fail(field, format!("Addresses at '{domain}' are not allowed.")));
        }

        if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
            if !options.allow_ip_domain {
                return Ok(self.base.fail(field, "IP address domains are not allowed."));
            }
            if !ip_literal_is_valid(literal) {
                return Ok(self.base.fail(field, "The IP address after '@' is invalid."));
            }
        } else if let Some(message) = fqdn_violation(&domain, &options.fqdn) {
            let bare_ipv4 = options.allow_ip_domain && domain.parse::<Ipv4Addr>().is_ok();
            if !bare_ipv4 {
                return Ok(self.base.fail(field, message));
            }
        }

        if !local_part_is_valid(local, options.allow_utf8_local_part) {
            return Ok(self.base.fail(field, "The part before '@' contains invalid characters."));
        }

        if let Some(blocked) = local.chars().find(|c| options.blacklisted_chars.contains(*c)) {
            return Ok(self.base.fail(
                field,
                format!("The part before '@' cannot contain '{blocked}'."),
            ));
        }

        Ok(true)
    }
}

/// `[1.2.3.4]` or `[IPv6:...]`; the tag is required for IPv6 and refused for IPv4
fn ip_literal_is_valid(literal: &str) -> bool {
    match literal.strip_prefix("ipv6:") {
        Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
        None => literal.parse::<Ipv4Addr>().is_ok(),
    }
}
