//! Phone number grammar
//!
//! The tel validator delegates number grammar to a [`PhoneNumberParser`].
//! [`CallingCodeParser`] is the built-in implementation: it matches the
//! country calling code and checks the national number length for that
//! region.

use std::fmt;

/// A parsed international number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub country_code: u16,
    /// Digits after the calling code
    pub national_number: String,
    /// ISO 3166 region the number was attributed to
    pub region: &'static str,
}

impl PhoneNumber {
    /// `+<code><national>` with no separators
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national_number)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.e164())
    }
}

/// Phone number grammar capability
pub trait PhoneNumberParser: Send + Sync + fmt::Debug {
    /// Parse `input` (leading `+` included). `default_country` disambiguates
    /// calling codes shared by several regions.
    fn parse(&self, input: &str, default_country: &str) -> Option<PhoneNumber>;
}

/// (calling code, regions sharing it, national number length range)
const CALLING_CODES: &[(u16, &[&str], usize, usize)] = &[
    (1, &["US", "CA", "PR", "JM", "BS"], 10, 10),
    (7, &["RU", "KZ"], 10, 10),
    (20, &["EG"], 9, 10),
    (27, &["ZA"], 9, 9),
    (30, &["GR"], 10, 10),
    (31, &["NL"], 9, 9),
    (32, &["BE"], 8, 9),
    (33, &["FR"], 9, 9),
    (34, &["ES"], 9, 9),
    (36, &["HU"], 8, 9),
    (39, &["IT"], 6, 11),
    (40, &["RO"], 9, 9),
    (41, &["CH"], 9, 9),
    (43, &["AT"], 4, 13),
    (44, &["GB"], 9, 10),
    (45, &["DK"], 8, 8),
    (46, &["SE"], 7, 13),
    (47, &["NO"], 8, 8),
    (48, &["PL"], 9, 9),
    (49, &["DE"], 6, 13),
    (52, &["MX"], 10, 10),
    (54, &["AR"], 10, 11),
    (55, &["BR"], 10, 11),
    (61, &["AU"], 9, 9),
    (62, &["ID"], 9, 12),
    (63, &["PH"], 10, 10),
    (64, &["NZ"], 8, 10),
    (65, &["SG"], 8, 8),
    (81, &["JP"], 9, 10),
    (82, &["KR"], 9, 10),
    (86, &["CN"], 11, 11),
    (90, &["TR"], 10, 10),
    (91, &["IN"], 10, 10),
    (234, &["NG"], 8, 10),
    (351, &["PT"], 9, 9),
    (353, &["IE"], 7, 9),
    (358, &["FI"], 5, 12),
    (380, &["UA"], 9, 9),
    (420, &["CZ"], 9, 9),
    (971, &["AE"], 8, 9),
    (972, &["IL"], 8, 9),
];

/// Built-in parser backed by a calling-code table
#[derive(Debug, Clone, Copy, Default)]
pub struct CallingCodeParser;

impl CallingCodeParser {
    pub fn new() -> Self {
        Self
    }
}

impl PhoneNumberParser for CallingCodeParser {
    fn parse(&self, input: &str, default_country: &str) -> Option<PhoneNumber> {
        let rest = input.trim().strip_prefix('+')?;
        if !rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
        {
            return None;
        }
        let digits: String = rest.chars().filter(char::is_ascii_digit).collect();
        if digits.len() > 15 {
            return None;
        }

        // Calling codes are prefix-free, so the first hit is the only one
        (1..=3).filter(|len| *len < digits.len()).find_map(|len| {
            let code: u16 = digits[..len].parse().ok()?;
            let (_, regions, min, max) = CALLING_CODES.iter().find(|entry| entry.0 == code)?;
            let national = &digits[len..];
            if national.len() < *min || national.len() > *max {
                return None;
            }
            let region: &'static str = regions
                .iter()
                .find(|region| region.eq_ignore_ascii_case(default_country))
                .copied()
                .unwrap_or(regions[0]);
            Some(PhoneNumber {
                country_code: code,
                national_number: national.to_string(),
                region,
            })
        })
    }
}
