//! URL validation
//!
//! Rejects whitespace, angle brackets and `mailto:` outright, runs the text
//! rules, then decomposes the value into protocol, host, port, query and
//! hash. After the decomposition every rule runs independently; only the
//! host lists wait on the FQDN scan of the hostname.

use ::url::{Host, Url};
use serde::{Deserialize, Serialize};

use crate::base::BaseValidator;
use crate::fqdn::{FqdnOptions, fqdn_violation, host_matches};
use crate::store::ErrorStore;
use crate::text::{TextOptions, TextValidator};
use crate::value::FieldValue;
use crate::FormResult;

/// Longest URL most browsers accept
pub const DEFAULT_URL_MAX_LENGTH: usize = 2083;

/// URL options: text rules, host grammar and structural policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UrlOptions {
    #[serde(flatten)]
    pub text: TextOptions,
    #[serde(flatten)]
    pub fqdn: FqdnOptions,
    /// Allowed protocols, lowercase
    pub protocols: Vec<String>,
    pub require_protocol: bool,
    pub require_valid_protocol: bool,
    pub require_host: bool,
    pub require_port: bool,
    pub allow_protocol_relative_urls: bool,
    pub allow_fragments: bool,
    pub allow_query_components: bool,
    pub disallow_auth: bool,
    pub allow_localhost: bool,
    pub allow_ip_address: bool,
    pub host_whitelist: Vec<String>,
    pub host_blacklist: Vec<String>,
}

impl UrlOptions {
    pub fn defaults() -> Self {
        Self {
            text: TextOptions {
                max_length: Some(DEFAULT_URL_MAX_LENGTH),
                ..Default::default()
            },
            fqdn: FqdnOptions::defaults(),
            protocols: vec!["http".into(), "https".into(), "ftp".into()],
            require_valid_protocol: true,
            require_host: true,
            allow_fragments: true,
            allow_query_components: true,
            allow_ip_address: true,
            ..Default::default()
        }
    }
}

/// Components of a parsed URL
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts {
    /// Lowercase scheme as written; `None` when the value had none
    pub protocol: Option<String>,
    /// Value started with `//`
    pub protocol_relative: bool,
    pub username: String,
    pub password: Option<String>,
    pub hostname: String,
    pub is_ip: bool,
    pub port: Option<u16>,
    /// A port was written out, even if it is the scheme default
    pub explicit_port: bool,
    pub path: String,
    /// Query without the leading `?`
    pub search: Option<String>,
    /// Fragment without the leading `#`
    pub hash: Option<String>,
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn authority_has_port(authority: &str) -> bool {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, rest)| rest);
    match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .is_some_and(|(_, rest)| rest.starts_with(':')),
        None => host_port.contains(':'),
    }
}

/// Split `raw` into its components.
///
/// Scheme-less and protocol-relative values are parsed as if `http` had
/// been written, but `protocol` stays `None` for them.
pub fn parse_url(raw: &str) -> Result<UrlParts, &'static str> {
    let (protocol, protocol_relative, normalized, rest) = if let Some(rest) = raw.strip_prefix("//") {
        (None, true, format!("http://{rest}"), rest)
    } else if let Some((scheme, rest)) = raw.split_once("://").filter(|(s, _)| is_scheme(s)) {
        (Some(scheme.to_ascii_lowercase()), false, raw.to_string(), rest)
    } else {
        (None, false, format!("http://{raw}"), raw)
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let parsed = Url::parse(&normalized).map_err(|_| "Please enter a valid URL.")?;

    let is_ip = matches!(parsed.host(), Some(Host::Ipv4(_) | Host::Ipv6(_)));
    let hostname = parsed
        .host_str()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let explicit_port = authority_has_port(authority);

    Ok(UrlParts {
        protocol,
        protocol_relative,
        username: parsed.username().to_string(),
        password: parsed.password().map(str::to_string),
        hostname,
        is_ip,
        port: if explicit_port {
            parsed.port_or_known_default()
        } else {
            parsed.port()
        },
        explicit_port,
        path: parsed.path().to_string(),
        search: parsed.query().map(str::to_string),
        hash: parsed.fragment().map(str::to_string),
    })
}

/// URL validator
#[derive(Debug, Clone)]
pub struct UrlValidator {
    base: BaseValidator,
    text: TextValidator,
}

impl UrlValidator {
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
        options: &UrlOptions,
    ) -> FormResult<bool> {
        self.base.begin(field);
        self.check(&value.as_raw(), field, options)?;
        Ok(self.base.is_field_valid(field))
    }

    /// Run the URL rules without clearing first
    pub fn check(&self, raw: &str, field: &str, options: &UrlOptions) -> FormResult<bool> {
        if raw.is_empty() {
            return self.text.check(raw, field, &options.text);
        }
        if raw.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
            return Ok(self.base.fail(field, "URLs cannot contain spaces or angle brackets."));
        }
        if raw.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:")) {
            return Ok(self.base.fail(field, "Email links are not accepted as URLs."));
        }
        if !self.text.check(raw, field, &options.text)? {
            return Ok(false);
        }

        let parts = match parse_url(raw) {
            Ok(parts) => parts,
            Err(message) => return Ok(self.base.fail(field, message)),
        };

        match &parts.protocol {
            Some(protocol) => {
                if options.require_valid_protocol && !options.protocols.contains(protocol) {
                    self.base
                        .fail(field, format!("The '{protocol}' protocol is not allowed."));
                }
            }
            None if parts.protocol_relative => {
                if !options.allow_protocol_relative_urls {
                    self.base.fail(field, "Protocol-relative URLs are not allowed.");
                }
            }
            None => {
                if options.require_protocol {
                    self.base.fail(field, "Please include a protocol such as https://.");
                }
            }
        }

        let mut host_ok = false;
        if parts.hostname.is_empty() {
            if options.require_host {
                self.base.fail(field, "Please include a host name.");
            }
        } else if parts.is_ip {
            if options.allow_ip_address {
                host_ok = true;
            } else {
                self.base.fail(field, "IP addresses are not allowed.");
            }
        } else if parts.hostname == "localhost" {
            if options.allow_localhost {
                host_ok = true;
            } else {
                self.base.fail(field, "Localhost URLs are not allowed.");
            }
        } else {
            match fqdn_violation(&parts.hostname, &options.fqdn) {
                Some(message) => {
                    self.base.fail(field, message);
                }
                None => host_ok = true,
            }
        }

        if host_ok {
            if host_matches(&parts.hostname, &options.host_blacklist)? {
                self.base
                    .fail(field, format!("Links to '{}' are not allowed.", parts.hostname));
            }
            if !options.host_whitelist.is_empty()
                && !host_matches(&parts.hostname, &options.host_whitelist)?
            {
                self.base
                    .fail(field, format!("Links to '{}' are not allowed.", parts.hostname));
            }
        }

        if !options.allow_query_components && parts.search.is_some() {
            self.base.fail(field, "Query parameters are not allowed.");
        }
        if !options.allow_fragments && parts.hash.is_some() {
            self.base.fail(field, "URL fragments are not allowed.");
        }
        if options.require_port && !parts.explicit_port {
            self.base.fail(field, "Please include a port number.");
        }
        if options.disallow_auth && (!parts.username.is_empty() || parts.password.is_some()) {
            self.base.fail(field, "URLs cannot contain credentials.");
        }

        Ok(self.base.is_field_valid(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: &str, options: &UrlOptions) -> (bool, Vec<String>) {
        let v = UrlValidator::with_store(ErrorStore::new());
        let valid = v.validate(&value.into(), "site", options).unwrap();
        (valid, v.base().field_errors("site"))
    }

    #[test]
    fn test_parse_components() {
        let parts = parse_url("https://user:pw@Example.com:8443/a/b?x=1#top").unwrap();
        assert_eq!(parts.protocol.as_deref(), Some("https"));
        assert_eq!(parts.hostname, "example.com");
        assert_eq!(parts.port, Some(8443));
        assert!(parts.explicit_port);
        assert_eq!(parts.path, "/a/b");
        assert_eq!(parts.search.as_deref(), Some("x=1"));
        assert_eq!(parts.hash.as_deref(), Some("top"));
        assert_eq!(parts.username, "user");

        let bare = parse_url("example.com/path").unwrap();
        assert_eq!(bare.protocol, None);
        assert!(!bare.explicit_port);

        let default_port = parse_url("http://example.com:80/").unwrap();
        assert!(default_port.explicit_port);
        assert_eq!(default_port.port, Some(80));
    }

    #[test]
    fn test_basic_urls() {
        let defaults = UrlOptions::defaults();
        assert!(check("https://example.com", &defaults).0);
        assert!(check("example.com/path?q=1", &defaults).0);
        assert!(!check("https://exa mple.com", &defaults).0);
        assert!(!check("mailto:john@example.com", &defaults).0);
        assert!(!check("gopher://example.com", &defaults).0);
        assert!(!check("http://localhost:3000", &defaults).0);
    }

    #[test]
    fn test_independent_rules_accumulate() {
        let strict = UrlOptions {
            allow_query_components: false,
            allow_fragments: false,
            require_port: true,
            disallow_auth: true,
            ..UrlOptions::defaults()
        };
        let (valid, errors) = check("https://u:p@example.com/?q=1#f", &strict);
        assert!(!valid);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_protocol_rules() {
        let required = UrlOptions {
            require_protocol: true,
            ..UrlOptions::defaults()
        };
        assert!(!check("example.com", &required).0);
        assert!(!check("//example.com", &UrlOptions::defaults()).0);

        let relative = UrlOptions {
            allow_protocol_relative_urls: true,
            ..UrlOptions::defaults()
        };
        assert!(check("//example.com", &relative).0);
    }

    #[test]
    fn test_hosts() {
        let local = UrlOptions {
            allow_localhost: true,
            ..UrlOptions::defaults()
        };
        assert!(check("http://localhost:3000", &local).0);

        assert!(check("http://192.168.0.1/", &UrlOptions::defaults()).0);
        let no_ip = UrlOptions {
            allow_ip_address: false,
            ..UrlOptions::defaults()
        };
        assert!(!check("http://192.168.0.1/", &no_ip).0);

        let blocked = UrlOptions {
            host_blacklist: vec!["bad.com".into()],
            ..UrlOptions::defaults()
        };
        let (valid, errors) = check("https://bad.com/page", &blocked);
        assert!(!valid);
        assert_eq!(errors, vec!["Links to 'bad.com' are not allowed."]);
    }
}
