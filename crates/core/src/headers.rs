//! Per-file upload headers
//!
//! Headers are configured as JSON data, never as code. Two shapes are
//! accepted:
//!
//! - an object of header name to value, applied to every file:
//!   `{"Cache-Control": "max-age=3600"}`
//! - an array of rules, each applied to the keys its regex matches, with
//!   later rules overriding earlier ones:
//!   `[{"match": "\\.html$", "headers": {"Cache-Control": "no-cache"}}]`
//!
//! Values may contain `{key}`, which is replaced by the file's key.
//!
//! Only headers a single-object PUT can carry are accepted, so a bad name is
//! reported before anything is listed or uploaded.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::traits::HeaderMap;

const KEY_PLACEHOLDER: &str = "{key}";

/// Header names an upload can carry, lowercase
const UPLOAD_HEADERS: &[&str] = &[
    "content-type",
    "cache-control",
    "content-disposition",
    "content-encoding",
    "content-language",
    "expires",
    "x-amz-storage-class",
    "x-oss-storage-class",
    "x-amz-acl",
    "x-oss-object-acl",
];

/// Prefixes of user metadata headers
const METADATA_PREFIXES: &[&str] = &["x-amz-meta-", "x-oss-meta-"];

/// Whether `name` can be attached to an uploaded object (case-insensitive)
pub fn is_upload_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    UPLOAD_HEADERS.contains(&lower.as_str())
        || METADATA_PREFIXES
            .iter()
            .any(|prefix| lower.strip_prefix(prefix).is_some_and(|rest| !rest.is_empty()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHeaders {
    Static(BTreeMap<String, String>),
    Rules(Vec<RawRule>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "match", default)]
    pattern: Option<String>,
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct HeaderRule {
    pattern: Option<Regex>,
    headers: HeaderMap,
}

impl HeaderRule {
    fn applies_to(&self, key: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| re.is_match(key))
    }
}

/// Compiled header configuration
#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
    rules: Vec<HeaderRule>,
}

impl HeaderRules {
    /// Parse the `headers` setting; blank input means no headers
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let parsed: RawHeaders = serde_json::from_str(raw).map_err(|e| {
            Error::Configuration(format!(
                "headers must be a JSON object of strings or an array of rules: {e}"
            ))
        })?;

        let rules = match parsed {
            RawHeaders::Static(headers) => vec![HeaderRule {
                pattern: None,
                headers: validate(headers)?,
            }],
            RawHeaders::Rules(rules) => rules
                .into_iter()
                .map(|rule| {
                    let pattern = rule
                        .pattern
                        .map(|p| {
                            Regex::new(&p).map_err(|e| {
                                Error::Configuration(format!("invalid header rule {p:?}: {e}"))
                            })
                        })
                        .transpose()?;
                    Ok(HeaderRule {
                        pattern,
                        headers: validate(rule.headers)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Self { rules })
    }

    /// Headers for one file key
    pub fn headers_for(&self, key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for rule in self.rules.iter().filter(|rule| rule.applies_to(key)) {
            for (name, value) in &rule.headers {
                headers.insert(name.clone(), value.replace(KEY_PLACEHOLDER, key));
            }
        }
        headers
    }

    pub fn is_empty(&self) -> bool {
        self.rules.iter().all(|rule| rule.headers.is_empty())
    }
}

fn validate(headers: BTreeMap<String, String>) -> Result<HeaderMap> {
    for name in headers.keys() {
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
        if !valid {
            return Err(Error::Configuration(format!("invalid header name {name:?}")));
        }
        if !is_upload_header(name) {
            return Err(Error::Configuration(format!("unsupported upload header {name:?}")));
        }
    }

    for (name, value) in &headers {
        if name.eq_ignore_ascii_case("expires") && !value.contains(KEY_PLACEHOLDER) {
            jiff::fmt::rfc2822::DateTimeParser::new()
                .parse_timestamp(value)
                .map_err(|e| {
                    Error::Configuration(format!("invalid Expires header {value:?}: {e}"))
                })?;
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_means_no_headers() {
        let rules = HeaderRules::parse("  ").unwrap();
        assert!(rules.is_empty());
        assert!(rules.headers_for("index.html").is_empty());

        let rules = HeaderRules::parse("{}").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_static_headers_apply_to_every_key() {
        let rules = HeaderRules::parse(r#"{"Cache-Control": "max-age=60"}"#).unwrap();
        for key in ["a.js", "b/index.html"] {
            let headers = rules.headers_for(key);
            assert_eq!(headers.get("Cache-Control").map(String::as_str), Some("max-age=60"));
        }
    }

    #[test]
    fn test_rules_merge_in_order() {
        let rules = HeaderRules::parse(
            r#"[
                {"headers": {"Cache-Control": "max-age=31536000"}},
                {"match": "\\.html$", "headers": {"Cache-Control": "no-cache"}},
                {
                    "match": "^downloads/",
                    "headers": {"Content-Disposition": "attachment; filename=\"{key}\""}
                }
            ]"#,
        )
        .unwrap();

        let asset = rules.headers_for("app.js");
        assert_eq!(asset.get("Cache-Control").map(String::as_str), Some("max-age=31536000"));
        assert_eq!(asset.len(), 1);

        let page = rules.headers_for("index.html");
        assert_eq!(page.get("Cache-Control").map(String::as_str), Some("no-cache"));

        let download = rules.headers_for("downloads/tool.zip");
        assert_eq!(
            download.get("Content-Disposition").map(String::as_str),
            Some("attachment; filename=\"downloads/tool.zip\"")
        );
    }

    #[test]
    fn test_code_is_rejected() {
        let err = HeaderRules::parse("key => ({ 'Cache-Control': 'no-cache' })").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_non_string_values_are_rejected() {
        assert!(HeaderRules::parse(r#"{"Content-Length": 10}"#).is_err());
    }

    #[test]
    fn test_invalid_rule_pattern() {
        let err = HeaderRules::parse(r#"[{"match": "(", "headers": {}}]"#).unwrap_err();
        assert!(err.to_string().contains("invalid header rule"));
    }

    #[test]
    fn test_unsupported_header_is_rejected_at_parse() {
        let err = HeaderRules::parse(
            r#"[{"match": "\\.html$", "headers": {"X-Forwarded-For": "1.2.3.4"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("unsupported upload header"));
    }

    #[test]
    fn test_upload_header_names() {
        assert!(is_upload_header("Content-Type"));
        assert!(is_upload_header("x-oss-object-acl"));
        assert!(is_upload_header("X-Amz-Meta-Build"));
        assert!(!is_upload_header("x-amz-meta-"));
        assert!(!is_upload_header("Content-Length"));
        assert!(!is_upload_header("X-Forwarded-For"));
    }

    #[test]
    fn test_expires_must_be_http_date() {
        assert!(HeaderRules::parse(r#"{"Expires": "Wed, 21 Oct 2015 07:28:00 GMT"}"#).is_ok());
        let err = HeaderRules::parse(r#"{"Expires": "tomorrow"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid Expires header"));
    }

    #[test]
    fn test_invalid_header_name() {
        let err = HeaderRules::parse(r#"{"Bad Header": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid header name"));
    }
}
