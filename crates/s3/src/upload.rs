//! Mapping of configured upload headers onto PutObject parameters
//!
//! Both the `x-amz-*` and the Aliyun OSS `x-oss-*` spellings are accepted for
//! metadata, storage class and ACL. A header the request cannot carry is a
//! configuration error rather than being dropped silently.

use std::collections::HashMap;

use aws_sdk_s3::operation::put_object::builders::PutObjectFluentBuilder;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use aws_smithy_types::DateTime;
use aws_smithy_types::date_time::Format;

use bs_core::{Error, HeaderMap, Result};

/// PutObject parameters derived from a header map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadHeaders {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub expires: Option<DateTime>,
    pub storage_class: Option<String>,
    pub acl: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl UploadHeaders {
    /// Interpret `headers` for the object `key`
    ///
    /// Without an explicit `Content-Type` the type is guessed from the key.
    pub fn from_map(key: &str, headers: &HeaderMap) -> Result<Self> {
        let mut parsed = Self::default();

        for (name, value) in headers {
            let lower = name.to_ascii_lowercase();
            let value = value.clone();
            match lower.as_str() {
                "content-type" => parsed.content_type = Some(value),
                "cache-control" => parsed.cache_control = Some(value),
                "content-disposition" => parsed.content_disposition = Some(value),
                "content-encoding" => parsed.content_encoding = Some(value),
                "content-language" => parsed.content_language = Some(value),
                "expires" => {
                    let date = DateTime::from_str(&value, Format::HttpDate).map_err(|e| {
                        Error::Configuration(format!("invalid Expires header {value:?}: {e}"))
                    })?;
                    parsed.expires = Some(date);
                }
                "x-amz-storage-class" | "x-oss-storage-class" => parsed.storage_class = Some(value),
                "x-amz-acl" | "x-oss-object-acl" => parsed.acl = Some(value),
                other => {
                    let meta = other
                        .strip_prefix("x-amz-meta-")
                        .or_else(|| other.strip_prefix("x-oss-meta-"))
                        .filter(|m| !m.is_empty())
                        .ok_or_else(|| {
                            Error::Configuration(format!("unsupported upload header {name:?}"))
                        })?;
                    parsed.metadata.insert(meta.to_string(), value);
                }
            }
        }

        if parsed.content_type.is_none() {
            parsed.content_type = mime_guess::from_path(key)
                .first()
                .map(|m| m.essence_str().to_string());
        }

        Ok(parsed)
    }

    /// Set the parameters on a PutObject request
    pub fn apply(self, mut request: PutObjectFluentBuilder) -> PutObjectFluentBuilder {
        if let Some(v) = self.content_type {
            request = request.content_type(v);
        }
        if let Some(v) = self.cache_control {
            request = request.cache_control(v);
        }
        if let Some(v) = self.content_disposition {
            request = request.content_disposition(v);
        }
        if let Some(v) = self.content_encoding {
            request = request.content_encoding(v);
        }
        if let Some(v) = self.content_language {
            request = request.content_language(v);
        }
        if let Some(v) = self.expires {
            request = request.expires(v);
        }
        if let Some(v) = self.storage_class {
            request = request.storage_class(StorageClass::from(v.as_str()));
        }
        if let Some(v) = self.acl {
            request = request.acl(ObjectCannedAcl::from(v.as_str()));
        }
        for (k, v) in self.metadata {
            request = request.metadata(k, v);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_content_type_guessed_from_key() {
        let parsed = UploadHeaders::from_map("index.html", &HeaderMap::new()).unwrap();
        assert_eq!(parsed.content_type.as_deref(), Some("text/html"));

        let parsed = UploadHeaders::from_map("no-extension", &HeaderMap::new()).unwrap();
        assert!(parsed.content_type.is_none());
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let map = headers(&[("Content-Type", "text/plain; charset=utf-8")]);
        let parsed = UploadHeaders::from_map("index.html", &map).unwrap();
        assert_eq!(parsed.content_type.as_deref(), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_standard_and_vendor_headers() {
        let map = headers(&[
            ("Cache-Control", "no-cache"),
            ("x-oss-meta-commit", "abc123"),
            ("X-Amz-Meta-Build", "42"),
            ("x-oss-storage-class", "IA"),
            ("x-amz-acl", "public-read"),
        ]);
        let parsed = UploadHeaders::from_map("a.js", &map).unwrap();

        assert_eq!(parsed.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(parsed.metadata.get("commit").map(String::as_str), Some("abc123"));
        assert_eq!(parsed.metadata.get("build").map(String::as_str), Some("42"));
        assert_eq!(parsed.storage_class.as_deref(), Some("IA"));
        assert_eq!(parsed.acl.as_deref(), Some("public-read"));
    }

    #[test]
    fn test_expires_must_be_http_date() {
        let ok = headers(&[("Expires", "Wed, 21 Oct 2015 07:28:00 GMT")]);
        assert!(UploadHeaders::from_map("a", &ok).unwrap().expires.is_some());

        let bad = headers(&[("Expires", "tomorrow")]);
        assert!(UploadHeaders::from_map("a", &bad).is_err());
    }

    #[test]
    fn test_accepts_every_configurable_header() {
        let names = [
            "Content-Type",
            "Cache-Control",
            "Content-Disposition",
            "Content-Encoding",
            "Content-Language",
            "x-amz-storage-class",
            "x-oss-storage-class",
            "x-amz-acl",
            "x-oss-object-acl",
            "x-oss-meta-commit",
        ];
        for name in names {
            assert!(bs_core::is_upload_header(name), "{name}");
            let map = headers(&[(name, "v")]);
            assert!(UploadHeaders::from_map("a.txt", &map).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_unsupported_header_is_rejected() {
        let map = headers(&[("X-Forwarded-For", "1.2.3.4")]);
        let err = UploadHeaders::from_map("a", &map).unwrap_err();
        assert!(err.to_string().contains("unsupported upload header"));
    }
}
