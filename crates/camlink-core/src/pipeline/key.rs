//! Canonical request keys: dedup signature and batching group key.

use reqwest::Method;
use url::{Position, Url};

/// Dedup key: method + url + serialized body. Two calls with the same key
/// issued before either settles share one transport call.
pub(super) fn canonical_key(method: &Method, url: &str, body: Option<&serde_json::Value>) -> String {
    match body {
        Some(b) => format!("{} {} {}", method, url, b),
        None => format!("{} {}", method, url),
    }
}

/// Batch group key: method + path-without-query, so variants of the same
/// endpoint collect into one group.
pub(super) fn group_key(method: &Method, url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed[..Position::AfterPath].to_string(),
        // Not an absolute URL; strip the query by hand.
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    };
    format!("{} {}", method, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_distinguishes_keys() {
        let a = canonical_key(&Method::POST, "http://cam/api/v1/shutter", Some(&json!({"af": true})));
        let b = canonical_key(&Method::POST, "http://cam/api/v1/shutter", Some(&json!({"af": false})));
        assert_ne!(a, b);
    }

    #[test]
    fn method_distinguishes_keys() {
        let a = canonical_key(&Method::GET, "http://cam/api/v1/files", None);
        let b = canonical_key(&Method::DELETE, "http://cam/api/v1/files", None);
        assert_ne!(a, b);
    }

    #[test]
    fn group_key_drops_query() {
        let a = group_key(&Method::GET, "http://cam/api/v1/files?page=1");
        let b = group_key(&Method::GET, "http://cam/api/v1/files?page=2");
        assert_eq!(a, b);
        assert!(a.ends_with("/api/v1/files"));
    }

    #[test]
    fn group_key_handles_relative_paths() {
        let a = group_key(&Method::GET, "/api/v1/files?x=1");
        assert_eq!(a, "GET /api/v1/files");
    }
}
