//! # CORS Policy
//!
//! The separation endpoint is called straight from browsers, so the CORS policy is part
//! of the function contract itself rather than a server middleware concern: the same
//! headers come back whether the function is reached through `/api/v1/separate` or
//! through a raw platform invocation on `/api/v1/invoke`.
//!
//! ## Policy:
//! - Origin: `*`
//! - Methods: `POST, OPTIONS`
//! - Headers: `Content-Type, X-User-Id`
//! - Preflight cache: 86400 seconds (24 hours)

use std::collections::HashMap;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";
pub const CONTENT_TYPE: &str = "Content-Type";

pub const ANY_ORIGIN: &str = "*";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, X-User-Id";
pub const PREFLIGHT_MAX_AGE_SECS: u32 = 86_400;

/// Custom header browsers are allowed to send; the request logger records it.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Headers for a preflight (OPTIONS) reply.
///
/// Note there is no `Content-Type`: the preflight body is always empty.
pub fn preflight_headers() -> HashMap<String, String> {
    HashMap::from([
        (ALLOW_ORIGIN.to_string(), ANY_ORIGIN.to_string()),
        (ALLOW_METHODS.to_string(), ALLOWED_METHODS.to_string()),
        (ALLOW_HEADERS.to_string(), ALLOWED_HEADERS.to_string()),
        (MAX_AGE.to_string(), PREFLIGHT_MAX_AGE_SECS.to_string()),
    ])
}

/// Headers for every JSON reply (success and error alike).
pub fn json_headers() -> HashMap<String, String> {
    HashMap::from([
        (CONTENT_TYPE.to_string(), "application/json".to_string()),
        (ALLOW_ORIGIN.to_string(), ANY_ORIGIN.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_headers() {
        let headers = preflight_headers();
        assert_eq!(headers.get(ALLOW_ORIGIN).map(String::as_str), Some("*"));
        assert_eq!(headers.get(ALLOW_METHODS).map(String::as_str), Some("POST, OPTIONS"));
        assert_eq!(headers.get(ALLOW_HEADERS).map(String::as_str), Some("Content-Type, X-User-Id"));
        assert_eq!(headers.get(MAX_AGE).map(String::as_str), Some("86400"));
        assert!(!headers.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_json_headers_carry_origin() {
        let headers = json_headers();
        assert_eq!(headers.get(ALLOW_ORIGIN).map(String::as_str), Some("*"));
        assert_eq!(headers.get(CONTENT_TYPE).map(String::as_str), Some("application/json"));
    }
}
