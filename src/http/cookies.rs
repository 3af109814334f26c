//! Cookie snapshots for request traces.
//!
//! # Responsibilities
//! - Parse the request `Cookie` header and response `Set-Cookie` headers
//! - Verify signed cookies (`value.signature`) against the cookie secret
//!
//! # Design Decisions
//! - Read only: issuing cookies is the application's concern
//! - The signature is unpadded base64 of HMAC-SHA256 over the value
//! - A cookie that fails verification maps to `None`, never an error

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie name to value, ordered for stable trace output.
pub type CookieMap = BTreeMap<String, String>;

/// Cookies sent by the client.
pub fn parse_cookie_header(headers: &HeaderMap) -> CookieMap {
    let mut cookies = CookieMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some((name, val)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies.insert(name.to_string(), val.trim().to_string());
                }
            }
        }
    }
    cookies
}

/// Cookies set by the response (name and value only; attributes dropped).
pub fn parse_set_cookies(headers: &HeaderMap) -> CookieMap {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| {
            let pair = v.split(';').next()?;
            let (name, val) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), val.trim().to_string()))
        })
        .collect()
}

/// Signs and verifies cookie values with a shared secret.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    pub fn new(secret: &str) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret.as_bytes())?,
        })
    }

    fn signature(&self, value: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        mac
    }

    /// `value.signature`
    pub fn sign(&self, value: &str) -> String {
        let tag = self.signature(value).finalize().into_bytes();
        format!("{}.{}", value, STANDARD_NO_PAD.encode(tag))
    }

    /// The original value if `raw` carries a valid signature.
    pub fn unsign(&self, raw: &str) -> Option<String> {
        let (value, signature) = raw.rsplit_once('.')?;
        let tag = STANDARD_NO_PAD.decode(signature).ok()?;
        self.signature(value).verify_slice(&tag).ok()?;
        Some(value.to_string())
    }

    /// Unsign every cookie; failures map to `None`.
    pub fn unsign_all(&self, cookies: &CookieMap) -> BTreeMap<String, Option<String>> {
        cookies
            .iter()
            .map(|(name, raw)| (name.clone(), self.unsign(raw)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; b = two ;junk; =x"));
        let cookies = parse_cookie_header(&headers);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "two");
    }

    #[test]
    fn test_parse_set_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("sid=abc; Path=/; HttpOnly"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark"));
        let cookies = parse_set_cookies(&headers);
        assert_eq!(cookies["sid"], "abc");
        assert_eq!(cookies["theme"], "dark");
    }

    #[test]
    fn test_sign_unsign() {
        let signer = CookieSigner::new("s3cret").unwrap();
        let signed = signer.sign("user.42");
        assert!(signed.starts_with("user.42."));
        assert_eq!(signer.unsign(&signed).as_deref(), Some("user.42"));
    }

    #[test]
    fn test_tampered_cookie_rejected() {
        let signer = CookieSigner::new("s3cret").unwrap();
        let signed = signer.sign("admin");
        let tampered = signed.replacen("admin", "root", 1);
        assert_eq!(signer.unsign(&tampered), None);
        assert_eq!(signer.unsign("plain"), None);

        let other = CookieSigner::new("different").unwrap();
        assert_eq!(other.unsign(&signed), None);
    }

    #[test]
    fn test_unsign_all() {
        let signer = CookieSigner::new("k").unwrap();
        let mut cookies = CookieMap::new();
        cookies.insert("good".into(), signer.sign("v"));
        cookies.insert("bad".into(), "v.nope".into());
        let unsigned = signer.unsign_all(&cookies);
        assert_eq!(unsigned["good"].as_deref(), Some("v"));
        assert_eq!(unsigned["bad"], None);
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = CookieSigner::new("top-secret").unwrap();
        assert!(!format!("{:?}", signer).contains("top-secret"));
    }
}
