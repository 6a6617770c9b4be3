//! WordPress `logged_in` cookie: name derivation, value codec and request
//! extraction.
//!
//! WordPress stores its post-login credential in a cookie named
//! `wordpress_logged_in_<md5(siteurl)>` whose value is the pipe-joined,
//! percent-encoded tuple `username|expiration|token|hmac`. This module owns
//! the non-cryptographic half of that contract: finding the cookie on a
//! request and decoding/encoding its value. Signature verification lives in
//! the `security` module.

use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use md5::{Digest, Md5};

use crate::error::{AuthnError, AuthnResult};

/// Name prefix shared by every WordPress login cookie.
pub const LOGGED_IN_PREFIX: &str = "wordpress_logged_in_";

/// Derive the full cookie name for a site URL, e.g.
/// `wordpress_logged_in_4eccb99b567456ded777d1baf6bfd8b5`.
///
/// WordPress hashes the raw `siteurl` option; a trailing slash is trimmed so
/// that `https://x/` and `https://x` agree.
pub fn cookie_name_for(site_url: &str) -> String {
    let trimmed = site_url.trim_end_matches('/');
    let digest = Md5::digest(trimmed.as_bytes());
    format!("{}{}", LOGGED_IN_PREFIX, hex::encode(digest))
}

/// Decoded login cookie value. Holding one of these proves nothing: the
/// `hmac` field is whatever the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCookie {
    pub username: String,
    /// Unix timestamp (seconds) after which the cookie is no longer valid.
    pub expiration: i64,
    /// Session token minted at login time, random hex.
    pub token: String,
    /// Presented signature, lowercase hex.
    pub hmac: String,
}

impl LoginCookie {
    /// Decode a raw cookie value. The value is expected percent-encoded as
    /// browsers send it back.
    pub fn parse(raw: &str) -> AuthnResult<Self> {
        let decoded = urlencoding::decode(raw)
            .map_err(|_| AuthnError::Malformed("undecodable percent-encoding"))?;
        let fields: Vec<&str> = decoded.split('|').collect();
        if fields.len() != 4 {
            return Err(AuthnError::Malformed("expected username|expiration|token|hmac"));
        }
        if fields[0].is_empty() {
            return Err(AuthnError::Malformed("empty username"));
        }
        let expiration: i64 = fields[1]
            .parse()
            .map_err(|_| AuthnError::Malformed("non-numeric expiration"))?;
        Ok(Self {
            username: fields[0].to_string(),
            expiration,
            token: fields[2].to_string(),
            hmac: fields[3].to_string(),
        })
    }

    /// Re-encode the value for transport in a `Set-Cookie` header.
    pub fn encode(&self) -> String {
        let joined = format!("{}|{}|{}|{}", self.username, self.expiration, self.token, self.hmac);
        urlencoding::encode(&joined).into_owned()
    }

    /// Full `Set-Cookie` header value under the given cookie name.
    /// HttpOnly and Secure, matching how WordPress itself scopes the cookie.
    pub fn set_cookie(&self, name: &str) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/",
            name,
            self.encode()
        ))
        .expect("percent-encoded cookie value is valid ASCII")
    }
}

/// Pulls the raw, unverified credential off a request.
///
/// Absence is a normal return, never an error: most requests simply do not
/// carry a login cookie.
pub trait CookieExtractor: Send + Sync {
    fn extract(&self, request: &Parts) -> Option<String>;
}

/// Extractor for the `wordpress_logged_in_*` cookie of one site.
pub struct LoggedInCookie {
    name: String,
}

impl LoggedInCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Construct with the cookie name derived from the site URL.
    pub fn for_site(site_url: &str) -> Self {
        Self { name: cookie_name_for(site_url) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CookieExtractor for LoggedInCookie {
    fn extract(&self, request: &Parts) -> Option<String> {
        for value in request.headers.get_all(header::COOKIE) {
            let Ok(s) = value.to_str() else { continue };
            for part in s.split(';') {
                let p = part.trim();
                if let Some(eq) = p.find('=') {
                    let (k, v) = p.split_at(eq);
                    if k == self.name {
                        return Some(v[1..].to_string());
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(header_value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/wp-admin/")
            .header(header::COOKIE, header_value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn name_derivation_matches_wordpress() {
        assert_eq!(
            cookie_name_for("https://blog.example.com"),
            "wordpress_logged_in_4eccb99b567456ded777d1baf6bfd8b5"
        );
        // Trailing slash must not change the hash
        assert_eq!(
            cookie_name_for("https://blog.example.com/"),
            cookie_name_for("https://blog.example.com")
        );
        assert_eq!(
            cookie_name_for("http://localhost"),
            "wordpress_logged_in_86a9106ae65537651a8e456835b316ab"
        );
    }

    #[test]
    fn parse_accepts_well_formed_value() {
        let raw = "alice%7C2000000000%7Cdeadbeef%7C0123abcd";
        let c = LoginCookie::parse(raw).unwrap();
        assert_eq!(c.username, "alice");
        assert_eq!(c.expiration, 2_000_000_000);
        assert_eq!(c.token, "deadbeef");
        assert_eq!(c.hmac, "0123abcd");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(LoginCookie::parse("alice%7C123%7Cdeadbeef").is_err()); // 3 fields
        assert!(LoginCookie::parse("alice%7C123%7Ca%7Cb%7Cc").is_err()); // 5 fields
        assert!(LoginCookie::parse("alice%7Csoon%7Ca%7Cb").is_err()); // bad expiration
        assert!(LoginCookie::parse("%7C123%7Ca%7Cb").is_err()); // empty username
    }

    #[test]
    fn encode_and_parse_agree() {
        let c = LoginCookie {
            username: "alice".into(),
            expiration: 2_000_000_000,
            token: "deadbeef".into(),
            hmac: "0123abcd".into(),
        };
        assert_eq!(LoginCookie::parse(&c.encode()).unwrap(), c);
    }

    #[test]
    fn extractor_finds_named_cookie_among_others() {
        let ex = LoggedInCookie::new("wordpress_logged_in_abc");
        let parts = parts_with_cookie(
            "wp_settings=1; wordpress_logged_in_abc=alice%7C1%7Ct%7Ch; other=x",
        );
        assert_eq!(ex.extract(&parts).as_deref(), Some("alice%7C1%7Ct%7Ch"));
    }

    #[test]
    fn extractor_returns_none_when_absent() {
        let ex = LoggedInCookie::for_site("https://blog.example.com");
        let parts = parts_with_cookie("wp_settings=1; other=x");
        assert_eq!(ex.extract(&parts), None);

        let (no_cookie, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        assert_eq!(ex.extract(&no_cookie), None);
    }

    #[test]
    fn extractor_requires_exact_name_match() {
        let ex = LoggedInCookie::new("wordpress_logged_in_abc");
        let parts = parts_with_cookie("wordpress_logged_in_abcdef=evil");
        assert_eq!(ex.extract(&parts), None);
    }
}
