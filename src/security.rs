//! Cookie signature scheme and user store boundary.
//!
//! Implements the WordPress `logged_in` cookie verification chain: derive a
//! per-cookie key with `wp_hash()` (HMAC-MD5 over the concatenated
//! `LOGGED_IN_KEY`/`LOGGED_IN_SALT` secrets), then check the presented value
//! with HMAC-SHA256 under that key. The key derivation mixes in a fragment of
//! the user's stored password hash, so a password change invalidates every
//! outstanding cookie for that user.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use hmac::{Hmac, Mac};
use md5::Md5;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::cookie::LoginCookie;
use crate::error::{AuthnError, AuthnResult};
use crate::identity::Principal;
use crate::tprintln;

type HmacMd5 = Hmac<Md5>;
type HmacSha256 = Hmac<Sha256>;

/// The `LOGGED_IN_KEY` / `LOGGED_IN_SALT` secrets from the site's
/// `wp-config.php`. Deserializable so hosts can carry them in their own
/// configuration files.
#[derive(Clone, Deserialize)]
pub struct SiteKeys {
    pub logged_in_key: String,
    pub logged_in_salt: String,
}

impl SiteKeys {
    pub fn new(logged_in_key: impl Into<String>, logged_in_salt: impl Into<String>) -> Self {
        Self { logged_in_key: logged_in_key.into(), logged_in_salt: logged_in_salt.into() }
    }

    fn secret(&self) -> Vec<u8> {
        let mut s = Vec::with_capacity(self.logged_in_key.len() + self.logged_in_salt.len());
        s.extend_from_slice(self.logged_in_key.as_bytes());
        s.extend_from_slice(self.logged_in_salt.as_bytes());
        s
    }
}

impl std::fmt::Debug for SiteKeys {
    // Secrets stay out of logs and panic messages
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteKeys").finish_non_exhaustive()
    }
}

/// `wp_hash()` for the `logged_in` scheme: HMAC-MD5 keyed by the concatenated
/// secrets, lowercase hex.
fn wp_hash(data: &str, keys: &SiteKeys) -> String {
    let mut mac = HmacMd5::new_from_slice(&keys.secret()).expect("hmac accepts any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Bytes 8..12 of the stored password hash, as WordPress's
/// `wp_generate_auth_cookie()` takes them. Short or non-ASCII-boundary hashes
/// degrade to an empty fragment rather than panicking.
fn pass_frag(password_hash: &str) -> &str {
    password_hash.get(8..12).unwrap_or("")
}

/// Compute the signature field for a cookie's signed content.
fn cookie_signature(
    username: &str,
    expiration: i64,
    token: &str,
    frag: &str,
    keys: &SiteKeys,
) -> String {
    let key = wp_hash(&format!("{username}|{frag}|{expiration}|{token}"), keys);
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{username}|{expiration}|{token}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of the presented signature.
fn verify_signature(cookie: &LoginCookie, frag: &str, keys: &SiteKeys) -> bool {
    let key = wp_hash(
        &format!("{}|{}|{}|{}", cookie.username, frag, cookie.expiration, cookie.token),
        keys,
    );
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{}|{}|{}", cookie.username, cookie.expiration, cookie.token).as_bytes());
    match hex::decode(&cookie.hmac) {
        Ok(presented) => mac.verify_slice(&presented).is_ok(),
        Err(_) => false,
    }
}

/// User record as the WordPress side knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordpressUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    /// Opaque to this crate; only bytes 8..12 participate in verification.
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Lookup boundary towards the WordPress user database.
///
/// `Ok(None)` means "no such user" and is an authentication failure upstream;
/// `Err` means the store itself failed and is never treated as one.
pub trait UserStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<WordpressUser>>;
}

/// In-memory user store for tests and small deployments.
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, WordpressUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self { users: RwLock::new(HashMap::new()) }
    }

    /// Insert or replace a user, keyed by username.
    pub fn insert(&self, user: WordpressUser) {
        self.users.write().insert(user.username.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_username(&self, username: &str) -> Result<Option<WordpressUser>> {
        Ok(self.users.read().get(username).cloned())
    }
}

/// Verifies an extracted credential and produces the principal.
pub trait Authenticator: Send + Sync {
    /// Authentication failures are the non-`Internal` [`AuthnError`]
    /// variants; store faults come back as `Internal`.
    fn authenticate(&self, raw: &str) -> AuthnResult<Principal>;
}

/// The real verifier: decode, check expiry, look the user up, recompute the
/// signature.
pub struct CookieAuthenticator {
    store: Arc<dyn UserStore>,
    keys: SiteKeys,
}

impl CookieAuthenticator {
    pub fn new(store: Arc<dyn UserStore>, keys: SiteKeys) -> Self {
        Self { store, keys }
    }
}

impl Authenticator for CookieAuthenticator {
    fn authenticate(&self, raw: &str) -> AuthnResult<Principal> {
        let cookie = LoginCookie::parse(raw)?;
        let now = Utc::now().timestamp();
        if cookie.expiration <= now {
            return Err(AuthnError::Expired { expired_at: cookie.expiration, now });
        }
        let user = self
            .store
            .find_by_username(&cookie.username)
            .map_err(AuthnError::Internal)?
            .ok_or_else(|| AuthnError::UnknownUser(cookie.username.clone()))?;
        if !verify_signature(&cookie, pass_frag(&user.password_hash), &self.keys) {
            return Err(AuthnError::BadSignature(cookie.username));
        }
        Ok(Principal::from(&user))
    }
}

impl From<&WordpressUser> for Principal {
    fn from(u: &WordpressUser) -> Self {
        Principal {
            id: u.id,
            username: u.username.clone(),
            display_name: if u.display_name.is_empty() {
                u.username.clone()
            } else {
                u.display_name.clone()
            },
            roles: u.roles.clone(),
        }
    }
}

/// Mint a signed login cookie for a user, valid for `ttl` from now.
/// The session token is 128 random bits, hex-encoded.
pub fn issue_login_cookie(user: &WordpressUser, ttl: chrono::Duration, keys: &SiteKeys) -> LoginCookie {
    let expiration = Utc::now().timestamp() + ttl.num_seconds();
    let mut buf = [0u8; 16];
    let _ = getrandom::getrandom(&mut buf);
    let token = hex::encode(buf);
    let hmac = cookie_signature(
        &user.username,
        expiration,
        &token,
        pass_frag(&user.password_hash),
        keys,
    );
    tprintln!("cookie.issue user={} exp={}", user.username, expiration);
    LoginCookie { username: user.username.clone(), expiration, token, hmac }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SiteKeys {
        SiteKeys::new("logged-in-key", "logged-in-salt")
    }

    const PHASH: &str = "$P$BVHvyGZ6.ApGqY5Wx2a9Xn0yOQ29Ap.";

    #[test]
    fn pass_frag_is_bytes_8_to_12() {
        assert_eq!(pass_frag(PHASH), "GZ6.");
        assert_eq!(pass_frag("short"), "");
    }

    #[test]
    fn wp_hash_known_vector() {
        let token = "a".repeat(64);
        let data = format!("alice|GZ6.|2000000000|{token}");
        assert_eq!(wp_hash(&data, &keys()), "bd876c5286e340fe6e3875d986241d31");
    }

    #[test]
    fn cookie_signature_known_vector() {
        let token = "a".repeat(64);
        assert_eq!(
            cookie_signature("alice", 2_000_000_000, &token, "GZ6.", &keys()),
            "903c13d24a90c400f4be4cf0b012055614ab24093c00ef54258cd1ff5afc82b8"
        );
    }

    #[test]
    fn verify_signature_accepts_own_signature_and_rejects_tampering() {
        let token = "a".repeat(64);
        let hmac = cookie_signature("alice", 2_000_000_000, &token, "GZ6.", &keys());
        let good = LoginCookie {
            username: "alice".into(),
            expiration: 2_000_000_000,
            token: token.clone(),
            hmac,
        };
        assert!(verify_signature(&good, "GZ6.", &keys()));

        let mut renamed = good.clone();
        renamed.username = "mallory".into();
        assert!(!verify_signature(&renamed, "GZ6.", &keys()));

        let mut postponed = good.clone();
        postponed.expiration += 1;
        assert!(!verify_signature(&postponed, "GZ6.", &keys()));

        let mut garbled = good.clone();
        garbled.hmac = "zz not hex".into();
        assert!(!verify_signature(&garbled, "GZ6.", &keys()));

        // Different password fragment (password changed since issue)
        assert!(!verify_signature(&good, "Ap.9", &keys()));
    }

    #[test]
    fn principal_from_user_falls_back_to_username() {
        let u = WordpressUser {
            id: 7,
            username: "alice".into(),
            display_name: String::new(),
            password_hash: PHASH.into(),
            roles: vec!["editor".into()],
        };
        let p = Principal::from(&u);
        assert_eq!(p.display_name, "alice");
        assert_eq!(p.roles, vec!["editor".to_string()]);
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let dbg = format!("{:?}", keys());
        assert!(!dbg.contains("logged-in-key"));
        assert!(!dbg.contains("logged-in-salt"));
    }
}
