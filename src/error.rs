//! Unified authentication error model.
//! Verification failures are ordinary, request-scoped outcomes and carry a
//! human-readable message; `Internal` is the channel for everything that is
//! *not* an authentication failure (store I/O, misconfiguration) and is never
//! absorbed by the firewall.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthnError {
    /// The cookie value was present but could not be decoded into
    /// `username|expiration|token|hmac`.
    #[error("malformed login cookie: {0}")]
    Malformed(&'static str),

    /// The cookie's expiration timestamp is in the past.
    #[error("expired login cookie (expired at {expired_at}, now {now})")]
    Expired { expired_at: i64, now: i64 },

    /// The cookie names a user the store does not know.
    #[error("unknown user \"{0}\"")]
    UnknownUser(String),

    /// The recomputed signature does not match the presented one.
    #[error("login cookie signature mismatch for user \"{0}\"")]
    BadSignature(String),

    /// Not an authentication failure: a fault in a collaborator (user store,
    /// configuration). Propagates out of the firewall untouched.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AuthnResult<T> = Result<T, AuthnError>;

impl AuthnError {
    /// True for the variants the firewall absorbs (log + clear context);
    /// false for `Internal`, which the firewall re-raises.
    pub fn is_authn_failure(&self) -> bool {
        !matches!(self, AuthnError::Internal(_))
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AuthnError::Malformed(_)
            | AuthnError::Expired { .. }
            | AuthnError::UnknownUser(_)
            | AuthnError::BadSignature(_) => 401,
            AuthnError::Internal(_) => 500,
        }
    }
}
