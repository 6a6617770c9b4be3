//! Observer hooks for the firewall: interactive-login notifications and the
//! informational log channel. Both are optional collaborators; when absent
//! the corresponding step is skipped with no other behavioral change.

use axum::http::request::Parts;

use super::Principal;

/// Marks that a user was authenticated as part of handling the current
/// request (as opposed to, e.g., a long-lived session resume).
pub struct LoginEvent<'a> {
    pub request: &'a Parts,
    pub principal: &'a Principal,
}

/// Receives interactive-login notifications. Dispatch is synchronous and
/// part of request handling; the firewall consults no response from the sink.
pub trait EventSink: Send + Sync {
    fn interactive_login(&self, event: &LoginEvent<'_>);
}

impl<F> EventSink for F
where
    F: Fn(&LoginEvent<'_>) + Send + Sync,
{
    fn interactive_login(&self, event: &LoginEvent<'_>) {
        self(event)
    }
}

/// Best-effort informational log channel.
pub trait AuthLog: Send + Sync {
    fn info(&self, message: &str);
}

/// The production log hook: forwards to `tracing` under the `wordgate`
/// target. Whether anything is emitted is the host subscriber's business.
pub struct TracingLog;

impl AuthLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "wordgate", "{message}");
    }
}
