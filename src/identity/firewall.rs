//! The cookie authentication firewall.
//!
//! Runs once per inbound request, before any response is produced:
//! extract the login cookie, verify it, and reconcile the result with the
//! request's [`SecurityContext`]. Each pass ends in exactly one of three
//! states: the request carried no cookie (no-op), the cookie verified
//! (context set, login event dispatched), or the cookie was refused (context
//! stays anonymous). The request itself always continues down the pipeline;
//! whether "anonymous" becomes a denial is a downstream decision.

use std::sync::Arc;

use axum::http::request::Parts;

use super::context::SecurityContext;
use super::events::{AuthLog, EventSink, LoginEvent};
use crate::cookie::CookieExtractor;
use crate::error::AuthnError;
use crate::security::Authenticator;

/// Terminal outcome of one firewall pass over a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request carried no login cookie; nothing was attempted.
    NoCookie,
    /// The cookie verified; the context now holds the principal.
    Authenticated,
    /// The cookie was present but refused; the context is anonymous.
    Refused,
}

/// Authenticates requests against a WordPress login cookie.
///
/// Assumes it is the sole authentication mechanism for the requests it
/// guards: every pass begins by dropping whatever identity an earlier
/// pipeline stage may have established.
pub struct Firewall {
    cookies: Arc<dyn CookieExtractor>,
    auth: Arc<dyn Authenticator>,
    log: Option<Arc<dyn AuthLog>>,
    events: Option<Arc<dyn EventSink>>,
}

impl Firewall {
    pub fn new(cookies: Arc<dyn CookieExtractor>, auth: Arc<dyn Authenticator>) -> Self {
        Self { cookies, auth, log: None, events: None }
    }

    pub fn with_log(mut self, log: Arc<dyn AuthLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Authenticate one request, mutating `ctx` to reflect the outcome.
    ///
    /// Authentication failures are absorbed here: they log, leave the
    /// context anonymous and return [`Outcome::Refused`]. Only collaborator
    /// faults ([`AuthnError::Internal`]) surface as `Err`, for the host's
    /// generic fault handling.
    pub fn handle(&self, request: &Parts, ctx: &mut SecurityContext) -> anyhow::Result<Outcome> {
        // Sole owner of authentication for guarded requests: identity from
        // any earlier pipeline stage must not survive this pass.
        ctx.clear();

        let Some(raw) = self.cookies.extract(request) else {
            return Ok(Outcome::NoCookie);
        };

        match self.auth.authenticate(&raw) {
            Ok(principal) => {
                if let Some(log) = &self.log {
                    log.info(&format!(
                        "WordPress user \"{}\" has been authenticated successfully",
                        principal.display_id()
                    ));
                }
                ctx.set(principal.clone());
                if let Some(events) = &self.events {
                    events.interactive_login(&LoginEvent { request, principal: &principal });
                }
                Ok(Outcome::Authenticated)
            }
            Err(AuthnError::Internal(fault)) => Err(fault),
            Err(e) => {
                if let Some(log) = &self.log {
                    log.info(&format!("WordPress authentication failed: {e}"));
                }
                ctx.clear();
                Ok(Outcome::Refused)
            }
        }
    }
}
