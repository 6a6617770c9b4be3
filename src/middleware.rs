//! axum wiring for the firewall.
//!
//! The middleware runs the firewall once per request at the pre-response
//! stage and stores the resulting [`SecurityContext`] in request extensions.
//! Refused or absent credentials do not short-circuit anything: the request
//! continues anonymously and downstream authorization decides. Only a
//! collaborator fault stops the pipeline, with a 500.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/profile", get(profile))
//!     .layer(middleware::from_fn_with_state(
//!         FirewallState { firewall: firewall.clone() },
//!         wordgate::middleware::authenticate,
//!     ));
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{extract::FromRequestParts, Json};
use serde_json::json;
use tracing::error;

use crate::identity::{Firewall, Principal, SecurityContext};

/// Shared state injected into the middleware.
#[derive(Clone)]
pub struct FirewallState {
    pub firewall: Arc<Firewall>,
}

/// Middleware entry point: authenticate, then continue the pipeline with the
/// security context attached.
pub async fn authenticate(
    State(state): State<FirewallState>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let mut ctx = SecurityContext::anonymous();
    let outcome = state.firewall.handle(&parts, &mut ctx);
    let mut req = Request::from_parts(parts, body);
    match outcome {
        Ok(_) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            error!("firewall fault: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Extractor for handlers that require an authenticated user.
///
/// Rejects with 401 when the firewall left the request anonymous (or was
/// never installed on this route).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(|ctx| ctx.principal().cloned())
            .map(CurrentUser)
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))))
    }
}
