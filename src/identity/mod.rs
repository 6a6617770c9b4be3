//! Identity handling: the verified principal, the per-request security
//! context, and the cookie firewall that ties them together.
//! Keep the public surface thin and split implementation across sub-modules.

mod context;
mod events;
mod firewall;
mod principal;

pub use context::SecurityContext;
pub use events::{AuthLog, EventSink, LoginEvent, TracingLog};
pub use firewall::{Firewall, Outcome};
pub use principal::Principal;
