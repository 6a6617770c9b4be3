use super::Principal;

/// Request-scoped holder of the current principal.
///
/// One instance exists per request and only the firewall mutates it while it
/// does; downstream consumers read it (via request extensions) after the
/// firewall has run. There is no sharing across requests and therefore no
/// locking.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    /// Unconditional overwrite, no merge semantics.
    pub fn set(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn clear(&mut self) {
        self.principal = None;
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
