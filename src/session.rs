use crate::auth::Principal;

/// Single interactive session held by the sidecar. Created on successful
/// login, cleared on logout. Handlers read the caller's role and account from
/// here and never from request params.
#[derive(Default)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn start(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn current(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn end(&mut self) {
        self.principal = None;
    }
}
