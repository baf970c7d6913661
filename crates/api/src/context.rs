use stockrec_core::UserId;
use stockrec_infra::CallerIdentity;

/// Caller context for a request (identity + role asserted by the gateway).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user_id: UserId,
    role: String,
}

impl CallerContext {
    pub fn new(user_id: UserId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity::new(self.user_id, self.role.clone())
    }
}
