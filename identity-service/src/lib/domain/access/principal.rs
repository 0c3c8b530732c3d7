use crate::domain::credential::models::Role;
use crate::domain::credential::models::UserId;
use crate::domain::credential::models::UserRecord;

/// Authenticated identity attached to a single request.
///
/// Built by the authentication interceptor from a verified token and a fresh
/// store lookup; lives in that request's extensions and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

impl From<&UserRecord> for Principal {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            username: user.username.as_str().to_string(),
            role: user.role,
            authorities: vec![user.role.authority()],
        }
    }
}
