use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::access::Principal;

/// Echo the principal the interceptor attached to this request.
pub async fn current_principal(principal: Principal) -> ApiSuccess<PrincipalResponseData> {
    ApiSuccess::new(StatusCode::OK, (&principal).into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalResponseData {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub authorities: Vec<String>,
}

impl From<&Principal> for PrincipalResponseData {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id.to_string(),
            username: principal.username.clone(),
            role: principal.role.as_str().to_string(),
            authorities: principal.authorities.clone(),
        }
    }
}
