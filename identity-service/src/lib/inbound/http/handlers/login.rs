use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::credential::errors::CredentialError;
use crate::domain::credential::ports::CredentialServicePort;
use crate::domain::credential::ports::CredentialStore;
use crate::inbound::http::router::AppState;

pub async fn login<CS: CredentialStore>(
    State(state): State<AppState<CS>>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let token = state
        .credential_service
        .login(&body.username, &body.password)
        .await
        .map_err(|e| match e {
            CredentialError::UserNotFound(_) if state.unify_login_errors => {
                ApiError::from(CredentialError::InvalidCredentials)
            }
            _ => ApiError::from(e),
        })?;

    Ok(ApiSuccess::new(StatusCode::OK, LoginResponseData { token }))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub token: String,
}
