//! Request and response bodies exchanged with the todo API

use serde::{Deserialize, Serialize};
use todo_core::{AccessToken, RefreshToken, Session};

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Session,
    pub token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /refresh-token`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: RefreshToken,
}

/// Response of `POST /refresh-token`; the server may keep the old refresh token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
}

/// Error envelope carried by 401 responses: `{"message": {"code": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub code: Option<String>,
}
