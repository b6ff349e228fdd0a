use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) detail: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PasswordResetRequest {
    #[validate(email(message = "invalid email address"))]
    pub(crate) email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordResetConfirm {
    pub(crate) token: String,
    #[serde(alias = "newPassword")]
    pub(crate) new_password: String,
}
