/*
 * Responsibility
 * - GET /me の response DTO
 * - session token 自体は返さない (表示名のみ)
 */
use serde::Serialize;

use crate::services::auth::SessionPrincipal;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(rename = "userFullName")]
    pub user_full_name: String,
}

impl From<&SessionPrincipal> for MeResponse {
    fn from(p: &SessionPrincipal) -> Self {
        Self {
            user_full_name: p.user_full_name().to_string(),
        }
    }
}
