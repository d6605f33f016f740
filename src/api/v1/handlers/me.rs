/*
 * Responsibility
 * - GET /me (認証済みユーザーの表示名)
 * - Anonymous は RequireSession が 401 にする
 */
use axum::Json;

use crate::api::v1::{dto::me::MeResponse, extractors::RequireSession};

pub async fn me(RequireSession(principal): RequireSession) -> Json<MeResponse> {
    Json(MeResponse::from(&principal))
}
