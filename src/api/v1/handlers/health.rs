/*
 * Responsibility
 * - GET /health (疎通用)
 * - Identity を要求しないので Anonymous でも 200
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
