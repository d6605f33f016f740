/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - session middleware は全 route に掛ける (Identity は常に付与される)
 * - 認証必須かどうかは handler の extractor (RequireSession) で決める
 */
use axum::{Router, routing::get};

use crate::middleware::auth::session;
use crate::state::AppState;

use crate::api::v1::handlers::{health::health, me::me};

pub fn routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/me", get(me));

    session::apply(router, state)
}
