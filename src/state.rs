/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - authenticator: 起動時に一度だけ構築し、全リクエストで共有
 *   - shutdown: プロセス終了時に in-flight の session lookup を打ち切る
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::services::auth::Authenticator;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<dyn Authenticator>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(authenticator: Arc<dyn Authenticator>, shutdown: CancellationToken) -> Self {
        Self {
            authenticator,
            shutdown,
        }
    }
}
