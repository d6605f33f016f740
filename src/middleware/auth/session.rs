//! session cookie 検証 → Identity を extensions に入れる
//!
//! - 全リクエストに Identity を付与する (未認証なら `Identity::Anonymous`)
//! - 拒否はここでは行わない: 認可は handler 側の extractor が判断する
//! - 下流が 401 を返した場合のみ `Authenticator::challenge` を通す

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::services::auth::InboundRequest;
use crate::state::AppState;

/// Router 全体に session 認証を掛ける。
///
/// 例：
/// ```ignore
/// let router = Router::new().route("/me", get(me));
/// let router = middleware::auth::session::apply(router, state.clone());
/// app = app.nest("/api/v1", router);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, session_middleware))
}

async fn session_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Body は Sync ではないので、await を跨いで参照するのは Parts だけにする
    let (mut parts, body) = req.into_parts();

    // 外側の layer が token を置いていればそれを使う。なければ shutdown の子
    let cancel = parts
        .extensions
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_else(|| state.shutdown.child_token());

    let identity = state
        .authenticator
        .authenticate(&InboundRequest::new(&parts.headers, &parts.uri), &cancel)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "authentication aborted"))?;

    // middleware → extractor への受け渡し
    parts.extensions.insert(identity);

    let res = next.run(Request::from_parts(parts, body)).await;

    if res.status() == StatusCode::UNAUTHORIZED {
        return Ok(state.authenticator.challenge(&original_uri, res));
    }

    Ok(res)
}
