/*!
 * Identity extractors
 *
 * Responsibility:
 * - session middleware が extensions に入れた Identity を handler に提供する
 * - 型定義は services::auth::identity、HTTP / axum 依存は core に閉じ込める
 *
 * Public API:
 * - CurrentIdentity (Anonymous も受け取る)
 * - RequireSession (Anonymous は 401)
 */

mod core;

pub use self::core::{CurrentIdentity, RequireSession};
