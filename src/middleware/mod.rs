/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::session (Identity 付与 + challenge), http (transport 横断処理)
 */
pub mod auth;
pub mod http;
