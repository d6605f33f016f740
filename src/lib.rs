//! Cookie session authentication for axum services.
//!
//! A request's `X-Session-Token` cookie is resolved against the same-origin
//! session service (`GET /session/{token}`); the resulting `Identity` is
//! attached to the request, and denied requests may be redirected to a login
//! page on challenge.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
