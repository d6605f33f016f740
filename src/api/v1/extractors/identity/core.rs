use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{Identity, SessionPrincipal};

/// Handler で Identity をそのまま受け取るための extractor
/// middleware が Identity を request.extensions() に insert 済みである前提
/// 見つからない場合は 500 (middleware 未設定は設定ミス)
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| {
                tracing::error!("identity missing from request; session middleware not applied");
                AppError::Internal
            })
    }
}

/// 認証済みであることを要求する extractor
/// Anonymous の場合は 401 を返し、middleware 側の challenge に委ねる
pub struct RequireSession(pub SessionPrincipal);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;

        match identity {
            Identity::Authenticated(principal) => Ok(RequireSession(principal)),
            Identity::Anonymous => Err(AppError::Unauthorized),
        }
    }
}
