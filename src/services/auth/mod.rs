pub mod authenticator;
pub mod challenge;
pub mod cookie;
pub mod factory;
pub mod identity;
pub mod lookup;

pub use authenticator::{Authenticator, InboundRequest, SessionAuthenticator};
pub use challenge::ChallengePolicy;
pub use cookie::{SESSION_COOKIE_NAME, SessionToken};
pub use factory::build_authenticator;
pub use identity::{Identity, SessionPrincipal, UserSession};
pub use lookup::{
    AllowedHosts, LookupError, LookupResponse, MAX_SESSION_BODY_BYTES, ReqwestSessionClient,
    SessionClient,
};

/// Errors that escape authentication.
///
/// Failed or negative lookups are not errors: they resolve to
/// `Identity::Anonymous`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication misconfigured: {0}")]
    Configuration(String),
    #[error("session lookup cancelled")]
    Cancelled,
}
