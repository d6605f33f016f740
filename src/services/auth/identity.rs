//! Identity attached to each request after authentication.
//!
//! The handler side only ever sees `Identity`: either `Anonymous`, or a
//! `SessionPrincipal` carrying exactly the `token` and `userFullName` claims.

use serde::Deserialize;

use super::cookie::SessionToken;

pub const CLAIM_TOKEN: &str = "token";
pub const CLAIM_USER_FULL_NAME: &str = "userFullName";

/// Session record returned by the session service (`GET /session/{token}`).
///
/// Only `userFullName` is consumed; any other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSession {
    #[serde(rename = "userFullName")]
    pub user_full_name: String,
}

/// Authenticated principal. Both claims are always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrincipal {
    token: SessionToken,
    user_full_name: String,
}

impl SessionPrincipal {
    pub fn new(token: SessionToken, session: UserSession) -> Self {
        Self {
            token,
            user_full_name: session.user_full_name,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn user_full_name(&self) -> &str {
        &self.user_full_name
    }

    pub fn claim(&self, name: &str) -> Option<&str> {
        match name {
            CLAIM_TOKEN => Some(self.token.as_str()),
            CLAIM_USER_FULL_NAME => Some(&self.user_full_name),
            _ => None,
        }
    }

    pub fn claims(&self) -> [(&'static str, &str); 2] {
        [
            (CLAIM_TOKEN, self.token.as_str()),
            (CLAIM_USER_FULL_NAME, &self.user_full_name),
        ]
    }
}

/// Outcome of authentication, stored in request extensions for every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(SessionPrincipal),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&SessionPrincipal> {
        match self {
            Self::Authenticated(p) => Some(p),
            Self::Anonymous => None,
        }
    }

    pub fn claim(&self, name: &str) -> Option<&str> {
        self.principal().and_then(|p| p.claim(name))
    }
}
