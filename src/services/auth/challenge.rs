//! Challenge: how an authorization denial is presented to the caller.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, Uri, header},
    response::Response,
};
use url::form_urlencoded;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const RETURN_URL_PARAM: &str = "returnUrl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengePolicy {
    pub redirect_to_login_on_challenge: bool,
    pub login_path: String,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            redirect_to_login_on_challenge: false,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ChallengePolicy {
    pub fn redirecting(login_path: impl Into<String>) -> Self {
        Self {
            redirect_to_login_on_challenge: true,
            login_path: login_path.into(),
        }
    }

    /// Replace `prior` with a login redirect when enabled, otherwise return it as is.
    ///
    /// The original path and query travel in `returnUrl` so the login page can
    /// send the user back. If no valid `Location` can be built, `prior` wins.
    pub fn apply(&self, original_uri: &Uri, prior: Response) -> Response {
        if !self.redirect_to_login_on_challenge {
            return prior;
        }

        let Some(location) = self.login_location(original_uri) else {
            tracing::warn!(login_path = %self.login_path, "cannot build login redirect");
            return prior;
        };

        tracing::debug!(location = ?location, status = %prior.status(), "challenge redirects to login");

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::FOUND;
        res.headers_mut().insert(header::LOCATION, location);
        res
    }

    fn login_location(&self, original_uri: &Uri) -> Option<HeaderValue> {
        let return_url = original_uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(RETURN_URL_PARAM, return_url)
            .finish();

        let separator = if self.login_path.contains('?') { '&' } else { '?' };
        HeaderValue::from_str(&format!("{}{}{}", self.login_path, separator, query)).ok()
    }
}
