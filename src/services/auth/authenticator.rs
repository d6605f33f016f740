//! Cookie session authentication: token → remote lookup → `Identity`.
//!
//! Outcomes:
//! - no token, origin outside the allowlist, non-success lookup, transport
//!   error, oversized/malformed/`null` body → `Identity::Anonymous`
//! - success with a session body → `Identity::Authenticated`
//! - cancellation during the lookup → `AuthError::Cancelled` (never Anonymous)

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{HeaderMap, Uri},
    response::Response,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::AuthError;
use super::challenge::ChallengePolicy;
use super::cookie::{SessionToken, extract_session_token};
use super::identity::{Identity, SessionPrincipal, UserSession};
use super::lookup::{AllowedHosts, LookupError, LookupOrigin, LookupResponse, SessionClient};

/// Borrowed view of the parts of a request authentication looks at.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
}

impl<'a> InboundRequest<'a> {
    pub fn new(headers: &'a HeaderMap, uri: &'a Uri) -> Self {
        Self { headers, uri }
    }
}

/// The two hooks a host pipeline calls around its handlers.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the request's identity. `cancel` is forwarded to the lookup.
    async fn authenticate(
        &self,
        request: &InboundRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Identity, AuthError>;

    /// Decide how a denied request is answered. Performs no I/O.
    fn challenge(&self, original_uri: &Uri, prior: Response) -> Response;
}

pub struct SessionAuthenticator {
    client: Arc<dyn SessionClient>,
    challenge: ChallengePolicy,
    trust_forwarded_headers: bool,
    allowed_hosts: AllowedHosts,
}

impl SessionAuthenticator {
    pub fn builder() -> SessionAuthenticatorBuilder {
        SessionAuthenticatorBuilder::default()
    }

    fn resolve(
        &self,
        token: SessionToken,
        response: Result<LookupResponse, LookupError>,
    ) -> Identity {
        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "session lookup failed");
                return Identity::Anonymous;
            }
        };

        if !response.status.is_success() {
            debug!(status = %response.status, "session lookup rejected token");
            return Identity::Anonymous;
        }

        match serde_json::from_slice::<Option<UserSession>>(&response.body) {
            Ok(Some(session)) => Identity::Authenticated(SessionPrincipal::new(token, session)),
            Ok(None) => {
                debug!("session lookup returned no session");
                Identity::Anonymous
            }
            Err(err) => {
                warn!(error = %err, "malformed session lookup body");
                Identity::Anonymous
            }
        }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(
        &self,
        request: &InboundRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Identity, AuthError> {
        let Some(token) = extract_session_token(request.headers, Utc::now()) else {
            debug!("no session cookie");
            return Ok(Identity::Anonymous);
        };

        let Some(origin) =
            LookupOrigin::resolve(request.headers, request.uri, self.trust_forwarded_headers)
        else {
            warn!(uri = %request.uri, "cannot resolve request origin for session lookup");
            return Ok(Identity::Anonymous);
        };

        // Host is client-controlled; the token only goes to listed hosts
        if !self.allowed_hosts.permits(&origin) {
            warn!(authority = origin.authority(), "session lookup host not allowed");
            return Ok(Identity::Anonymous);
        }

        let url = match origin.session_url(&token) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, authority = origin.authority(), "invalid session lookup target");
                return Ok(Identity::Anonymous);
            }
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(authority = origin.authority(), "session lookup cancelled");
                return Err(AuthError::Cancelled);
            }
            res = self.client.fetch(&url) => res,
        };

        let identity = self.resolve(token, response);
        debug!(
            authority = origin.authority(),
            authenticated = identity.is_authenticated(),
            "session lookup finished"
        );
        Ok(identity)
    }

    fn challenge(&self, original_uri: &Uri, prior: Response) -> Response {
        self.challenge.apply(original_uri, prior)
    }
}

/// Builder for `SessionAuthenticator`. A `SessionClient` is mandatory.
#[derive(Default)]
pub struct SessionAuthenticatorBuilder {
    client: Option<Arc<dyn SessionClient>>,
    challenge: ChallengePolicy,
    trust_forwarded_headers: bool,
    allowed_hosts: AllowedHosts,
}

impl SessionAuthenticatorBuilder {
    pub fn client(mut self, client: Arc<dyn SessionClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn challenge(mut self, challenge: ChallengePolicy) -> Self {
        self.challenge = challenge;
        self
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    /// Hosts the lookup may target. Left unset, every lookup is refused.
    pub fn allowed_hosts(mut self, hosts: AllowedHosts) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    pub fn build(self) -> Result<SessionAuthenticator, AuthError> {
        let client = self.client.ok_or_else(|| {
            AuthError::Configuration("no session lookup client configured".to_string())
        })?;

        Ok(SessionAuthenticator {
            client,
            challenge: self.challenge,
            trust_forwarded_headers: self.trust_forwarded_headers,
            allowed_hosts: self.allowed_hosts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{HeaderValue, StatusCode, header};
    use axum::response::IntoResponse;
    use url::Url;

    use crate::services::auth::identity::{CLAIM_TOKEN, CLAIM_USER_FULL_NAME};

    enum Reply {
        Status(StatusCode, &'static str),
        Transport,
        TooLarge,
        Hang,
    }

    struct FakeClient {
        reply: Reply,
        calls: AtomicUsize,
        last_url: Mutex<Option<String>>,
    }

    impl FakeClient {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionClient for FakeClient {
        async fn fetch(&self, url: &Url) -> Result<LookupResponse, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(url.to_string());
            match self.reply {
                Reply::Status(status, body) => Ok(LookupResponse::new(status, body.as_bytes())),
                Reply::Transport => Err(LookupError::Url("connection refused".to_string())),
                Reply::TooLarge => Err(LookupError::BodyTooLarge { limit: 16 }),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    fn authenticator(client: Arc<FakeClient>) -> SessionAuthenticator {
        SessionAuthenticator::builder()
            .client(client)
            .allowed_hosts(AllowedHosts::new(["example.com"]))
            .build()
            .unwrap()
    }

    fn request(cookie: Option<&str>) -> (HeaderMap, Uri) {
        let mut headers = HeaderMap::new();
        if let Some(c) = cookie {
            headers.insert(header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        (headers, "https://example.com/dashboard".parse().unwrap())
    }

    async fn run(client: Arc<FakeClient>, cookie: Option<&str>) -> Result<Identity, AuthError> {
        let (headers, uri) = request(cookie);
        authenticator(client)
            .authenticate(&InboundRequest::new(&headers, &uri), &CancellationToken::new())
            .await
    }

    #[test]
    fn build_without_client_is_a_configuration_error() {
        let err = SessionAuthenticator::builder().build().err().unwrap();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn missing_cookie_is_anonymous_without_lookup() {
        let client = FakeClient::new(Reply::Status(StatusCode::OK, r#"{"userFullName":"x"}"#));
        let id = run(client.clone(), None).await.unwrap();
        assert_eq!(id, Identity::Anonymous);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn empty_cookie_is_anonymous_without_lookup() {
        let client = FakeClient::new(Reply::Status(StatusCode::OK, r#"{"userFullName":"x"}"#));
        let id = run(client.clone(), Some("X-Session-Token=")).await.unwrap();
        assert_eq!(id, Identity::Anonymous);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn valid_session_yields_both_claims() {
        let client = FakeClient::new(Reply::Status(
            StatusCode::OK,
            r#"{"userFullName":"Jane Doe"}"#,
        ));
        let id = run(client.clone(), Some("X-Session-Token=abc123"))
            .await
            .unwrap();

        assert_eq!(id.claim(CLAIM_TOKEN), Some("abc123"));
        assert_eq!(id.claim(CLAIM_USER_FULL_NAME), Some("Jane Doe"));
        assert_eq!(client.calls(), 1);
        assert_eq!(
            client.last_url.lock().unwrap().as_deref(),
            Some("https://example.com/session/abc123")
        );
    }

    #[tokio::test]
    async fn not_found_is_anonymous() {
        let client = FakeClient::new(Reply::Status(StatusCode::NOT_FOUND, ""));
        let id = run(client, Some("X-Session-Token=abc123")).await.unwrap();
        assert_eq!(id, Identity::Anonymous);
    }

    #[tokio::test]
    async fn null_or_malformed_body_is_anonymous() {
        for body in ["null", "{not json", r#"{"userName":"Jane"}"#] {
            let client = FakeClient::new(Reply::Status(StatusCode::OK, body));
            let id = run(client, Some("X-Session-Token=abc123")).await.unwrap();
            assert_eq!(id, Identity::Anonymous, "body: {body}");
        }
    }

    #[tokio::test]
    async fn unlisted_host_is_anonymous_without_lookup() {
        let client = FakeClient::new(Reply::Status(StatusCode::OK, r#"{"userFullName":"x"}"#));
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("X-Session-Token=abc123"));
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:6379"));
        let uri: Uri = "/dashboard".parse().unwrap();

        let id = authenticator(client.clone())
            .authenticate(&InboundRequest::new(&headers, &uri), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, Identity::Anonymous);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn unset_allowlist_refuses_every_lookup() {
        let client = FakeClient::new(Reply::Status(StatusCode::OK, r#"{"userFullName":"x"}"#));
        let (headers, uri) = request(Some("X-Session-Token=abc123"));

        let id = SessionAuthenticator::builder()
            .client(client.clone())
            .build()
            .unwrap()
            .authenticate(&InboundRequest::new(&headers, &uri), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(id, Identity::Anonymous);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_anonymous() {
        let client = FakeClient::new(Reply::TooLarge);
        let id = run(client, Some("X-Session-Token=abc123")).await.unwrap();
        assert_eq!(id, Identity::Anonymous);
    }

    #[tokio::test]
    async fn transport_failure_is_anonymous() {
        let client = FakeClient::new(Reply::Transport);
        let id = run(client, Some("X-Session-Token=abc123")).await.unwrap();
        assert_eq!(id, Identity::Anonymous);
    }

    #[tokio::test]
    async fn cancellation_mid_lookup_aborts() {
        let client = FakeClient::new(Reply::Hang);
        let auth = authenticator(client.clone());
        let (headers, uri) = request(Some("X-Session-Token=abc123"));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let res = auth
            .authenticate(&InboundRequest::new(&headers, &uri), &cancel)
            .await;
        assert!(matches!(res, Err(AuthError::Cancelled)));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn challenge_follows_policy() {
        let uri: Uri = "/private".parse().unwrap();
        let prior = || (StatusCode::UNAUTHORIZED, "no").into_response();

        let passthrough = authenticator(FakeClient::new(Reply::Transport));
        assert_eq!(
            passthrough.challenge(&uri, prior()).status(),
            StatusCode::UNAUTHORIZED
        );

        let redirecting = SessionAuthenticator::builder()
            .client(FakeClient::new(Reply::Transport))
            .challenge(ChallengePolicy::redirecting("/login"))
            .build()
            .unwrap();
        assert_eq!(redirecting.challenge(&uri, prior()).status(), StatusCode::FOUND);
    }
}
