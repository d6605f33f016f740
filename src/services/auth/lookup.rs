//! Remote session lookup (`GET {scheme}://{authority}/session/{token}`).
//!
//! The lookup is same-origin: scheme and authority come from the inbound
//! request, never from a separately configured base URL. The client controls
//! `Host`, so a resolved origin is only used when it is on the configured
//! `AllowedHosts` list.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode, Uri, header, uri::Authority};
use thiserror::Error;
use url::Url;

use super::AuthError;
use super::cookie::SessionToken;

/// Upper bound for a session record body. Larger bodies are rejected.
pub const MAX_SESSION_BODY_BYTES: usize = 64 * 1024;

/// Raw answer of the session service. Body is only read for success statuses.
#[derive(Debug, Clone)]
pub struct LookupResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl LookupResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Lookup failures. All of them downgrade to an anonymous identity.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("session lookup transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cannot build session lookup url: {0}")]
    Url(String),
    #[error("session lookup body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

/// HTTP client seam used by the authenticator.
///
/// Implementations are long-lived and shared across requests (`Arc<dyn ...>`),
/// connection reuse is their concern.
#[async_trait]
pub trait SessionClient: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<LookupResponse, LookupError>;
}

/// `SessionClient` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSessionClient {
    http: reqwest::Client,
    body_limit: usize,
}

impl ReqwestSessionClient {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("session lookup http client: {e}")))?;

        Ok(Self::from_client(http))
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self {
            http,
            body_limit: MAX_SESSION_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

#[async_trait]
impl SessionClient for ReqwestSessionClient {
    async fn fetch(&self, url: &Url) -> Result<LookupResponse, LookupError> {
        let mut res = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Ok(LookupResponse::new(status, Vec::new()));
        }

        let limit = self.body_limit;
        if res.content_length().is_some_and(|len| len > limit as u64) {
            return Err(LookupError::BodyTooLarge { limit });
        }

        // content-length may be absent or wrong; enforce while streaming
        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(LookupError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(LookupResponse::new(status, body))
    }
}

/// Scheme + authority of the inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOrigin {
    scheme: String,
    authority: String,
}

impl LookupOrigin {
    /// Resolve the origin the request was addressed to.
    ///
    /// Order: absolute request URI, then (if trusted) `X-Forwarded-Proto` /
    /// `X-Forwarded-Host`, then `Host` over plain `http`.
    pub fn resolve(headers: &HeaderMap, uri: &Uri, trust_forwarded: bool) -> Option<Self> {
        let scheme = uri
            .scheme_str()
            .or_else(|| forwarded(headers, "x-forwarded-proto", trust_forwarded))
            .unwrap_or("http")
            .to_ascii_lowercase();

        if scheme != "http" && scheme != "https" {
            return None;
        }

        let authority = match uri.authority() {
            Some(a) => a.clone(),
            None => {
                let host = forwarded(headers, "x-forwarded-host", trust_forwarded).or_else(|| {
                    headers
                        .get(header::HOST)
                        .and_then(|v| v.to_str().ok())
                        .map(str::trim)
                })?;
                Authority::from_str(host).ok()?
            }
        };

        // user-info never belongs to the lookup target
        let authority = match authority.as_str().rsplit_once('@') {
            Some((_, host)) => host.to_string(),
            None => authority.as_str().to_string(),
        };

        if authority.is_empty() {
            return None;
        }

        Some(Self { scheme, authority })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `{scheme}://{authority}/session/{token}`, token encoded as one path segment.
    pub fn session_url(&self, token: &SessionToken) -> Result<Url, LookupError> {
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, self.authority))
            .map_err(|e| LookupError::Url(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| LookupError::Url("origin cannot carry a path".to_string()))?
            .clear()
            .push("session")
            .push(token.as_str());

        Ok(url)
    }
}

/// Hosts the session lookup may be sent to.
///
/// Entries are `host` (any port) or `host:port` (that port only), compared
/// case-insensitively. An empty list permits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn permits(&self, origin: &LookupOrigin) -> bool {
        let Ok(authority) = Authority::from_str(origin.authority()) else {
            return false;
        };
        let host = authority.host().to_ascii_lowercase();
        let with_port = authority
            .port_u16()
            .map(|port| format!("{host}:{port}"));

        self.0
            .iter()
            .any(|entry| *entry == host || Some(entry) == with_port.as_ref())
    }
}

/// First value of a proxy header, only when proxy headers are trusted.
fn forwarded<'a>(headers: &'a HeaderMap, name: &str, trusted: bool) -> Option<&'a str> {
    if !trusted {
        return None;
    }
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
