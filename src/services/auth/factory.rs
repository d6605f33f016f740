/// Factory: build the session `Authenticator` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{
    AllowedHosts, AuthError, Authenticator, ChallengePolicy, ReqwestSessionClient,
    SessionAuthenticator,
};

pub fn build_authenticator(config: &Config) -> Result<Arc<dyn Authenticator>, AuthError> {
    let client = ReqwestSessionClient::new(config.session_lookup_timeout)?;

    let allowed_hosts = AllowedHosts::new(&config.session_lookup_allowed_hosts);
    if allowed_hosts.is_empty() {
        tracing::warn!("SESSION_LOOKUP_ALLOWED_HOSTS is empty: every request stays anonymous");
    }

    let auth = SessionAuthenticator::builder()
        .client(Arc::new(client))
        .challenge(ChallengePolicy {
            redirect_to_login_on_challenge: config.redirect_to_login_on_challenge,
            login_path: config.login_path.clone(),
        })
        .trust_forwarded_headers(config.trust_forwarded_headers)
        .allowed_hosts(allowed_hosts)
        .build()?;

    Ok(Arc::new(auth))
}
