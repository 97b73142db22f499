//! OAuth2 authorization-code client.
//!
//! Consent URLs and the code exchange go through `oauth2::BasicClient`, driven
//! by the gateway's own reqwest client so the exchange timeout and TLS
//! settings apply. Endpoint discovery reads the OpenShift-style metadata
//! document, which is not an OpenID provider configuration.

use std::fmt;

use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, OAuthConfig};

/// Metadata path served by OpenShift-style API servers.
pub const DISCOVERY_PATH: &str = "/.well-known/oauth-authorization-server";

type CodeClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token request failed: {0}")]
    Token(#[from] RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>),

    #[error("token response carried an empty access_token")]
    MissingAccessToken,
}

/// Authorization server endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// Fetch endpoint metadata from the upstream API server.
pub async fn discover(client: &Client, upstream: &Url) -> Result<ServerMetadata, ConfigError> {
    let url = upstream
        .join(DISCOVERY_PATH)
        .map_err(|e| ConfigError::Discovery(e.to_string()))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ConfigError::Discovery(format!("{url}: {e}")))?;
    if !response.status().is_success() {
        return Err(ConfigError::Discovery(format!(
            "{url}: status {}",
            response.status()
        )));
    }

    let metadata: ServerMetadata = response
        .json()
        .await
        .map_err(|e| ConfigError::Discovery(format!("{url}: {e}")))?;
    tracing::info!(
        authorization_endpoint = %metadata.authorization_endpoint,
        token_endpoint = %metadata.token_endpoint,
        "Discovered OAuth endpoints"
    );
    Ok(metadata)
}

#[derive(Clone)]
pub struct OAuthClient {
    inner: CodeClient,
    scopes: Vec<String>,
    http: Client,
}

impl OAuthClient {
    pub fn new(
        config: &OAuthConfig,
        metadata: Option<&ServerMetadata>,
        redirect_uri: String,
        http: Client,
    ) -> Result<Self, ConfigError> {
        let authorize_url = resolve_endpoint(
            "authorize_url",
            config.authorize_url.as_deref(),
            metadata.map(|m| m.authorization_endpoint.as_str()),
        )?;
        let token_url = resolve_endpoint(
            "token_url",
            config.token_url.as_deref(),
            metadata.map(|m| m.token_endpoint.as_str()),
        )?;
        let redirect_uri = RedirectUrl::new(redirect_uri)
            .map_err(|e| ConfigError::Discovery(format!("redirect uri: {e}")))?;

        let inner = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::from_url(authorize_url))
            .set_token_uri(TokenUrl::from_url(token_url))
            .set_redirect_uri(redirect_uri);

        Ok(Self {
            inner,
            scopes: config.scopes.clone(),
            http,
        })
    }

    /// Consent URL for a login carrying `state`.
    pub fn authorization_url(&self, state: &str) -> Url {
        let (url, _) = self
            .inner
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "online")
            .add_extra_param("approval_prompt", "force")
            .url();
        url
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange(&self, code: &str) -> Result<String, ExchangeError> {
        let token = self
            .inner
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await?;

        let access_token = token.access_token().secret();
        if access_token.is_empty() {
            return Err(ExchangeError::MissingAccessToken);
        }
        Ok(access_token.clone())
    }
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.inner.client_id().as_str())
            .field("authorize_url", &self.inner.auth_uri().as_str())
            .field("token_url", &self.inner.token_uri().as_str())
            .field("redirect_uri", &self.inner.redirect_uri().map(|r| r.as_str()))
            .finish_non_exhaustive()
    }
}

fn resolve_endpoint(
    field: &'static str,
    configured: Option<&str>,
    discovered: Option<&str>,
) -> Result<Url, ConfigError> {
    let raw = configured
        .or(discovered)
        .ok_or_else(|| ConfigError::Discovery(format!("no value for oauth.{field}")))?;
    Url::parse(raw).map_err(|e| ConfigError::Discovery(format!("oauth.{field}: {e}")))
}
