//! Startup orchestration.
//!
//! Turns a validated [`GatewayConfig`] into the shared request state. Every
//! file is read and every endpoint discovered here, once, before the
//! listener is bound.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::{VerificationKey, Verifier};
use crate::config::{loader::read_file, ConfigError, GatewayConfig, ValidationError};
use crate::gateway::{Pipeline, PipelineSettings, VerificationMode};
use crate::http::server::AppState;
use crate::login::{discover, LoginFlow, OAuthClient};
use crate::proxy::{Forwarder, Transport};

/// Build every request-time component from the configuration.
pub async fn build_state(config: &GatewayConfig) -> Result<AppState, ConfigError> {
    let upstream_url = Url::parse(&config.upstream.url)
        .map_err(|e| ConfigError::Validation(vec![ValidationError::UpstreamUrl(e.to_string())]))?;

    let transport = Transport::from_config(&config.upstream)?;
    let upstream_client = transport.upstream_client()?;

    let mode = verification_mode(config)?;
    let pipeline = Pipeline::standard(PipelineSettings {
        login_page: config.auth.login_page.clone(),
        interactive_login: config
            .auth
            .interactive
            .then(|| config.auth.login_endpoint.clone()),
        api_path: config.upstream.api_path.clone(),
        mode,
    });
    tracing::info!(rules = ?pipeline.rule_names(), "Decision pipeline ready");

    let login = match &config.oauth {
        Some(oauth) => {
            let metadata = if oauth.discover
                && (oauth.authorize_url.is_none() || oauth.token_url.is_none())
            {
                Some(discover(&upstream_client, &upstream_url).await?)
            } else {
                None
            };
            let exchange_client =
                transport.exchange_client(Duration::from_secs(oauth.exchange_timeout_secs))?;
            let client = OAuthClient::new(
                oauth,
                metadata.as_ref(),
                config.redirect_uri(),
                exchange_client,
            )?;
            tracing::info!(client = ?client, "Interactive login enabled");
            LoginFlow::new(client, config.auth.login_endpoint.clone(), oauth.csrf_state)
        }
        None => {
            tracing::info!("No [oauth] section, only manual token login is available");
            LoginFlow::without_oauth(config.auth.login_endpoint.clone())
        }
    };

    let forwarder = Forwarder::new(upstream_client, upstream_url, &config.upstream.api_path);

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        login: Arc::new(login),
        forwarder: Arc::new(forwarder),
    })
}

fn verification_mode(config: &GatewayConfig) -> Result<VerificationMode, ConfigError> {
    if config.upstream.bearer_token_passthrough {
        tracing::info!("Pass-through mode: caller credentials are forwarded unverified");
        return Ok(VerificationMode::PassThrough);
    }

    let service_credential = service_credential(config)?;
    let key = VerificationKey::from_config(&config.auth)?;
    if matches!(key, VerificationKey::None) {
        tracing::warn!("No verification key configured, every API request will be rejected");
    }
    tracing::info!(key = key.kind(), "Translate mode: caller tokens are verified locally");

    Ok(VerificationMode::Translate {
        verifier: Verifier::new(
            key,
            config.upstream.api_path.clone(),
            config.auth.audience.as_deref(),
            config.auth.allow_unscoped_tokens,
        ),
        service_credential,
    })
}

fn service_credential(config: &GatewayConfig) -> Result<Arc<str>, ConfigError> {
    match (&config.upstream.bearer_token, &config.upstream.bearer_token_file) {
        (Some(token), None) if !token.is_empty() => Ok(Arc::from(token.as_str())),
        (None, Some(path)) => read_token_file(path),
        _ => Err(ConfigError::Validation(vec![
            ValidationError::MissingServiceCredential,
        ])),
    }
}

fn read_token_file(path: &Path) -> Result<Arc<str>, ConfigError> {
    let raw = read_file(path)?;
    let token = String::from_utf8(raw).map_err(|e| ConfigError::Key {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::Key {
            path: path.to_path_buf(),
            reason: "token file is empty".to_string(),
        });
    }
    Ok(Arc::from(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn translate_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstream.url = "http://127.0.0.1:1".to_string();
        config.upstream.bearer_token = Some("svc".to_string());
        config
    }

    #[tokio::test]
    async fn builds_translate_state() {
        let state = build_state(&translate_config()).await.unwrap();
        assert_eq!(
            state.pipeline.rule_names(),
            vec!["login-page", "credential", "protected-prefix", "verify"]
        );
        assert_eq!(state.forwarder.upstream().as_str(), "http://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn builds_passthrough_state() {
        let mut config = GatewayConfig::default();
        config.upstream.bearer_token_passthrough = true;
        let state = build_state(&config).await.unwrap();
        assert_eq!(
            state.pipeline.rule_names(),
            vec!["login-page", "credential", "pass-through"]
        );
    }

    #[test]
    fn token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  service-token  ").unwrap();
        assert_eq!(&*read_token_file(file.path()).unwrap(), "service-token");
    }

    #[test]
    fn empty_token_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_token_file(file.path()),
            Err(ConfigError::Key { .. })
        ));
    }

    #[tokio::test]
    async fn oauth_without_endpoints_or_discovery_target_fails() {
        let mut config = translate_config();
        config.oauth = Some(crate::config::OAuthConfig {
            client_id: "gateway".to_string(),
            ..Default::default()
        });
        // Nothing listens on port 1, so discovery cannot succeed.
        assert!(matches!(
            build_state(&config).await,
            Err(ConfigError::Discovery(_))
        ));
    }
}
