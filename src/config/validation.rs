//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that exactly one verification mode can be active
//! - Check that gateway-owned paths do not collide with API traffic
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.url is invalid: {0}")]
    UpstreamUrl(String),

    #[error("upstream.api_path must start and end with '/', got {0:?}")]
    ApiPath(String),

    #[error("translate mode needs upstream.bearer_token or upstream.bearer_token_file")]
    MissingServiceCredential,

    #[error("upstream.bearer_token and upstream.bearer_token_file are mutually exclusive")]
    AmbiguousServiceCredential,

    #[error("auth.jwt_secret_file and auth.jwt_public_key_file are mutually exclusive")]
    AmbiguousVerificationKey,

    #[error("{field} ({path}) must not live under upstream.api_path")]
    PathUnderApiPrefix { field: &'static str, path: String },

    #[error("{field} must start with '/', got {path:?}")]
    RelativePath { field: &'static str, path: String },

    #[error("{field} duplicates {other} ({path})")]
    DuplicatePath {
        field: &'static str,
        other: &'static str,
        path: String,
    },

    #[error("oauth.client_id is required")]
    MissingClientId,

    #[error("oauth.{0} is required when oauth.discover is false")]
    MissingOAuthEndpoint(&'static str),

    #[error("oauth.{field} is invalid: {reason}")]
    OAuthUrl { field: &'static str, reason: String },

    #[error("oauth.exchange_timeout_secs must be greater than zero")]
    ZeroExchangeTimeout,

    #[error("server.base_address is invalid: {0}")]
    BaseAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.upstream.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::UpstreamUrl(format!(
            "unsupported scheme {:?}",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::UpstreamUrl(e.to_string())),
    }

    let api_path = &config.upstream.api_path;
    let api_path_ok = api_path.len() > 1 && api_path.starts_with('/') && api_path.ends_with('/');
    if !api_path_ok {
        errors.push(ValidationError::ApiPath(api_path.clone()));
    }

    if config.upstream.bearer_token.is_some() && config.upstream.bearer_token_file.is_some() {
        errors.push(ValidationError::AmbiguousServiceCredential);
    }
    let has_service_credential = config
        .upstream
        .bearer_token
        .as_deref()
        .is_some_and(|t| !t.is_empty())
        || config.upstream.bearer_token_file.is_some();
    if !config.upstream.bearer_token_passthrough && !has_service_credential {
        errors.push(ValidationError::MissingServiceCredential);
    }

    if config.auth.jwt_secret_file.is_some() && config.auth.jwt_public_key_file.is_some() {
        errors.push(ValidationError::AmbiguousVerificationKey);
    }

    let owned_paths = [
        ("server.login_path", &config.server.login_path),
        ("server.callback_path", &config.server.callback_path),
        ("server.token_path", &config.server.token_path),
        ("auth.login_page", &config.auth.login_page),
    ];
    for (field, path) in owned_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field,
                path: path.clone(),
            });
        } else if api_path_ok && path.starts_with(api_path.as_str()) {
            errors.push(ValidationError::PathUnderApiPrefix {
                field,
                path: path.clone(),
            });
        }
    }

    let routes = &owned_paths[..3];
    for (i, &(field, path)) in routes.iter().enumerate() {
        if let Some(&(other, _)) = routes[..i].iter().find(|&&(_, earlier)| earlier == path) {
            errors.push(ValidationError::DuplicatePath {
                field,
                other,
                path: path.clone(),
            });
        }
    }

    if let Err(e) = Url::parse(&config.server.base_address) {
        errors.push(ValidationError::BaseAddress(e.to_string()));
    }

    if let Some(oauth) = &config.oauth {
        if oauth.client_id.is_empty() {
            errors.push(ValidationError::MissingClientId);
        }
        if oauth.exchange_timeout_secs == 0 {
            errors.push(ValidationError::ZeroExchangeTimeout);
        }
        for (field, value) in [
            ("authorize_url", &oauth.authorize_url),
            ("token_url", &oauth.token_url),
        ] {
            match value {
                Some(url) => {
                    if let Err(e) = Url::parse(url) {
                        errors.push(ValidationError::OAuthUrl {
                            field,
                            reason: e.to_string(),
                        });
                    }
                }
                None if !oauth.discover => errors.push(ValidationError::MissingOAuthEndpoint(field)),
                None => {}
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
