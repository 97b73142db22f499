//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// The single upstream API server and its outbound credential.
    pub upstream: UpstreamConfig,

    /// Caller credential handling and verification.
    pub auth: AuthConfig,

    /// OAuth2 authorization-code login. Absent means no interactive login flow.
    pub oauth: Option<OAuthConfig>,

    /// Externally visible address and gateway-owned paths.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Upstream API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the API server (e.g., "https://kubernetes.default.svc").
    pub url: String,

    /// Extra CA bundle (PEM) trusted for upstream and authorization-server TLS.
    pub ca_file: Option<PathBuf>,

    /// Accept any upstream certificate.
    pub skip_verify_tls: bool,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Path prefix treated as API traffic. Must start and end with '/'.
    pub api_path: String,

    /// Service credential presented upstream in translate mode.
    pub bearer_token: Option<String>,

    /// File holding the service credential; read at startup.
    pub bearer_token_file: Option<PathBuf>,

    /// Forward the caller's own credential and skip local verification.
    pub bearer_token_passthrough: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "https://kubernetes.default.svc".to_string(),
            ca_file: None,
            skip_verify_tls: false,
            connect_timeout_secs: 5,
            api_path: "/k8s/".to_string(),
            bearer_token: None,
            bearer_token_file: None,
            bearer_token_passthrough: false,
        }
    }
}

/// Caller credential handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Redirect credential-less callers to `login_endpoint` instead of failing.
    pub interactive: bool,

    /// Where credential-less interactive callers are sent.
    pub login_endpoint: String,

    /// Static page that is always reachable without a credential.
    pub login_page: String,

    /// HMAC secret used to verify HS256/HS384/HS512 tokens.
    pub jwt_secret_file: Option<PathBuf>,

    /// RSA public key (PEM) used to verify RS*/PS* tokens.
    pub jwt_public_key_file: Option<PathBuf>,

    /// Required `aud` claim. Unchecked when unset.
    pub audience: Option<String>,

    /// Accept tokens without scope claims for the whole protected prefix.
    pub allow_unscoped_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            interactive: true,
            login_endpoint: "/auth/login".to_string(),
            login_page: "/login.html".to_string(),
            jwt_secret_file: None,
            jwt_public_key_file: None,
            audience: None,
            allow_unscoped_tokens: true,
        }
    }
}

/// OAuth2 client configuration for the interactive login flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,

    pub client_secret: String,

    /// Authorization (consent) endpoint.
    pub authorize_url: Option<String>,

    /// Token endpoint for the authorization-code grant.
    pub token_url: Option<String>,

    /// Discover missing endpoints from the upstream's
    /// `/.well-known/oauth-authorization-server` document at startup.
    pub discover: bool,

    pub scopes: Vec<String>,

    /// Bound on the code exchange, independent of the caller's request.
    pub exchange_timeout_secs: u64,

    /// Use a random per-login state bound to a cookie instead of a fixed one.
    pub csrf_state: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: None,
            token_url: None,
            discover: true,
            scopes: vec!["user:full".to_string()],
            exchange_timeout_secs: 2,
            csrf_state: false,
        }
    }
}

/// Gateway-owned paths and the externally visible address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Externally visible base address, used to build the OAuth redirect URI.
    pub base_address: String,

    pub login_path: String,

    pub callback_path: String,

    pub token_path: String,

    /// Directory served for every non-API path.
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_address: "http://localhost:8080".to_string(),
            login_path: "/auth/login".to_string(),
            callback_path: "/auth/callback".to_string(),
            token_path: "/auth/token".to_string(),
            public_dir: PathBuf::from("./web/public"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl GatewayConfig {
    /// The OAuth redirect URI registered with the authorization server.
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}{}",
            self.server.base_address.trim_end_matches('/'),
            self.server.callback_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [upstream]
            url = "https://api.cluster.local:6443"
            bearer_token = "service-token"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.api_path, "/k8s/");
        assert!(config.auth.interactive);
        assert!(config.auth.allow_unscoped_tokens);
        assert!(config.oauth.is_none());
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn oauth_section_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [oauth]
            client_id = "gateway"
            client_secret = "s3cret"
            "#,
        )
        .unwrap();

        let oauth = config.oauth.unwrap();
        assert_eq!(oauth.exchange_timeout_secs, 2);
        assert!(oauth.discover);
        assert!(!oauth.csrf_state);
    }

    #[test]
    fn redirect_uri_joins_base_address() {
        let mut config = GatewayConfig::default();
        config.server.base_address = "https://gate.example.com/".to_string();
        assert_eq!(config.redirect_uri(), "https://gate.example.com/auth/callback");
    }
}
