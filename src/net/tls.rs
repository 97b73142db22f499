//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;

use crate::config::{ConfigError, TlsConfig};

/// Load the listener certificate and key.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, ConfigError> {
    for path in [&config.cert_path, &config.key_path] {
        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
    }

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| ConfigError::Key {
            path: config.cert_path.clone(),
            reason: e.to_string(),
        })
}
