//! Outbound HTTP clients.
//!
//! The upstream relay and the authorization-code exchange share one set of
//! TLS and connect settings. Neither follows redirects; only the exchange has
//! an overall timeout.

use std::time::Duration;

use reqwest::{redirect, Certificate, Client, ClientBuilder};

use crate::config::{loader::read_file, ConfigError, UpstreamConfig};

#[derive(Clone)]
pub struct Transport {
    ca: Option<Certificate>,
    skip_verify_tls: bool,
    connect_timeout: Duration,
}

impl Transport {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let ca = match &config.ca_file {
            Some(path) => {
                let pem = read_file(path)?;
                let cert = Certificate::from_pem(&pem).map_err(|e| ConfigError::Key {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Some(cert)
            }
            None => None,
        };

        if config.skip_verify_tls {
            tracing::warn!("Upstream TLS certificate verification is disabled");
        }

        Ok(Self {
            ca,
            skip_verify_tls: config.skip_verify_tls,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }

    fn builder(&self) -> ClientBuilder {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(self.skip_verify_tls);
        if let Some(ca) = &self.ca {
            builder = builder.add_root_certificate(ca.clone());
        }
        builder
    }

    /// Client for relaying API traffic. Redirects go back to the caller.
    pub fn upstream_client(&self) -> Result<Client, ConfigError> {
        self.builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))
    }

    /// Client for the code exchange, bounded by `timeout` end to end.
    pub fn exchange_client(&self, timeout: Duration) -> Result<Client, ConfigError> {
        self.builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("custom_ca", &self.ca.is_some())
            .field("skip_verify_tls", &self.skip_verify_tls)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builds_clients_from_defaults() {
        let transport = Transport::from_config(&UpstreamConfig::default()).unwrap();
        assert!(transport.upstream_client().is_ok());
        assert!(transport.exchange_client(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn missing_ca_file_is_io_error() {
        let config = UpstreamConfig {
            ca_file: Some("/nonexistent/ca.pem".into()),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            Transport::from_config(&config),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn garbage_ca_file_is_key_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-----BEGIN CERTIFICATE-----\nnot base64 at all!\n-----END CERTIFICATE-----").unwrap();
        let config = UpstreamConfig {
            ca_file: Some(file.path().to_path_buf()),
            ..UpstreamConfig::default()
        };
        let result = Transport::from_config(&config).and_then(|t| t.upstream_client());
        assert!(result.is_err());
    }
}
