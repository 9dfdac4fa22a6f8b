//! Server configuration
//!
//! Built by the CLI and handed to [`TemplateListener::from_config`](crate::io::TemplateListener::from_config).

use std::time::Duration;

use crate::error::{IgtlError, Result};

/// Default OpenIGTLink port
pub const DEFAULT_PORT: u16 = 18944;

/// Listener and connection settings
///
/// # Examples
///
/// ```
/// use igtl_template_server::config::ServerConfig;
///
/// let config = ServerConfig::with_port(18944);
/// assert_eq!(config.accept_attempts, 10);
/// assert_eq!(config.bind_addr(), "0.0.0.0:18944");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port in `[1, 65535]`
    pub port: u16,
    /// How long a single accept poll waits for a client
    pub accept_timeout: Duration,
    /// Number of accept polls before giving up
    pub accept_attempts: u32,
    /// Verify the CRC-64 of every received body
    pub verify_crc: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            accept_timeout: Duration::from_secs(1),
            accept_attempts: 10,
            verify_crc: true,
        }
    }
}

impl ServerConfig {
    /// Default settings on `port`
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Set the interface to bind
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Check that `port` is a usable TCP port
    pub fn validate_port(port: i64) -> Result<u16> {
        if !(1..=65535).contains(&port) {
            return Err(IgtlError::InvalidPort(port));
        }
        Ok(port as u16)
    }

    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upper bound on the time spent waiting for the first client
    pub fn total_accept_window(&self) -> Duration {
        self.accept_timeout * self.accept_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_give_ten_second_window() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 18944);
        assert!(config.verify_crc);
        assert_eq!(config.total_accept_window(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate_port() {
        assert_eq!(ServerConfig::validate_port(1).unwrap(), 1);
        assert_eq!(ServerConfig::validate_port(65535).unwrap(), 65535);
        assert!(matches!(
            ServerConfig::validate_port(0),
            Err(IgtlError::InvalidPort(0))
        ));
        assert!(ServerConfig::validate_port(65536).is_err());
        assert!(ServerConfig::validate_port(-5).is_err());
    }

    #[test]
    fn test_host_override() {
        let config = ServerConfig::with_port(2000).host("127.0.0.1");
        assert_eq!(config.bind_addr(), "127.0.0.1:2000");
    }
}
