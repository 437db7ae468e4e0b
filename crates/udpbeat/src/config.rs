// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::RelayError;
use crate::frame::DEFAULT_BUFFER_SIZE;
use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

// Largest payload a UDP datagram can carry over IPv4.
const MAX_UDP_PAYLOAD: usize = 65_507;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the relay socket and the process hosting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address to bind the UDP socket to (e.g., "127.0.0.1")
    pub host: String,
    /// Port to bind the UDP socket to; 0 picks an ephemeral port
    pub port: u16,
    /// Size of the receive buffer, and so the largest frame that can be decoded
    pub buffer_size: usize,
    /// Optional bound on a single receive. Elapsed receives are retried.
    pub read_timeout: Option<Duration>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout: None,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, RelayError> {
        let defaults = Self::default();

        let host = env::var("UDPBEAT_HOST").unwrap_or(defaults.host);
        let port = env::var("UDPBEAT_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let buffer_size = env::var("UDPBEAT_BUFFER_SIZE")
            .ok()
            .and_then(|size| size.parse::<usize>().ok())
            .unwrap_or(defaults.buffer_size);
        let read_timeout = env::var("UDPBEAT_READ_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis);
        let log_level = env::var("UDPBEAT_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            host,
            port,
            buffer_size,
            read_timeout,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.host.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "host cannot be empty".to_string(),
            ));
        }

        if self.buffer_size == 0 || self.buffer_size > MAX_UDP_PAYLOAD {
            return Err(RelayError::InvalidConfig(format!(
                "buffer size must be between 1 and {MAX_UDP_PAYLOAD} bytes, got {}",
                self.buffer_size
            )));
        }

        if self.read_timeout == Some(Duration::ZERO) {
            return Err(RelayError::InvalidConfig(
                "read timeout must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(RelayError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Address the socket binds to, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
