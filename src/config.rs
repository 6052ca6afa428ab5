//! Configuration for RelayKV
//!
//! Centralized configuration with sensible defaults.

use crate::error::{RelayError, Result};

/// Main configuration for a RelayKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Disable Nagle's algorithm on accepted sockets
    pub tcp_nodelay: bool,

    /// Connection write timeout (milliseconds, 0 = none). A subscriber that
    /// stops reading is dropped once a write to it stalls this long.
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest bulk string length or array count a client may announce.
    /// Anything bigger is a protocol error and closes the connection.
    pub max_bulk_len: usize,

    /// Deepest array nesting a request frame may use
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6379".to_string(),
            tcp_nodelay: true,
            write_timeout_ms: 5000,
            max_bulk_len: 512 * 1024 * 1024, // 512 MB
            max_depth: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(RelayError::Config("listen address is empty".to_string()));
        }
        if self.max_bulk_len == 0 {
            return Err(RelayError::Config(
                "max bulk length must be greater than zero".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(RelayError::Config(
                "max nesting depth must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Enable or disable TCP_NODELAY on accepted connections
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Set the write timeout (in milliseconds, 0 disables it)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum array nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the maximum bulk string length / array count (in bytes / elements)
    pub fn max_bulk_len(mut self, len: usize) -> Self {
        self.config.max_bulk_len = len;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
