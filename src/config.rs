// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

//! Transport configuration: a `serde`+TOML root struct generalizing
//! `core::types::NodeConfig`/`NodeP2pConfig` to a single CoAP peer's
//! network parameters, with env-var overrides in `main.rs`'s `env(key,
//! default)` style.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::NetworkParameters;

/// Errors loading or validating a [`TransportConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file's contents did not parse as valid TOML for this shape.
    #[error("parsing config toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration for one transport instance, loaded from TOML or
/// built programmatically. Fields mirror `NodeP2pConfig`'s shape:
/// connection-lifecycle timings plus the executor's buffer sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Milliseconds to wait for socket setup before failing the connection.
    pub setup_timeout_ms: u64,
    /// Keepalive period in milliseconds (`P` in the liveness state machine).
    pub keepalive_period_ms: u64,
    /// Receive buffer size in bytes per connection.
    pub recv_buffer_size: usize,
    /// Bounded capacity of the operations-executor's command channel.
    pub command_channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            setup_timeout_ms: 2_000,
            keepalive_period_ms: 1_500,
            recv_buffer_size: 2048,
            command_channel_capacity: 256,
        }
    }
}

impl TransportConfig {
    /// Loads a config from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Builds a config from this process's environment, following
    /// `main.rs`'s `env(key, default)` convention: `COAP_SETUP_TIMEOUT_MS`,
    /// `COAP_KEEPALIVE_PERIOD_MS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_u64("COAP_SETUP_TIMEOUT_MS") {
            cfg.setup_timeout_ms = v;
        }
        if let Some(v) = env_u64("COAP_KEEPALIVE_PERIOD_MS") {
            cfg.keepalive_period_ms = v;
        }
        cfg
    }

    /// This config's setup timeout as a [`Duration`].
    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    /// This config's keepalive period as a [`Duration`].
    pub fn keepalive_period(&self) -> Duration {
        Duration::from_millis(self.keepalive_period_ms)
    }

    /// Resolves this config into the [`NetworkParameters`] the socket
    /// factory seam needs. `Udp` is the only network parameter set this
    /// core implements.
    pub fn network_parameters(&self) -> Result<NetworkParameters, ConfigError> {
        Ok(NetworkParameters::Udp)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_keepalive_and_setup_constants() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.keepalive_period(), Duration::from_millis(1500));
        assert_eq!(cfg.setup_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn resolves_to_plain_udp_network_parameters() {
        let cfg = TransportConfig::default();
        assert!(matches!(cfg.network_parameters().unwrap(), NetworkParameters::Udp));
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = TransportConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let parsed: TransportConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.setup_timeout_ms, cfg.setup_timeout_ms);
    }

    #[test]
    fn loads_from_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transport.toml");
        fs::write(&path, "keepalive_period_ms = 5000\n").unwrap();
        let cfg = TransportConfig::from_file(&path).unwrap();
        assert_eq!(cfg.keepalive_period_ms, 5000);
        assert_eq!(cfg.setup_timeout_ms, 2000);
    }
}
