//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for the staking API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Dapp registry settings.
    pub registry: RegistryConfig,

    /// Network used when a request names an unknown network.
    pub default_network: String,

    /// One entry per supported network.
    pub networks: Vec<NetworkConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            registry: RegistryConfig::default(),
            default_network: NetworkName::Astar.to_string(),
            networks: vec![
                NetworkConfig::new(NetworkName::Astar, "wss://rpc.astar.network"),
                NetworkConfig::new(NetworkName::Shiden, "wss://rpc.shiden.astar.network"),
                NetworkConfig::new(NetworkName::Shibuya, "wss://rpc.shibuya.astar.network"),
            ],
        }
    }
}

impl ApiConfig {
    /// Look up the configuration of a network by name.
    pub fn network(&self, name: NetworkName) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one read request in seconds.
    pub request_timeout_secs: u64,

    /// Total time allowed for a registration request in seconds. Must outlast
    /// transaction finalization.
    pub register_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            register_timeout_secs: 240,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Dapp registry configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file the registry is loaded from and saved to.
    pub persistence_path: Option<String>,
}

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkName {
    Astar,
    Shiden,
    Shibuya,
    Rocstar,
    Development,
}

impl NetworkName {
    pub const ALL: [NetworkName; 5] = [
        NetworkName::Astar,
        NetworkName::Shiden,
        NetworkName::Shibuya,
        NetworkName::Rocstar,
        NetworkName::Development,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkName::Astar => "astar",
            NetworkName::Shiden => "shiden",
            NetworkName::Shibuya => "shibuya",
            NetworkName::Rocstar => "rocstar",
            NetworkName::Development => "development",
        }
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNetwork(pub String);

impl fmt::Display for UnknownNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown network '{}'", self.0)
    }
}

impl std::error::Error for UnknownNetwork {}

impl FromStr for NetworkName {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}

/// Per-network endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Network name.
    pub name: NetworkName,

    /// WebSocket RPC endpoints, tried in order on connect.
    pub rpc_urls: Vec<String>,

    /// EVM JSON-RPC endpoint.
    #[serde(default)]
    pub evm_rpc_url: Option<String>,

    /// Timeout for a single chain read in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Timeout for a submitted transaction to finalize in seconds.
    #[serde(default = "default_finalization_timeout_secs")]
    pub finalization_timeout_secs: u64,

    /// How dapp registrations are validated. Absent means unsupported.
    #[serde(default)]
    pub registration: Option<RegistrationConfig>,
}

impl NetworkConfig {
    /// Network with a single endpoint and default timeouts.
    pub fn new(name: NetworkName, rpc_url: &str) -> Self {
        Self {
            name,
            rpc_urls: vec![rpc_url.to_string()],
            evm_rpc_url: None,
            rpc_timeout_secs: default_rpc_timeout_secs(),
            finalization_timeout_secs: default_finalization_timeout_secs(),
            registration: None,
        }
    }
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_finalization_timeout_secs() -> u64 {
    180
}

/// Registration strategy selection for a network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RegistrationConfig {
    /// Sender signs the register payload; the chain is only read.
    Signature,

    /// Sender supplies a signed `register` extrinsic which is submitted.
    Submission {
        /// Hex characters stripped from an `EthCall.call` argument before
        /// the wrapped call is decoded.
        #[serde(default = "default_eth_call_prefix_hex_chars")]
        eth_call_prefix_hex_chars: usize,
    },
}

fn default_eth_call_prefix_hex_chars() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_name_round_trip() {
        for name in NetworkName::ALL {
            assert_eq!(name.as_str().parse::<NetworkName>().unwrap(), name);
        }
        assert!("astr".parse::<NetworkName>().is_err());
        assert!("Astar".parse::<NetworkName>().is_err());
    }

    #[test]
    fn test_registration_modes_from_toml() {
        let toml_str = r#"
            name = "shiden"
            rpc_urls = ["wss://shiden.example"]
            [registration]
            mode = "submission"
        "#;
        let network: NetworkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            network.registration,
            Some(RegistrationConfig::Submission {
                eth_call_prefix_hex_chars: 10
            })
        );
        assert_eq!(network.rpc_timeout_secs, 30);
        assert_eq!(network.finalization_timeout_secs, 180);
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.default_network, "astar");
        assert!(config.network(NetworkName::Shibuya).is_some());
        assert!(config.network(NetworkName::Rocstar).is_none());
        assert!(!config.observability.metrics_enabled);
    }
}
