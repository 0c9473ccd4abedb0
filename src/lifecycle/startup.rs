//! Startup orchestration.
//!
//! # Responsibilities
//! - Build one chain client per configured network
//! - Select the default network and per-network registration flows
//! - Open the dapp registry
//! - Bind the HTTP listener
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - Construction is generic over the chain client so tests can inject one

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::chain::{ChainApi, NetworkSelector, SubstrateClient};
use crate::config::{ApiConfig, NetworkConfig, NetworkName};
use crate::registry::{DappRegistry, InMemoryDappRegistry, RegistryError};
use crate::staking::{RegistrationStrategy, StakingService};

/// Service wired to live chain clients.
pub type LiveService = StakingService<SubstrateClient, InMemoryDappRegistry>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("default network '{0}' is not configured")]
    MissingDefaultNetwork(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
}

/// Build the service with live chain clients and the configured registry.
pub fn build_service(config: &ApiConfig) -> Result<LiveService, StartupError> {
    let registry = match &config.registry.persistence_path {
        Some(path) => InMemoryDappRegistry::load_from_file(path)?,
        None => InMemoryDappRegistry::new(None),
    };
    build_service_with(config, SubstrateClient::new, Arc::new(registry))
}

/// Build the service with chain clients produced by `make_client`.
pub fn build_service_with<C, R, F>(
    config: &ApiConfig,
    mut make_client: F,
    registry: Arc<R>,
) -> Result<StakingService<C, R>, StartupError>
where
    C: ChainApi,
    R: DappRegistry,
    F: FnMut(&NetworkConfig) -> C,
{
    let default_network: NetworkName = config
        .default_network
        .parse()
        .map_err(|_| StartupError::MissingDefaultNetwork(config.default_network.clone()))?;
    let default_config = config
        .network(default_network)
        .ok_or_else(|| StartupError::MissingDefaultNetwork(config.default_network.clone()))?;

    let mut selector = NetworkSelector::new(default_network, Arc::new(make_client(default_config)));
    let mut strategies = HashMap::new();

    for network in &config.networks {
        if network.name != default_network {
            selector.insert(network.name, Arc::new(make_client(network)));
        }
        if let Some(registration) = &network.registration {
            strategies.insert(network.name, RegistrationStrategy::from_config(registration));
        }
        tracing::info!(
            network = %network.name,
            endpoints = network.rpc_urls.len(),
            evm_rpc_url = ?network.evm_rpc_url,
            registration = network.registration.is_some(),
            "Network configured"
        );
    }

    Ok(StakingService::new(selector, strategies, registry))
}

/// Bind the HTTP listener on the configured address.
pub async fn bind_listener(config: &ApiConfig) -> Result<TcpListener, StartupError> {
    let address = config.server.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
