//! Staking service: chain reads, APR/APY, and registration gating.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chain::{ChainApi, NetworkSelector};
use crate::config::NetworkName;
use crate::observability::metrics;
use crate::registry::{DappRecord, DappRegistry};
use crate::staking::apr;
use crate::staking::error::{StakingError, StakingResult};
use crate::staking::registration::{
    RegistrationFlow, RegistrationRequest, RegistrationState, RegistrationStrategy,
};

/// Total value locked in the current era.
#[derive(Debug, Clone, PartialEq)]
pub struct TvlInfo {
    pub tvl: u128,
    pub tvl_tokens: f64,
}

/// Estimated time until the next era starts.
#[derive(Debug, Clone, PartialEq)]
pub struct EraEta {
    pub eta_seconds: f64,
    pub next_era_block: u64,
    pub current_block: u64,
}

/// Token supply figures.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStats {
    /// Milliseconds since the Unix epoch.
    pub generated_at: u64,
    pub total_supply: u128,
    pub total_supply_tokens: f64,
    pub decimals: u32,
}

/// Orchestrates chain clients, the APR engine, and the dapp registry.
pub struct StakingService<C, R> {
    selector: NetworkSelector<C>,
    strategies: HashMap<NetworkName, RegistrationStrategy>,
    registry: Arc<R>,
}

impl<C, R> StakingService<C, R>
where
    C: ChainApi,
    R: DappRegistry,
{
    pub fn new(
        selector: NetworkSelector<C>,
        strategies: HashMap<NetworkName, RegistrationStrategy>,
        registry: Arc<R>,
    ) -> Self {
        Self {
            selector,
            strategies,
            registry,
        }
    }

    pub fn selector(&self) -> &NetworkSelector<C> {
        &self.selector
    }

    /// Whether dapps can be registered on `network`.
    pub fn supports_registration(&self, network: NetworkName) -> bool {
        self.strategies.contains_key(&network)
    }

    /// Staker APR in percent.
    pub async fn calculate_apr(&self, network: &str) -> StakingResult<f64> {
        let (network, chain) = self.selector.resolve(network);
        let (snapshot, tvl) = tokio::try_join!(chain.apr_calculation_data(), chain.tvl())
            .map_err(|e| {
                tracing::error!(network = %network, error = %e, "Unable to calculate APR");
                StakingError::Calculation("APR")
            })?;

        let apr = apr::calculate_apr(&snapshot, tvl);
        tracing::debug!(network = %network, apr, latest_block = snapshot.latest_block, "APR calculated");
        Ok(apr)
    }

    /// Staker APY in percent, compounded per block.
    pub async fn calculate_apy(&self, network: &str) -> StakingResult<f64> {
        let apr = self
            .calculate_apr(network)
            .await
            .map_err(|_| StakingError::Calculation("APY"))?;
        Ok(apr::apr_to_apy(apr))
    }

    pub async fn tvl(&self, network: &str) -> StakingResult<TvlInfo> {
        let (network, chain) = self.selector.resolve(network);
        let (tvl, decimals) = tokio::try_join!(chain.tvl(), chain.chain_decimals())
            .map_err(|e| self.chain_failure(network, "TVL", e))?;

        Ok(TvlInfo {
            tvl,
            tvl_tokens: apr::decimal_adjust(tvl, decimals),
        })
    }

    pub async fn next_era_eta(&self, network: &str) -> StakingResult<EraEta> {
        let (network, chain) = self.selector.resolve(network);
        let (snapshot, next_era_block) =
            tokio::try_join!(chain.apr_calculation_data(), chain.next_era_starting_block())
                .map_err(|e| self.chain_failure(network, "era ETA", e))?;

        Ok(EraEta {
            eta_seconds: apr::next_era_eta(&snapshot, next_era_block),
            next_era_block,
            current_block: snapshot.latest_block,
        })
    }

    pub async fn token_stats(&self, network: &str) -> StakingResult<TokenStats> {
        let (network, chain) = self.selector.resolve(network);
        let (total_supply, decimals) = tokio::try_join!(chain.total_supply(), chain.chain_decimals())
            .map_err(|e| self.chain_failure(network, "token stats", e))?;

        Ok(TokenStats {
            generated_at: now_millis(),
            total_supply,
            total_supply_tokens: apr::decimal_adjust(total_supply, decimals),
            decimals,
        })
    }

    /// Authorize and store a dapp registration.
    ///
    /// The registry is written only when the network's flow approves. The
    /// flow runs on its own task, so a submitted extrinsic is still recorded
    /// when the caller disconnects or times out.
    pub async fn register_dapp(
        &self,
        network: &str,
        request: RegistrationRequest,
    ) -> StakingResult<DappRecord> {
        let (network, chain) = self
            .selector
            .resolve_strict(network)
            .ok_or_else(|| StakingError::UnsupportedNetwork(network.to_string()))?;
        let strategy = self
            .strategies
            .get(&network)
            .cloned()
            .ok_or_else(|| StakingError::UnsupportedNetwork(network.to_string()))?;
        let registry = Arc::clone(&self.registry);

        tokio::spawn(authorize_and_store(strategy, chain, registry, network, request))
            .await
            .map_err(|e| {
                metrics::record_registration(network.as_str(), "error");
                tracing::error!(network = %network, error = %e, "Registration task failed");
                StakingError::TaskFailed(e.to_string())
            })?
    }

    pub async fn get_dapp(&self, network: &str, address: &str) -> StakingResult<Option<DappRecord>> {
        let (network, _) = self.selector.resolve(network);
        Ok(self.registry.get(address, network).await?)
    }

    fn chain_failure(
        &self,
        network: NetworkName,
        what: &'static str,
        error: crate::chain::ChainError,
    ) -> StakingError {
        tracing::error!(network = %network, error = %error, "Unable to fetch {}", what);
        StakingError::from_chain(what, error)
    }
}

async fn authorize_and_store<C: ChainApi, R: DappRegistry>(
    strategy: RegistrationStrategy,
    chain: Arc<C>,
    registry: Arc<R>,
    network: NetworkName,
    request: RegistrationRequest,
) -> StakingResult<DappRecord> {
    let state = match strategy.authorize(chain.as_ref(), network, &request).await {
        Ok(state) => state,
        Err(e) => {
            metrics::record_registration(network.as_str(), "error");
            tracing::warn!(
                network = %network,
                dapp = %request.dapp.address,
                error = %e,
                "Registration failed"
            );
            return Err(e);
        }
    };

    match state {
        RegistrationState::Approved => {
            let record = registry.put(request.dapp, network).await?;
            metrics::record_registration(network.as_str(), "approved");
            tracing::info!(network = %network, dapp = %record.item.address, "Dapp registered");
            Ok(record)
        }
        RegistrationState::Rejected(reason) => {
            metrics::record_registration(network.as_str(), "rejected");
            Err(StakingError::Validation(reason))
        }
        other => {
            metrics::record_registration(network.as_str(), "error");
            Err(StakingError::Validation(format!(
                "Registration ended in state {}",
                other
            )))
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
