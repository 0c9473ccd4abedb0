//! Request handlers.
//!
//! Thin: extract path and body, call the staking service, serialize.

use std::sync::Arc;

use axum::extract::{Json, Path, State};

use crate::chain::{ChainApi, ConnectionStatus};
use crate::http::response::{
    ApiError, AprResponse, ApyResponse, DappResponse, EraEtaResponse, HealthResponse,
    TokenStatsResponse, TvlResponse,
};
use crate::registry::DappRegistry;
use crate::staking::{RegistrationRequest, StakingService};

/// Application state injected into handlers.
pub struct AppState<C, R> {
    pub service: Arc<StakingService<C, R>>,
}

impl<C, R> Clone for AppState<C, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

pub async fn health<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
) -> Json<HealthResponse> {
    let networks: std::collections::BTreeMap<_, _> = state
        .service
        .selector()
        .iter()
        .map(|(network, client)| (network.to_string(), client.status()))
        .collect();

    // Clients connect lazily, so a disconnected network is not unhealthy.
    let connected = networks
        .values()
        .filter(|status| **status == ConnectionStatus::Connected)
        .count();
    tracing::debug!(connected, total = networks.len(), "Health check");

    Json(HealthResponse {
        status: "ok",
        networks,
    })
}

pub async fn apr<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
) -> Result<Json<AprResponse>, ApiError> {
    let apr = state.service.calculate_apr(&network).await?;
    Ok(Json(AprResponse { apr }))
}

pub async fn apy<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
) -> Result<Json<ApyResponse>, ApiError> {
    let apy = state.service.calculate_apy(&network).await?;
    Ok(Json(ApyResponse { apy }))
}

pub async fn tvl<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
) -> Result<Json<TvlResponse>, ApiError> {
    let tvl = state.service.tvl(&network).await?;
    Ok(Json(tvl.into()))
}

pub async fn next_era_eta<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
) -> Result<Json<EraEtaResponse>, ApiError> {
    let eta = state.service.next_era_eta(&network).await?;
    Ok(Json(eta.into()))
}

pub async fn token_stats<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
) -> Result<Json<TokenStatsResponse>, ApiError> {
    let stats = state.service.token_stats(&network).await?;
    Ok(Json(stats.into()))
}

pub async fn register_dapp<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path(network): Path<String>,
    Json(request): Json<RegistrationRequest>,
) -> Result<Json<DappResponse>, ApiError> {
    let record = state.service.register_dapp(&network, request).await?;
    Ok(Json(record.into()))
}

pub async fn get_dapp<C: ChainApi, R: DappRegistry>(
    State(state): State<AppState<C, R>>,
    Path((network, address)): Path<(String, String)>,
) -> Result<Json<DappResponse>, ApiError> {
    match state.service.get_dapp(&network, &address).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(ApiError::NotFound(format!("Dapp {} not found", address))),
    }
}
