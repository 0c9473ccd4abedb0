//! Response bodies and error mapping.
//!
//! # Design Decisions
//! - Every service error is a 500 with a plain-text message
//! - Raw chain amounts (`u128`) are written as decimal strings

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Serialize, Serializer};

use crate::chain::ConnectionStatus;
use crate::registry::{DappItem, DappRecord};
use crate::staking::{EraEta, StakingError, TokenStats, TvlInfo};

/// Serialize a `u128` as a decimal string.
pub fn u128_string<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Serialize)]
pub struct AprResponse {
    pub apr: f64,
}

#[derive(Debug, Serialize)]
pub struct ApyResponse {
    pub apy: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TvlResponse {
    #[serde(serialize_with = "u128_string")]
    pub tvl: u128,
    pub tvl_tokens: f64,
}

impl From<TvlInfo> for TvlResponse {
    fn from(info: TvlInfo) -> Self {
        Self {
            tvl: info.tvl,
            tvl_tokens: info.tvl_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EraEtaResponse {
    pub eta_seconds: f64,
    pub next_era_block: u64,
    pub current_block: u64,
}

impl From<EraEta> for EraEtaResponse {
    fn from(eta: EraEta) -> Self {
        Self {
            eta_seconds: eta.eta_seconds,
            next_era_block: eta.next_era_block,
            current_block: eta.current_block,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatsResponse {
    pub generated_at: u64,
    #[serde(serialize_with = "u128_string")]
    pub total_supply: u128,
    pub total_supply_tokens: f64,
    pub decimals: u32,
}

impl From<TokenStats> for TokenStatsResponse {
    fn from(stats: TokenStats) -> Self {
        Self {
            generated_at: stats.generated_at,
            total_supply: stats.total_supply,
            total_supply_tokens: stats.total_supply_tokens,
            decimals: stats.decimals,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DappResponse {
    pub dapp: DappItem,
}

impl From<DappRecord> for DappResponse {
    fn from(record: DappRecord) -> Self {
        Self { dapp: record.item }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub networks: BTreeMap<String, ConnectionStatus>,
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Service(StakingError),
    NotFound(String),
}

impl From<StakingError> for ApiError {
    fn from(error: StakingError) -> Self {
        ApiError::Service(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u128_serialized_as_string() {
        let body = TvlResponse {
            tvl: 2_245_434_762_000_000_000_000_000_000,
            tvl_tokens: 2_245_434_762.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tvl"], "2245434762000000000000000000");
        assert_eq!(json["tvlTokens"], 2_245_434_762.0);
    }

    #[test]
    fn test_token_stats_camel_case() {
        let body = TokenStatsResponse {
            generated_at: 1,
            total_supply: u128::MAX,
            total_supply_tokens: 1.0,
            decimals: 18,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["totalSupply"], u128::MAX.to_string());
        assert_eq!(json["generatedAt"], 1);
    }

    #[test]
    fn test_service_errors_are_500() {
        let response = ApiError::from(StakingError::Calculation("APR")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::from(StakingError::Validation("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::NotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
