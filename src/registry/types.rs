//! Dapp metadata records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NetworkName;

/// A developer credited on a dapp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Developer {
    pub name: String,
    pub github_account_url: String,
    pub twitter_account_url: String,
    pub linked_in_account_url: String,
}

/// Dapp metadata as submitted by its developer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappItem {
    /// Contract address: `0x` + 40 hex for EVM, SS58 for Wasm.
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub developers: Vec<Developer>,
    #[serde(default)]
    pub contract_type: String,
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub license: String,
}

/// A stored dapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappRecord {
    #[serde(flatten)]
    pub item: DappItem,
    pub network: NetworkName,
    /// Milliseconds since the Unix epoch.
    pub registered_at: u64,
}

/// Errors from the dapp registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The blocking save task panicked or was cancelled.
    #[error("Registry task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
