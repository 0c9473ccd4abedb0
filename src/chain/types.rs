//! Chain-specific types and error definitions.

use std::fmt;

use serde::Serialize;
use sp_core::crypto::{AccountId32, Ss58Codec};
use thiserror::Error;

/// Inputs of the APR calculation, read relative to a single latest block.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    /// Reward minted per block, fixed point with `chain_decimals` digits.
    pub block_reward_per_block: u128,
    pub block_per_era: u64,
    pub latest_block: u64,
    /// Chain time at `latest_block` in milliseconds.
    pub timestamp: u64,
    pub base_staker_percent: f64,
    pub adjustable_percent: f64,
    pub ideal_dapps_staking_tvl: f64,
    /// Decimal-adjusted token amount.
    pub total_issuance: f64,
    pub block_7_era_ago: u64,
    pub ts_block_7_era_ago: u64,
    pub block_1_era_ago: u64,
    pub ts_block_1_era_ago: u64,
    pub chain_decimals: u32,
}

/// Height `eras_ago` eras before `latest`, refusing to go below genesis.
pub fn era_ago_height(latest: u64, block_per_era: u64, eras_ago: u64) -> ChainResult<u64> {
    let blocks_back = block_per_era
        .checked_mul(eras_ago)
        .ok_or(ChainError::ChainTooYoung {
            latest,
            blocks_back: u64::MAX,
        })?;
    latest
        .checked_sub(blocks_back)
        .ok_or(ChainError::ChainTooYoung { latest, blocks_back })
}

/// On-chain registration state of a dapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DappState {
    Registered,
    /// Unregistered in the given era.
    Unregistered(u32),
}

/// On-chain registration record of a dapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DappInfo {
    /// SS58 address of the developer, encoded with the chain's prefix.
    pub developer: String,
    pub state: DappState,
}

/// A smart contract address as the staking pallet keys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartContract {
    Evm([u8; 20]),
    Wasm([u8; 32]),
}

impl SmartContract {
    /// Parse `0x` + 40 hex characters as EVM, anything else as an SS58 account.
    pub fn parse(address: &str) -> ChainResult<Self> {
        if let Some(hex_part) = address.strip_prefix("0x") {
            if hex_part.len() == 40 {
                let mut bytes = [0u8; 20];
                hex::decode_to_slice(hex_part, &mut bytes)
                    .map_err(|_| ChainError::InvalidAddress(address.to_string()))?;
                return Ok(SmartContract::Evm(bytes));
            }
            return Err(ChainError::InvalidAddress(address.to_string()));
        }

        let account = parse_account(address)?;
        Ok(SmartContract::Wasm(account.into()))
    }
}

impl fmt::Display for SmartContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmartContract::Evm(address) => write!(f, "0x{}", hex::encode(address)),
            SmartContract::Wasm(account) => write!(f, "0x{}", hex::encode(account)),
        }
    }
}

/// Split SCALE-encoded `DappsStaking.register` arguments into developer and contract.
///
/// Layout: 32-byte account, then the contract enum (`0` = 20-byte EVM
/// address, `1` = 32-byte Wasm account). Trailing bytes are rejected.
pub fn decode_register_args(args: &[u8]) -> ChainResult<([u8; 32], SmartContract)> {
    let truncated = || ChainError::Decode("register arguments are truncated".to_string());

    let (developer, rest) = args.split_first_chunk::<32>().ok_or_else(truncated)?;
    let (variant, rest) = rest.split_first().ok_or_else(truncated)?;
    let (contract, rest) = match variant {
        0 => {
            let (address, rest) = rest.split_first_chunk::<20>().ok_or_else(truncated)?;
            (SmartContract::Evm(*address), rest)
        }
        1 => {
            let (account, rest) = rest.split_first_chunk::<32>().ok_or_else(truncated)?;
            (SmartContract::Wasm(*account), rest)
        }
        other => {
            return Err(ChainError::Decode(format!("unknown smart contract variant {}", other)))
        }
    };
    if !rest.is_empty() {
        return Err(ChainError::Decode(format!(
            "{} trailing bytes after register arguments",
            rest.len()
        )));
    }
    Ok((*developer, contract))
}

/// Decode an SS58 address of any prefix, or `0x` + 64 hex characters.
pub fn parse_account(address: &str) -> ChainResult<AccountId32> {
    if let Some(hex_part) = address.strip_prefix("0x") {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| ChainError::InvalidAddress(address.to_string()))?;
        return Ok(AccountId32::from(bytes));
    }

    AccountId32::from_ss58check_with_version(address)
        .map(|(account, _)| account)
        .map_err(|_| ChainError::InvalidAddress(address.to_string()))
}

/// Decode a hex string with optional `0x` prefix.
pub fn decode_hex(input: &str) -> ChainResult<Vec<u8>> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(stripped).map_err(|e| ChainError::Decode(format!("invalid hex: {}", e)))
}

/// A runtime call decoded against metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    /// Pallet name, e.g. `DappsStaking`.
    pub section: String,
    /// Call name, e.g. `register`.
    pub method: String,
    /// SCALE-encoded call arguments.
    pub args: Vec<u8>,
}

impl DecodedCall {
    pub fn is(&self, section: &str, method: &str) -> bool {
        self.section == section && self.method == method
    }

    pub fn args_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.args))
    }
}

/// An extrinsic decoded against metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Hex-encoded signer address bytes, if the extrinsic is signed.
    pub signer: Option<String>,
    pub call: DecodedCall,
    /// Raw encoded extrinsic as submitted.
    pub bytes: Vec<u8>,
}

/// Observable state of a chain connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Failure reported by the chain for a submitted extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Pallet error resolved against metadata.
    #[error("{section}.{name}")]
    Module { section: String, name: String },

    #[error("token.{0}")]
    Token(String),

    /// A batched call failed part way.
    #[error("utility.BatchInterrupted: call {index} failed with {error}")]
    BatchInterrupted { index: u32, error: String },

    /// Dropped, invalid or otherwise not finalized.
    #[error("transaction not finalized: {0}")]
    Dropped(String),
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport to the node unavailable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A call exceeded its deadline.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    /// The node answered with an error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A value could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Storage that must exist was empty.
    #[error("Storage {0} is empty")]
    MissingStorage(&'static str),

    /// Fewer blocks exist than the lookback requires.
    #[error("Chain too young: latest block {latest} is less than {blocks_back} blocks")]
    ChainTooYoung { latest: u64, blocks_back: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] TransactionError),
}

impl ChainError {
    /// Whether the failure means the connection must be re-established.
    pub fn is_connection(&self) -> bool {
        matches!(self, ChainError::Connection(_))
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

impl fmt::Display for DappState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DappState::Registered => f.write_str("Registered"),
            DappState::Unregistered(era) => write!(f, "Unregistered({})", era),
        }
    }
}
