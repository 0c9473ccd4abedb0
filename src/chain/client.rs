//! Substrate RPC client with timeout, failover, and one-shot reconnect.
//!
//! # Responsibilities
//! - Connect to a WebSocket RPC endpoint (first reachable URL wins)
//! - Read staking, reward, and issuance state at a single block
//! - Build, decode, and submit dapp-staking calls
//! - Re-establish a dropped connection once before failing a call

use std::future::Future;
use std::time::Duration;

use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::error::{DispatchError, RpcError};
use subxt::ext::scale_value::Value;
use subxt::ext::subxt_core::blocks::Extrinsics;
use subxt::ext::subxt_rpcs;
use subxt::tx::SubmittableTransaction;
use subxt::utils::H256;
use subxt::{OnlineClient, PolkadotConfig};

use crate::chain::api::ChainApi;
use crate::chain::types::{
    decode_hex, era_ago_height, parse_account, ChainError, ChainResult, ChainSnapshot,
    ConnectionStatus, DappInfo, DecodedCall, SmartContract, Transaction, TransactionError,
};
use crate::chain::values;
use crate::config::NetworkConfig;
use crate::config::NetworkName;
use crate::observability::metrics;
use crate::resilience::{with_timeout, Reconnector};

const DEFAULT_TOKEN_DECIMALS: u32 = 18;
const DEFAULT_SS58_FORMAT: u16 = 5;

/// A live connection and the chain properties read when it was opened.
#[derive(Clone)]
struct Connection {
    api: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
    url: String,
    decimals: u32,
    ss58_format: u16,
}

/// Chain data client for one network.
pub struct SubstrateClient {
    network: NetworkName,
    rpc_urls: Vec<String>,
    timeout: Duration,
    finalization_timeout: Duration,
    link: Reconnector<Connection>,
}

impl SubstrateClient {
    /// Create a disconnected client. Nothing is dialed until first use.
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            network: config.name,
            rpc_urls: config.rpc_urls.clone(),
            timeout: Duration::from_secs(config.rpc_timeout_secs),
            finalization_timeout: Duration::from_secs(config.finalization_timeout_secs),
            link: Reconnector::new(config.name),
        }
    }

    pub fn network(&self) -> NetworkName {
        self.network
    }

    /// Return the live connection, establishing it if needed.
    async fn connection(&self) -> ChainResult<Connection> {
        self.link
            .connection(|| self.establish())
            .await
            .map(|(_, connection)| connection)
    }

    /// Try each configured URL in order.
    async fn establish(&self) -> ChainResult<Connection> {
        let mut last_error = None;
        for (i, url) in self.rpc_urls.iter().enumerate() {
            match with_timeout("connect", self.timeout, open(url)).await {
                Ok(connection) => {
                    tracing::info!(
                        network = %self.network,
                        url = %connection.url,
                        decimals = connection.decimals,
                        ss58_format = connection.ss58_format,
                        "Chain client connected"
                    );
                    return Ok(connection);
                }
                Err(e) => {
                    tracing::warn!(
                        network = %self.network,
                        provider_idx = i,
                        url = %url,
                        error = %e,
                        "RPC endpoint unreachable, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(ChainError::Connection(match last_error {
            Some(e) => format!("all RPC endpoints failed for {}: {}", self.network, e),
            None => format!("no RPC endpoints configured for {}", self.network),
        }))
    }

    /// Run `call` against the connection, reconnecting once on transport failure.
    async fn call<T, F, Fut>(&self, operation: &'static str, limit: Duration, call: F) -> ChainResult<T>
    where
        F: Fn(Connection) -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let result = self
            .link
            .call(|| self.establish(), operation, limit, call)
            .await;
        metrics::record_chain_call(self.network.as_str(), operation, result.is_ok());
        result
    }

    async fn read<T, F, Fut>(&self, operation: &'static str, call: F) -> ChainResult<T>
    where
        F: Fn(Connection) -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        self.call(operation, self.timeout, call).await
    }
}

impl ChainApi for SubstrateClient {
    async fn connect(&self) -> ChainResult<()> {
        self.connection().await.map(|_| ())
    }

    fn status(&self) -> ConnectionStatus {
        self.link.status()
    }

    async fn total_supply(&self) -> ChainResult<u128> {
        self.read("total_supply", |c| async move {
            let at = c.best_hash().await?;
            c.storage_u128(at, "Balances", "TotalIssuance").await
        })
        .await
    }

    async fn chain_decimals(&self) -> ChainResult<u32> {
        Ok(self.connection().await?.decimals)
    }

    async fn apr_calculation_data(&self) -> ChainResult<ChainSnapshot> {
        self.read("apr_calculation_data", fetch_snapshot).await
    }

    async fn tvl(&self) -> ChainResult<u128> {
        self.read("tvl", |c| async move {
            let at = c.best_hash().await?;
            let era = c.storage_u128(at, "DappsStaking", "CurrentEra").await?;
            let info = c
                .storage(at, "DappsStaking", "GeneralEraInfo", vec![Value::u128(era)])
                .await?
                .ok_or(ChainError::MissingStorage("DappsStaking.GeneralEraInfo"))?;
            values::field_u128(&info, "locked")
        })
        .await
    }

    async fn next_era_starting_block(&self) -> ChainResult<u64> {
        self.read("next_era_starting_block", |c| async move {
            let at = c.best_hash().await?;
            c.storage(at, "DappsStaking", "NextEraStartingBlock", vec![])
                .await?
                .as_ref()
                .and_then(values::as_u128)
                .and_then(|block| u64::try_from(block).ok())
                .ok_or(ChainError::MissingStorage("DappsStaking.NextEraStartingBlock"))
        })
        .await
    }

    async fn register_dapp_payload(
        &self,
        dapp_address: &str,
        sender_address: &str,
    ) -> ChainResult<String> {
        let contract = SmartContract::parse(dapp_address)?;
        let developer = parse_account(sender_address)?;
        let developer: [u8; 32] = developer.into();

        self.read("register_dapp_payload", |c| async move {
            let payload = subxt::dynamic::tx(
                "DappsStaking",
                "register",
                vec![Value::from_bytes(developer), contract_value(&contract)],
            );
            let call_data = c.api.tx().call_data(&payload).map_err(from_subxt)?;
            Ok(format!("0x{}", hex::encode(call_data)))
        })
        .await
    }

    async fn registered_dapp(&self, dapp_address: &str) -> ChainResult<Option<DappInfo>> {
        let contract = SmartContract::parse(dapp_address)?;

        self.read("registered_dapp", |c| async move {
            let at = c.best_hash().await?;
            let Some(info) = c
                .storage(at, "DappsStaking", "RegisteredDapps", vec![contract_value(&contract)])
                .await?
            else {
                return Ok(None);
            };

            let developer = values::field_account(&info, "developer")?;
            let state = values::field_dapp_state(&info, "state")?;
            Ok(Some(DappInfo {
                developer: c.ss58(developer),
                state,
            }))
        })
        .await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<String> {
        let bytes = transaction.bytes.clone();
        self.call("send_transaction", self.finalization_timeout, |c| {
            let bytes = bytes.clone();
            async move { submit(c, bytes).await }
        })
        .await
    }

    async fn transaction_from_hex(&self, hex: &str) -> ChainResult<Transaction> {
        let bytes = decode_hex(hex)?;
        let connection = self.connection().await?;
        decode_transaction(&connection, bytes)
    }

    async fn call_from_hex(&self, hex: &str) -> ChainResult<DecodedCall> {
        let bytes = decode_hex(hex)?;
        let connection = self.connection().await?;
        decode_call(&connection, &bytes)
    }
}

impl std::fmt::Debug for SubstrateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstrateClient")
            .field("network", &self.network)
            .field("rpc_urls", &self.rpc_urls)
            .field("timeout_secs", &self.timeout.as_secs())
            .field("status", &self.status())
            .finish()
    }
}

impl Connection {
    async fn best_hash(&self) -> ChainResult<H256> {
        self.rpc
            .chain_get_block_hash(None)
            .await
            .map_err(from_rpc)?
            .ok_or(ChainError::MissingStorage("best block hash"))
    }

    async fn hash_at_height(&self, height: u64) -> ChainResult<H256> {
        self.rpc
            .chain_get_block_hash(Some(height.into()))
            .await
            .map_err(from_rpc)?
            .ok_or_else(|| ChainError::Rpc(format!("no block at height {}", height)))
    }

    async fn block_number(&self, at: H256) -> ChainResult<u64> {
        let header = self
            .rpc
            .chain_get_header(Some(at))
            .await
            .map_err(from_rpc)?
            .ok_or(ChainError::MissingStorage("block header"))?;
        Ok(header.number.into())
    }

    fn constant(&self, pallet: &'static str, name: &'static str) -> ChainResult<Value<u32>> {
        let address = subxt::dynamic::constant(pallet, name);
        self.api
            .constants()
            .at(&address)
            .map_err(from_subxt)?
            .to_value()
            .map_err(|e| ChainError::Decode(format!("{}.{}: {}", pallet, name, e)))
    }

    fn constant_u128(&self, pallet: &'static str, name: &'static str) -> ChainResult<u128> {
        values::as_u128(&self.constant(pallet, name)?)
            .ok_or_else(|| ChainError::Decode(format!("{}.{} is not an integer", pallet, name)))
    }

    async fn storage(
        &self,
        at: H256,
        pallet: &'static str,
        entry: &'static str,
        keys: Vec<Value>,
    ) -> ChainResult<Option<Value<u32>>> {
        let address = subxt::dynamic::storage(pallet, entry, keys);
        self.api
            .storage()
            .at(at)
            .fetch(&address)
            .await
            .map_err(from_subxt)?
            .map(|thunk| {
                thunk
                    .to_value()
                    .map_err(|e| ChainError::Decode(format!("{}.{}: {}", pallet, entry, e)))
            })
            .transpose()
    }

    async fn storage_u128(
        &self,
        at: H256,
        pallet: &'static str,
        entry: &'static str,
    ) -> ChainResult<u128> {
        let value = self.storage(at, pallet, entry, vec![]).await?;
        values::require_u128(value.as_ref(), entry)
    }

    async fn timestamp_at(&self, at: H256) -> ChainResult<u64> {
        let now = self.storage_u128(at, "Timestamp", "Now").await?;
        u64::try_from(now).map_err(|_| ChainError::Decode("timestamp overflows u64".to_string()))
    }

    async fn timestamp_at_height(&self, height: u64) -> ChainResult<u64> {
        let hash = self.hash_at_height(height).await?;
        self.timestamp_at(hash).await
    }

    fn ss58(&self, account: [u8; 32]) -> String {
        AccountId32::from(account)
            .to_ss58check_with_version(Ss58AddressFormat::custom(self.ss58_format))
    }
}

async fn open(url: &str) -> ChainResult<Connection> {
    let rpc_client = if url.starts_with("wss://") {
        RpcClient::from_url(url).await
    } else {
        RpcClient::from_insecure_url(url).await
    }
    .map_err(|e| ChainError::Connection(format!("{}: {}", url, e)))?;

    let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone())
        .await
        .map_err(|e| ChainError::Connection(format!("{}: {}", url, e)))?;
    let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client);

    let properties = rpc.system_properties().await.map_err(from_rpc)?;
    let decimals = property_u64(&properties, "tokenDecimals")
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(DEFAULT_TOKEN_DECIMALS);
    let ss58_format = property_u64(&properties, "ss58Format")
        .and_then(|f| u16::try_from(f).ok())
        .unwrap_or(DEFAULT_SS58_FORMAT);

    Ok(Connection {
        api,
        rpc,
        url: url.to_string(),
        decimals,
        ss58_format,
    })
}

/// Numeric system property, given either as a number or a one-element array.
fn property_u64(properties: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<u64> {
    match properties.get(key)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::Array(items) => items.first()?.as_u64(),
        _ => None,
    }
}

/// Reads taken at the latest block, before the historical timestamps.
struct HeadReads {
    block_reward_per_block: u128,
    timestamp: u64,
    latest_block: u64,
    distribution: Value<u32>,
    block_per_era: u128,
    total_issuance: u128,
}

impl HeadReads {
    /// Block heights one week (7 eras) and one era before the latest block.
    fn history_heights(&self) -> ChainResult<(u64, u64)> {
        let block_per_era = self.block_per_era()?;
        Ok((
            era_ago_height(self.latest_block, block_per_era, 7)?,
            era_ago_height(self.latest_block, block_per_era, 1)?,
        ))
    }

    fn block_per_era(&self) -> ChainResult<u64> {
        u64::try_from(self.block_per_era)
            .map_err(|_| ChainError::Decode("block per era overflows u64".to_string()))
    }

    fn into_snapshot(
        self,
        ts_block_7_era_ago: u64,
        ts_block_1_era_ago: u64,
        decimals: u32,
    ) -> ChainResult<ChainSnapshot> {
        let (block_7_era_ago, block_1_era_ago) = self.history_heights()?;
        let distribution = &self.distribution;

        Ok(ChainSnapshot {
            block_reward_per_block: self.block_reward_per_block,
            block_per_era: self.block_per_era()?,
            latest_block: self.latest_block,
            timestamp: self.timestamp,
            base_staker_percent: values::field_perbill(distribution, "base_staker_percent")?,
            adjustable_percent: values::field_perbill(distribution, "adjustable_percent")?,
            ideal_dapps_staking_tvl: values::field_perbill(distribution, "ideal_dapps_staking_tvl")?,
            total_issuance: crate::staking::apr::decimal_adjust(self.total_issuance, decimals),
            block_7_era_ago,
            ts_block_7_era_ago,
            block_1_era_ago,
            ts_block_1_era_ago,
            chain_decimals: decimals,
        })
    }
}

async fn fetch_snapshot(c: Connection) -> ChainResult<ChainSnapshot> {
    let at = c.best_hash().await?;

    let (block_reward_per_block, timestamp, latest_block, distribution, block_per_era, total_issuance) = tokio::try_join!(
        async { c.constant_u128("BlockReward", "RewardAmount") },
        c.timestamp_at(at),
        c.block_number(at),
        async {
            c.storage(at, "BlockReward", "RewardDistributionConfigStorage", vec![])
                .await?
                .ok_or(ChainError::MissingStorage("BlockReward.RewardDistributionConfigStorage"))
        },
        async { c.constant_u128("DappsStaking", "BlockPerEra") },
        c.storage_u128(at, "Balances", "TotalIssuance"),
    )?;
    let head = HeadReads {
        block_reward_per_block,
        timestamp,
        latest_block,
        distribution,
        block_per_era,
        total_issuance,
    };

    let (block_7_era_ago, block_1_era_ago) = head.history_heights()?;
    let (ts_block_7_era_ago, ts_block_1_era_ago) = tokio::try_join!(
        c.timestamp_at_height(block_7_era_ago),
        c.timestamp_at_height(block_1_era_ago),
    )?;

    head.into_snapshot(ts_block_7_era_ago, ts_block_1_era_ago, c.decimals)
}

fn contract_value(contract: &SmartContract) -> Value {
    match contract {
        SmartContract::Evm(address) => Value::unnamed_variant("Evm", [Value::from_bytes(address)]),
        SmartContract::Wasm(account) => {
            Value::unnamed_variant("Wasm", [Value::from_bytes(account)])
        }
    }
}

fn decode_call(c: &Connection, bytes: &[u8]) -> ChainResult<DecodedCall> {
    let [pallet_index, call_index, args @ ..] = bytes else {
        return Err(ChainError::Decode("call data shorter than two bytes".to_string()));
    };

    let metadata = c.api.metadata();
    let pallet = metadata
        .pallet_by_index(*pallet_index)
        .ok_or_else(|| ChainError::Decode(format!("unknown pallet index {}", pallet_index)))?;
    let variant = pallet.call_variant_by_index(*call_index).ok_or_else(|| {
        ChainError::Decode(format!("unknown call index {} in {}", call_index, pallet.name()))
    })?;

    Ok(DecodedCall {
        section: pallet.name().to_string(),
        method: variant.name.clone(),
        args: args.to_vec(),
    })
}

fn decode_transaction(c: &Connection, bytes: Vec<u8>) -> ChainResult<Transaction> {
    let extrinsics = Extrinsics::<PolkadotConfig>::decode_from(vec![bytes.clone()], c.api.metadata())
        .map_err(|e| ChainError::Decode(format!("invalid extrinsic: {}", e)))?;
    let extrinsic = extrinsics
        .iter()
        .next()
        .ok_or_else(|| ChainError::Decode("empty extrinsic".to_string()))?;

    let section = extrinsic
        .pallet_name()
        .map_err(|e| ChainError::Decode(e.to_string()))?
        .to_string();
    let method = extrinsic
        .variant_name()
        .map_err(|e| ChainError::Decode(e.to_string()))?
        .to_string();

    // MultiAddress::Id is a variant byte followed by the account id.
    let signer = extrinsic.address_bytes().map(|address| match address {
        [0, account @ ..] if account.len() == 32 => {
            let mut id = [0u8; 32];
            id.copy_from_slice(account);
            c.ss58(id)
        }
        other => format!("0x{}", hex::encode(other)),
    });

    Ok(Transaction {
        signer,
        call: DecodedCall {
            section,
            method,
            args: extrinsic.field_bytes().to_vec(),
        },
        bytes,
    })
}

async fn submit(c: Connection, bytes: Vec<u8>) -> ChainResult<String> {
    let transaction = SubmittableTransaction::from_bytes(c.api.clone(), bytes);
    let events = transaction
        .submit_and_watch()
        .await
        .map_err(from_subxt)?
        .wait_for_finalized_success()
        .await
        .map_err(from_subxt)?;

    for event in events.iter() {
        let event = event.map_err(from_subxt)?;
        if event.pallet_name() == "Utility" && event.variant_name() == "BatchInterrupted" {
            let fields = event.field_values().map_err(from_subxt)?;
            let mut fields = fields.values();
            let index = fields
                .next()
                .and_then(values::as_u128)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or_default();
            let error = fields.next().map(|v| v.to_string()).unwrap_or_default();
            return Err(TransactionError::BatchInterrupted { index, error }.into());
        }
    }

    Ok(format!("{:?}", events.extrinsic_hash()))
}

fn dispatch_error(error: DispatchError) -> ChainError {
    match error {
        DispatchError::Module(module) => match module.details() {
            Ok(details) => TransactionError::Module {
                section: details.pallet.name().to_string(),
                name: details.variant.name.clone(),
            }
            .into(),
            Err(e) => ChainError::Decode(format!("unresolved module error: {}", e)),
        },
        DispatchError::Token(token) => TransactionError::Token(format!("{:?}", token)).into(),
        other => TransactionError::Dropped(other.to_string()).into(),
    }
}

fn from_rpc(error: subxt_rpcs::Error) -> ChainError {
    match error {
        subxt_rpcs::Error::Client(_) | subxt_rpcs::Error::DisconnectedWillReconnect(_) => {
            ChainError::Connection(error.to_string())
        }
        other => ChainError::Rpc(other.to_string()),
    }
}

fn from_subxt(error: impl Into<subxt::Error>) -> ChainError {
    match error.into() {
        subxt::Error::Rpc(RpcError::ClientError(inner)) => from_rpc(inner),
        subxt::Error::Runtime(dispatch) => dispatch_error(dispatch),
        subxt::Error::Transaction(e) => TransactionError::Dropped(e.to_string()).into(),
        other => ChainError::Rpc(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NetworkConfig {
        let mut config = NetworkConfig::new(NetworkName::Development, "ws://127.0.0.1:1");
        config.rpc_timeout_secs = 2;
        config
    }

    #[test]
    fn test_client_starts_disconnected() {
        let client = SubstrateClient::new(&test_config());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert_eq!(client.network(), NetworkName::Development);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let client = SubstrateClient::new(&test_config());
        let err = client.connect().await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {}", err);
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_reads_fail_without_connection() {
        let client = SubstrateClient::new(&test_config());
        assert!(client.total_supply().await.is_err());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_property_u64_accepts_number_or_array() {
        let properties: serde_json::Map<String, serde_json::Value> = serde_json::from_str(
            r#"{"tokenDecimals": [18], "ss58Format": 5, "tokenSymbol": "ASTR"}"#,
        )
        .unwrap();
        assert_eq!(property_u64(&properties, "tokenDecimals"), Some(18));
        assert_eq!(property_u64(&properties, "ss58Format"), Some(5));
        assert_eq!(property_u64(&properties, "tokenSymbol"), None);
        assert_eq!(property_u64(&properties, "missing"), None);
    }

    fn perbill(parts: u128) -> Value {
        Value::unnamed_composite([Value::u128(parts)])
    }

    fn head_reads() -> HeadReads {
        HeadReads {
            block_reward_per_block: 266_400_000_000_000_000_000,
            timestamp: 1_650_000_000_000,
            latest_block: 325_833,
            distribution: Value::named_composite([
                ("base_staker_percent", perbill(100_000_000)),
                ("dapps_percent", perbill(500_000_000)),
                ("adjustable_percent", perbill(250_000_000)),
                ("ideal_dapps_staking_tvl", perbill(400_000_000)),
            ])
            .map_context(|_| 0),
            block_per_era: 7200,
            total_issuance: 7_000_000_000 * 10u128.pow(18),
        }
    }

    #[test]
    fn test_history_heights_are_one_week_and_one_era_back() {
        assert_eq!(head_reads().history_heights().unwrap(), (275_433, 318_633));
    }

    #[test]
    fn test_history_heights_refuse_young_chain() {
        let reads = HeadReads {
            latest_block: 40_000,
            ..head_reads()
        };
        assert!(matches!(
            reads.history_heights(),
            Err(ChainError::ChainTooYoung { latest: 40_000, blocks_back: 50_400 })
        ));
    }

    #[test]
    fn test_snapshot_assembles_reference_apr() {
        let snapshot = head_reads()
            .into_snapshot(1_649_390_160_000, 1_649_912_880_000, 18)
            .unwrap();

        assert_eq!(snapshot.block_per_era, 7200);
        assert_eq!(snapshot.block_7_era_ago, 275_433);
        assert_eq!(snapshot.block_1_era_ago, 318_633);
        assert_eq!(snapshot.base_staker_percent, 0.1);
        assert_eq!(snapshot.adjustable_percent, 0.25);
        assert_eq!(snapshot.ideal_dapps_staking_tvl, 0.4);
        assert_eq!(snapshot.total_issuance, 7_000_000_000.0);
        assert_eq!(snapshot.chain_decimals, 18);

        let tvl = 2_245_434_762 * 10u128.pow(18);
        let apr = crate::staking::apr::calculate_apr(&snapshot, tvl);
        assert_eq!((apr * 10_000.0).round() / 10_000.0, 9.2977);
    }

    #[test]
    fn test_snapshot_requires_distribution_fields() {
        let mut reads = head_reads();
        reads.distribution = Value::named_composite([
            ("base_staker_percent", perbill(100_000_000)),
            ("adjustable_percent", perbill(250_000_000)),
        ])
        .map_context(|_| 0);

        let err = reads.into_snapshot(0, 0, 18).unwrap_err();
        assert!(matches!(err, ChainError::Decode(_)), "unexpected error: {}", err);
    }
}
