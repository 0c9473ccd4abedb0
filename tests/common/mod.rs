//! Shared fixtures for integration tests: a scripted chain and a recording registry.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use staking_api::chain::{
    ChainApi, ChainError, ChainResult, ChainSnapshot, ConnectionStatus, DappInfo, DappState,
    DecodedCall, NetworkSelector, Transaction, TransactionError,
};
use staking_api::config::{NetworkName, RegistrationConfig};
use staking_api::registry::{DappItem, DappRecord, DappRegistry, InMemoryDappRegistry, RegistryResult};
use staking_api::staking::{RegistrationStrategy, StakingService};

pub const DECIMALS: u128 = 1_000_000_000_000_000_000;

/// Payload the scripted chain hands out for signing.
pub const REGISTER_PAYLOAD: &str =
    "0x2200d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

/// Snapshot whose APR against [`reference_tvl`] rounds to 9.2977%.
pub fn reference_snapshot() -> ChainSnapshot {
    ChainSnapshot {
        block_reward_per_block: 266_400_000_000_000_000_000,
        block_per_era: 7200,
        latest_block: 325_833,
        timestamp: 1_650_000_000_000,
        base_staker_percent: 0.1,
        adjustable_percent: 0.25,
        ideal_dapps_staking_tvl: 0.4,
        total_issuance: 7_000_000_000.0,
        block_7_era_ago: 275_433,
        ts_block_7_era_ago: 1_649_390_160_000,
        block_1_era_ago: 318_633,
        ts_block_1_era_ago: 1_649_912_880_000,
        chain_decimals: 18,
    }
}

pub fn reference_tvl() -> u128 {
    2_245_434_762 * DECIMALS
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// A chain whose answers are fixed up front.
///
/// `None` in a read field makes that read fail with a connection error.
pub struct MockChain {
    pub snapshot: Option<ChainSnapshot>,
    pub tvl: Option<u128>,
    pub next_era_block: u64,
    pub total_supply: u128,
    pub payload: String,
    pub registered: Option<DappInfo>,
    pub transaction: Option<Transaction>,
    pub wrapped_call: Option<DecodedCall>,
    pub send_error: Option<TransactionError>,
    /// Time between accepting an extrinsic and reporting it finalized.
    pub send_delay: Option<Duration>,
    /// Latency of the APR inputs reads.
    pub read_delay: Option<Duration>,

    pub reads: AtomicUsize,
    pub registered_reads: AtomicUsize,
    pub payload_requests: Mutex<Vec<(String, String)>>,
    pub decoded_calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<Transaction>>,
}

impl MockChain {
    /// A chain answering every read with the reference figures.
    pub fn healthy() -> Self {
        Self {
            snapshot: Some(reference_snapshot()),
            tvl: Some(reference_tvl()),
            next_era_block: 327_600,
            total_supply: 7_000_000_000 * DECIMALS,
            payload: REGISTER_PAYLOAD.to_string(),
            registered: None,
            transaction: None,
            wrapped_call: None,
            send_error: None,
            send_delay: None,
            read_delay: None,
            reads: AtomicUsize::new(0),
            registered_reads: AtomicUsize::new(0),
            payload_requests: Mutex::new(Vec::new()),
            decoded_calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A chain whose every read fails.
    pub fn unreachable() -> Self {
        Self {
            snapshot: None,
            tvl: None,
            ..Self::healthy()
        }
    }

    /// Healthy chain with `dapp` on record as registered by `developer`.
    pub fn with_registered(developer: &str) -> Self {
        Self {
            registered: Some(DappInfo {
                developer: developer.to_string(),
                state: DappState::Registered,
            }),
            ..Self::healthy()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn registered_reads(&self) -> usize {
        self.registered_reads.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    fn read<T: Clone>(&self, value: &Option<T>) -> ChainResult<T> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        value
            .clone()
            .ok_or_else(|| ChainError::Connection("node unreachable".to_string()))
    }
}

impl ChainApi for MockChain {
    async fn connect(&self) -> ChainResult<()> {
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        if self.snapshot.is_some() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    async fn total_supply(&self) -> ChainResult<u128> {
        self.read(&self.snapshot.as_ref().map(|_| self.total_supply))
    }

    async fn chain_decimals(&self) -> ChainResult<u32> {
        self.read(&self.snapshot.as_ref().map(|s| s.chain_decimals))
    }

    async fn apr_calculation_data(&self) -> ChainResult<ChainSnapshot> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.read(&self.snapshot)
    }

    async fn tvl(&self) -> ChainResult<u128> {
        self.read(&self.tvl)
    }

    async fn next_era_starting_block(&self) -> ChainResult<u64> {
        self.read(&self.snapshot.as_ref().map(|_| self.next_era_block))
    }

    async fn register_dapp_payload(
        &self,
        dapp_address: &str,
        sender_address: &str,
    ) -> ChainResult<String> {
        self.payload_requests
            .lock()
            .unwrap()
            .push((dapp_address.to_string(), sender_address.to_string()));
        Ok(self.payload.clone())
    }

    async fn registered_dapp(&self, _dapp_address: &str) -> ChainResult<Option<DappInfo>> {
        self.registered_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.registered.clone())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<String> {
        if let Some(error) = &self.send_error {
            return Err(ChainError::Transaction(error.clone()));
        }
        self.sent.lock().unwrap().push(transaction.clone());
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("0x{}", hex::encode([0xab; 32])))
    }

    async fn transaction_from_hex(&self, _hex: &str) -> ChainResult<Transaction> {
        self.transaction
            .clone()
            .ok_or_else(|| ChainError::Decode("not an extrinsic".to_string()))
    }

    async fn call_from_hex(&self, hex: &str) -> ChainResult<DecodedCall> {
        self.decoded_calls.lock().unwrap().push(hex.to_string());
        self.wrapped_call
            .clone()
            .ok_or_else(|| ChainError::Decode("not a call".to_string()))
    }
}

/// Registry that remembers every write.
#[derive(Default)]
pub struct RecordingRegistry {
    inner: InMemoryDappRegistry,
    puts: Mutex<Vec<(DappItem, NetworkName)>>,
}

impl RecordingRegistry {
    pub fn puts(&self) -> Vec<(DappItem, NetworkName)> {
        self.puts.lock().unwrap().clone()
    }
}

impl DappRegistry for RecordingRegistry {
    async fn get(&self, address: &str, network: NetworkName) -> RegistryResult<Option<DappRecord>> {
        self.inner.get(address, network).await
    }

    async fn put(&self, item: DappItem, network: NetworkName) -> RegistryResult<DappRecord> {
        self.puts.lock().unwrap().push((item.clone(), network));
        self.inner.put(item, network).await
    }
}

pub type TestService = StakingService<MockChain, RecordingRegistry>;

/// Service with `chain` as the only (default) network, Shibuya.
pub fn service_with(
    chain: Arc<MockChain>,
    registration: Option<RegistrationConfig>,
) -> (Arc<TestService>, Arc<RecordingRegistry>) {
    let registry = Arc::new(RecordingRegistry::default());
    let selector = NetworkSelector::new(NetworkName::Shibuya, chain);
    let mut strategies = HashMap::new();
    if let Some(config) = registration {
        strategies.insert(NetworkName::Shibuya, RegistrationStrategy::from_config(&config));
    }
    let service = StakingService::new(selector, strategies, Arc::clone(&registry));
    (Arc::new(service), registry)
}

pub fn dapp(address: &str) -> DappItem {
    DappItem {
        address: address.to_string(),
        name: "Flipper".to_string(),
        url: "https://flipper.example".to_string(),
        tags: vec!["defi".to_string()],
        ..Default::default()
    }
}
