//! Capability interface of a chain data client.
//!
//! The staking service only talks to the chain through [`ChainApi`], so the
//! calculation and registration logic can run against scripted chains in tests.

use crate::chain::types::{
    ChainResult, ChainSnapshot, ConnectionStatus, DappInfo, DecodedCall, Transaction,
};

#[trait_variant::make(Send)]
pub trait ChainApi
where
    Self: Send + Sync + 'static,
{
    /// Establish the connection, reusing it if already live.
    async fn connect(&self) -> ChainResult<()>;

    /// Current state of the connection.
    fn status(&self) -> ConnectionStatus;

    /// Total issuance in raw chain units.
    async fn total_supply(&self) -> ChainResult<u128>;

    async fn chain_decimals(&self) -> ChainResult<u32>;

    /// Everything the APR calculation needs, relative to one latest block.
    async fn apr_calculation_data(&self) -> ChainResult<ChainSnapshot>;

    /// Total value locked in the current era, raw chain units.
    async fn tvl(&self) -> ChainResult<u128>;

    /// Block at which the next era starts.
    async fn next_era_starting_block(&self) -> ChainResult<u64>;

    /// Hex message a developer signs to authorize registering `dapp_address`.
    async fn register_dapp_payload(
        &self,
        dapp_address: &str,
        sender_address: &str,
    ) -> ChainResult<String>;

    async fn registered_dapp(&self, dapp_address: &str) -> ChainResult<Option<DappInfo>>;

    /// Submit a signed extrinsic and wait until it is finalized.
    ///
    /// Resolves with the extrinsic hash.
    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<String>;

    async fn transaction_from_hex(&self, hex: &str) -> ChainResult<Transaction>;

    async fn call_from_hex(&self, hex: &str) -> ChainResult<DecodedCall>;
}
