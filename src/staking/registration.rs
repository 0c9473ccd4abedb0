//! Dapp registration authorization.
//!
//! # Data Flow
//! ```text
//! Signature mode:
//!     Unvalidated
//!     → SignatureChecked     (sender signed the register payload)
//!     → RegistrationChecked  (on-chain record read)
//!     → Approved | Rejected  (state Registered and developer == sender)
//!
//! Submission mode:
//!     Unvalidated
//!     → SignatureChecked     (extrinsic decodes, call is DappsStaking.register
//!                             for the requested contract)
//!     → RegistrationChecked  (extrinsic finalized on chain)
//!     → Approved
//! ```
//!
//! Only `Approved` lets the service write to the registry.

use std::fmt;

use serde::Deserialize;

use crate::chain::types::decode_register_args;
use crate::chain::{ChainApi, ChainError, DappState, DecodedCall, SmartContract};
use crate::config::{NetworkName, RegistrationConfig};
use crate::registry::DappItem;
use crate::staking::error::{StakingError, StakingResult};
use crate::staking::signature;

const STAKING_PALLET: &str = "DappsStaking";
const REGISTER_CALL: &str = "register";

/// Body of a registration request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub dapp: DappItem,
    #[serde(default)]
    pub sender_address: Option<String>,
    /// Hex signature over the register payload.
    #[serde(default)]
    pub signature: Option<String>,
    /// Hex of a signed extrinsic carrying the register call.
    #[serde(default)]
    pub signed_transaction: Option<String>,
}

/// Progress of a registration through authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Unvalidated,
    SignatureChecked,
    RegistrationChecked,
    Approved,
    Rejected(String),
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Unvalidated => f.write_str("unvalidated"),
            RegistrationState::SignatureChecked => f.write_str("signature_checked"),
            RegistrationState::RegistrationChecked => f.write_str("registration_checked"),
            RegistrationState::Approved => f.write_str("approved"),
            RegistrationState::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// One way of deciding whether a registration may be written.
#[trait_variant::make(Send)]
pub trait RegistrationFlow
where
    Self: Send + Sync,
{
    /// Drive `request` to `Approved` or `Rejected`.
    ///
    /// Errors are returned for malformed input and chain failures, never for
    /// a plain rejection.
    async fn authorize<C: ChainApi>(
        &self,
        chain: &C,
        network: NetworkName,
        request: &RegistrationRequest,
    ) -> StakingResult<RegistrationState>;
}

fn transition(network: NetworkName, dapp: &str, state: RegistrationState) -> RegistrationState {
    tracing::debug!(network = %network, dapp = %dapp, state = %state, "Registration state");
    state
}

fn required<'a>(value: &'a Option<String>, field: &str) -> StakingResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StakingError::Validation(format!("{} is required", field)))
}

/// Developer signs the register payload off-chain; the chain already holds the registration.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistration;

impl RegistrationFlow for SignatureRegistration {
    async fn authorize<C: ChainApi>(
        &self,
        chain: &C,
        network: NetworkName,
        request: &RegistrationRequest,
    ) -> StakingResult<RegistrationState> {
        let dapp = request.dapp.address.as_str();
        let sender = required(&request.sender_address, "senderAddress")?;
        let signature_hex = required(&request.signature, "signature")?;
        transition(network, dapp, RegistrationState::Unvalidated);

        let payload = chain
            .register_dapp_payload(dapp, sender)
            .await
            .map_err(|e| StakingError::from_chain("registration payload", e))?;
        let message = crate::chain::types::decode_hex(&payload)
            .map_err(|e| StakingError::from_chain("registration payload", e))?;

        if !signature::verify(&message, signature_hex, sender) {
            tracing::info!(
                network = %network,
                dapp = %dapp,
                signature_len = signature_hex.len(),
                "Registration signature rejected"
            );
            return Ok(transition(
                network,
                dapp,
                RegistrationState::Rejected("Signature is not valid".to_string()),
            ));
        }
        transition(network, dapp, RegistrationState::SignatureChecked);

        let info = chain
            .registered_dapp(dapp)
            .await
            .map_err(|e| StakingError::from_chain("registered dapp", e))?
            .ok_or_else(|| {
                StakingError::Validation(format!(
                    "Dapp {} is not registered with developer {}",
                    dapp, sender
                ))
            })?;
        transition(network, dapp, RegistrationState::RegistrationChecked);

        let state = if info.state != DappState::Registered {
            RegistrationState::Rejected(format!("Dapp {} is in state {}", dapp, info.state))
        } else if info.developer != sender {
            RegistrationState::Rejected(format!(
                "Dapp {} is registered with developer {}, not {}",
                dapp, info.developer, sender
            ))
        } else {
            RegistrationState::Approved
        };
        Ok(transition(network, dapp, state))
    }
}

/// A signed `DappsStaking.register` extrinsic is submitted on the developer's behalf.
#[derive(Debug, Clone)]
pub struct SubmissionRegistration {
    /// Hex characters preceding the wrapped call inside an `EthCall.call` argument.
    pub eth_call_prefix_hex_chars: usize,
}

impl SubmissionRegistration {
    /// Resolve the call to authorize, unwrapping an `EthCall.call` proxy.
    async fn inner_call<C: ChainApi>(&self, chain: &C, call: DecodedCall) -> StakingResult<DecodedCall> {
        if !call.is("EthCall", "call") {
            return Ok(call);
        }

        let args_hex = hex::encode(&call.args);
        let wrapped = args_hex.get(self.eth_call_prefix_hex_chars..).ok_or_else(|| {
            StakingError::Validation("Wrapped call is shorter than its header".to_string())
        })?;
        chain.call_from_hex(wrapped).await.map_err(invalid_transaction)
    }
}

fn invalid_transaction(error: ChainError) -> StakingError {
    match error {
        ChainError::Decode(reason) => {
            StakingError::Validation(format!("Invalid transaction: {}", reason))
        }
        other => StakingError::from_chain("registration transaction", other),
    }
}

impl RegistrationFlow for SubmissionRegistration {
    async fn authorize<C: ChainApi>(
        &self,
        chain: &C,
        network: NetworkName,
        request: &RegistrationRequest,
    ) -> StakingResult<RegistrationState> {
        let dapp = request.dapp.address.as_str();
        let transaction_hex = required(&request.signed_transaction, "signedTransaction")?;
        transition(network, dapp, RegistrationState::Unvalidated);

        let transaction = chain
            .transaction_from_hex(transaction_hex)
            .await
            .map_err(invalid_transaction)?;
        let call = self.inner_call(chain, transaction.call.clone()).await?;
        if !call.is(STAKING_PALLET, REGISTER_CALL) {
            return Ok(transition(
                network,
                dapp,
                RegistrationState::Rejected(format!(
                    "Transaction calls {}.{}, expected {}.{}",
                    call.section, call.method, STAKING_PALLET, REGISTER_CALL
                )),
            ));
        }
        let requested = SmartContract::parse(dapp)
            .map_err(|e| StakingError::from_chain("dapp address", e))?;
        let (_, registered) = decode_register_args(&call.args).map_err(invalid_transaction)?;
        if registered != requested {
            return Ok(transition(
                network,
                dapp,
                RegistrationState::Rejected(format!(
                    "Transaction registers contract {}, not {}",
                    registered, dapp
                )),
            ));
        }
        transition(network, dapp, RegistrationState::SignatureChecked);

        let hash = chain
            .send_transaction(&transaction)
            .await
            .map_err(|e| StakingError::from_chain("registration transaction", e))?;
        tracing::info!(
            network = %network,
            dapp = %dapp,
            signer = ?transaction.signer,
            hash = %hash,
            "Registration extrinsic finalized"
        );
        transition(network, dapp, RegistrationState::RegistrationChecked);

        Ok(transition(network, dapp, RegistrationState::Approved))
    }
}

/// Registration flow selected per network by configuration.
#[derive(Debug, Clone)]
pub enum RegistrationStrategy {
    Signature(SignatureRegistration),
    Submission(SubmissionRegistration),
}

impl RegistrationStrategy {
    pub fn from_config(config: &RegistrationConfig) -> Self {
        match config {
            RegistrationConfig::Signature => RegistrationStrategy::Signature(SignatureRegistration),
            RegistrationConfig::Submission {
                eth_call_prefix_hex_chars,
            } => RegistrationStrategy::Submission(SubmissionRegistration {
                eth_call_prefix_hex_chars: *eth_call_prefix_hex_chars,
            }),
        }
    }
}

impl RegistrationFlow for RegistrationStrategy {
    async fn authorize<C: ChainApi>(
        &self,
        chain: &C,
        network: NetworkName,
        request: &RegistrationRequest,
    ) -> StakingResult<RegistrationState> {
        match self {
            RegistrationStrategy::Signature(flow) => flow.authorize(chain, network, request).await,
            RegistrationStrategy::Submission(flow) => flow.authorize(chain, network, request).await,
        }
    }
}
