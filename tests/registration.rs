//! Registration flows driven through the staking service.

use std::sync::Arc;

use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};
use sp_core::{sr25519, Pair};

use staking_api::chain::{DappInfo, DappState, DecodedCall, Transaction, TransactionError};
use staking_api::config::{NetworkName, RegistrationConfig};
use staking_api::staking::{RegistrationRequest, StakingError};

mod common;

use common::{dapp, service_with, MockChain, REGISTER_PAYLOAD};

const DAPP_ADDRESS: &str = "0x1cee94a11eaf390b67aa346e9dda3019dfad4f6a";

fn alice() -> sr25519::Pair {
    sr25519::Pair::from_string("//Alice", None).unwrap()
}

fn ss58(pair: &sr25519::Pair) -> String {
    AccountId32::from(pair.public()).to_ss58check_with_version(Ss58AddressFormat::custom(5))
}

fn signed_request(pair: &sr25519::Pair) -> RegistrationRequest {
    let message = hex::decode(REGISTER_PAYLOAD.trim_start_matches("0x")).unwrap();
    RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        sender_address: Some(ss58(pair)),
        signature: Some(format!("0x{}", hex::encode(pair.sign(&message)))),
        signed_transaction: None,
    }
}

/// `DappsStaking.register(developer, Evm(contract))` arguments.
fn register_args(contract: &str) -> Vec<u8> {
    let mut args = <[u8; 32]>::from(AccountId32::from(alice().public())).to_vec();
    args.push(0x00);
    args.extend(hex::decode(contract.trim_start_matches("0x")).unwrap());
    args
}

fn register_call() -> DecodedCall {
    DecodedCall {
        section: "DappsStaking".to_string(),
        method: "register".to_string(),
        args: register_args(DAPP_ADDRESS),
    }
}

fn submitted(address: &str) -> RegistrationRequest {
    RegistrationRequest {
        dapp: dapp(address),
        signed_transaction: Some("0x4502".to_string()),
        ..Default::default()
    }
}

fn transaction(call: DecodedCall) -> Transaction {
    Transaction {
        signer: Some("ajYMsCKsEAhEvHpeA4XqsfiA9v1CdzZPrCfS6pEfeGHW9j8".to_string()),
        call,
        bytes: vec![0x45, 0x02],
    }
}

fn submission() -> Option<RegistrationConfig> {
    Some(RegistrationConfig::Submission {
        eth_call_prefix_hex_chars: 10,
    })
}

#[tokio::test]
async fn test_signed_registration_is_stored() {
    let sender = ss58(&alice());
    let chain = Arc::new(MockChain::with_registered(&sender));
    let (service, registry) = service_with(Arc::clone(&chain), Some(RegistrationConfig::Signature));

    let request = signed_request(&alice());
    let record = service.register_dapp("shibuya", request.clone()).await.unwrap();

    assert_eq!(record.item, request.dapp);
    assert_eq!(record.network, NetworkName::Shibuya);
    assert_eq!(registry.puts(), vec![(request.dapp, NetworkName::Shibuya)]);
    assert_eq!(
        chain.payload_requests.lock().unwrap().as_slice(),
        &[(DAPP_ADDRESS.to_string(), sender)]
    );

    let stored = service.get_dapp("shibuya", DAPP_ADDRESS).await.unwrap().unwrap();
    assert_eq!(stored.item.name, "Flipper");
    assert_eq!(chain.registered_reads(), 1);
}

#[tokio::test]
async fn test_unregistered_dapp_names_dapp_and_developer() {
    let chain = Arc::new(MockChain::healthy());
    let (service, registry) = service_with(chain, Some(RegistrationConfig::Signature));

    let request = signed_request(&alice());
    let err = service.register_dapp("shibuya", request).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains(DAPP_ADDRESS), "{}", message);
    assert!(message.contains(&ss58(&alice())), "{}", message);
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_bad_signature_never_writes() {
    let chain = Arc::new(MockChain::with_registered(&ss58(&alice())));
    let (service, registry) = service_with(Arc::clone(&chain), Some(RegistrationConfig::Signature));

    let bob = sr25519::Pair::from_string("//Bob", None).unwrap();
    let mut request = signed_request(&bob);
    request.sender_address = Some(ss58(&alice()));

    let err = service.register_dapp("shibuya", request).await.unwrap_err();
    assert!(matches!(err, StakingError::Validation(ref m) if m == "Signature is not valid"));
    assert!(registry.puts().is_empty());
    assert_eq!(chain.registered_reads(), 0);
}

#[tokio::test]
async fn test_other_developer_is_rejected() {
    let bob = sr25519::Pair::from_string("//Bob", None).unwrap();
    let chain = Arc::new(MockChain::with_registered(&ss58(&bob)));
    let (service, registry) = service_with(chain, Some(RegistrationConfig::Signature));

    let err = service
        .register_dapp("shibuya", signed_request(&alice()))
        .await
        .unwrap_err();
    assert!(matches!(err, StakingError::Validation(_)));
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_unregistered_state_is_rejected() {
    let chain = Arc::new(MockChain {
        registered: Some(DappInfo {
            developer: ss58(&alice()),
            state: DappState::Unregistered(12),
        }),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(chain, Some(RegistrationConfig::Signature));

    assert!(service
        .register_dapp("shibuya", signed_request(&alice()))
        .await
        .is_err());
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_validation_error() {
    let chain = Arc::new(MockChain::healthy());
    let (service, _) = service_with(Arc::clone(&chain), Some(RegistrationConfig::Signature));

    let mut request = signed_request(&alice());
    request.signature = None;

    let err = service.register_dapp("shibuya", request).await.unwrap_err();
    assert_eq!(err.to_string(), "signature is required");
    assert!(chain.payload_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submitted_register_extrinsic_is_stored() {
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(register_call())),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(Arc::clone(&chain), submission());

    let request = RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        signed_transaction: Some("0x4502".to_string()),
        ..Default::default()
    };
    service.register_dapp("shibuya", request).await.unwrap();

    assert_eq!(chain.sent().len(), 1);
    assert_eq!(registry.puts().len(), 1);
}

#[tokio::test]
async fn test_eth_call_wrapper_is_unwrapped() {
    let mut inner = vec![0x22, 0x00];
    inner.extend(register_args(DAPP_ADDRESS));
    let mut wrapper_args = vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee];
    wrapper_args.extend_from_slice(&inner);
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(DecodedCall {
            section: "EthCall".to_string(),
            method: "call".to_string(),
            args: wrapper_args,
        })),
        wrapped_call: Some(register_call()),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(Arc::clone(&chain), submission());

    let request = RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        signed_transaction: Some("0x4502".to_string()),
        ..Default::default()
    };
    service.register_dapp("shibuya", request).await.unwrap();

    assert_eq!(chain.decoded_calls.lock().unwrap().as_slice(), &[hex::encode(&inner)]);
    assert_eq!(chain.sent().len(), 1);
    assert_eq!(registry.puts().len(), 1);
}

#[tokio::test]
async fn test_register_extrinsic_for_other_contract_is_rejected() {
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(register_call())),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(Arc::clone(&chain), submission());

    let other = "0x00000000000000000000000000000000000000aa";
    let err = service.register_dapp("shibuya", submitted(other)).await.unwrap_err();

    assert!(matches!(err, StakingError::Validation(_)));
    assert!(err.to_string().contains(DAPP_ADDRESS), "{}", err);
    assert!(chain.sent().is_empty());
    assert!(registry.puts().is_empty());
    assert!(service.get_dapp("shibuya", other).await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_extrinsic_with_malformed_args_is_rejected() {
    let mut call = register_call();
    call.args = vec![0x00, 0x01];
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(call)),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(Arc::clone(&chain), submission());

    let err = service
        .register_dapp("shibuya", submitted(DAPP_ADDRESS))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Invalid transaction"), "{}", err);
    assert!(chain.sent().is_empty());
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_non_register_extrinsic_is_not_submitted() {
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(DecodedCall {
            section: "Balances".to_string(),
            method: "transfer".to_string(),
            args: vec![],
        })),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(Arc::clone(&chain), submission());

    let request = RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        signed_transaction: Some("0x4502".to_string()),
        ..Default::default()
    };
    let err = service.register_dapp("shibuya", request).await.unwrap_err();

    assert!(err.to_string().contains("Balances.transfer"));
    assert!(chain.sent().is_empty());
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_failed_extrinsic_surfaces_dispatch_error() {
    let chain = Arc::new(MockChain {
        transaction: Some(transaction(register_call())),
        send_error: Some(TransactionError::Module {
            section: "dappsStaking".to_string(),
            name: "AlreadyRegisteredContract".to_string(),
        }),
        ..MockChain::healthy()
    });
    let (service, registry) = service_with(chain, submission());

    let request = RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        signed_transaction: Some("0x4502".to_string()),
        ..Default::default()
    };
    let err = service.register_dapp("shibuya", request).await.unwrap_err();

    assert_eq!(err.to_string(), "dappsStaking.AlreadyRegisteredContract");
    assert!(registry.puts().is_empty());
}

#[tokio::test]
async fn test_undecodable_extrinsic_is_validation_error() {
    let chain = Arc::new(MockChain::healthy());
    let (service, _) = service_with(chain, submission());

    let request = RegistrationRequest {
        dapp: dapp(DAPP_ADDRESS),
        signed_transaction: Some("0xzz".to_string()),
        ..Default::default()
    };
    let err = service.register_dapp("shibuya", request).await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid transaction"));
}

#[tokio::test]
async fn test_registration_requires_supported_network() {
    let chain = Arc::new(MockChain::with_registered(&ss58(&alice())));

    let (service, _) = service_with(Arc::clone(&chain), None);
    let err = service
        .register_dapp("shibuya", signed_request(&alice()))
        .await
        .unwrap_err();
    assert!(matches!(err, StakingError::UnsupportedNetwork(_)));

    let (service, registry) = service_with(chain, Some(RegistrationConfig::Signature));
    let err = service
        .register_dapp("polkadot", signed_request(&alice()))
        .await
        .unwrap_err();
    assert!(matches!(err, StakingError::UnsupportedNetwork(ref n) if n == "polkadot"));
    assert!(registry.puts().is_empty());
}
