//! Signature verification for Substrate accounts.
//!
//! Accepts sr25519, ed25519, and ecdsa signatures, raw or prefixed with the
//! `MultiSignature` variant byte. Browser wallets sign the message wrapped in
//! `<Bytes>…</Bytes>`, so both forms are checked.

use sp_core::crypto::AccountId32;
use sp_core::hashing::blake2_256;
use sp_core::{ecdsa, ed25519, sr25519, Pair};

use crate::chain::types::{decode_hex, parse_account};

const WRAP_PREFIX: &[u8] = b"<Bytes>";
const WRAP_SUFFIX: &[u8] = b"</Bytes>";

/// Signature schemes in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Sr25519,
    Ed25519,
    Ecdsa,
}

/// Verify `signature_hex` over `message` for the account at `address`.
///
/// Malformed addresses or signatures verify as false.
pub fn verify(message: &[u8], signature_hex: &str, address: &str) -> bool {
    verify_scheme(message, signature_hex, address).is_some()
}

/// Like [`verify`], returning the scheme that matched.
pub fn verify_scheme(message: &[u8], signature_hex: &str, address: &str) -> Option<Scheme> {
    let account = parse_account(address).ok()?;
    let signature = decode_hex(signature_hex).ok()?;

    let wrapped = [WRAP_PREFIX, message, WRAP_SUFFIX].concat();
    let scheme = [message, wrapped.as_slice()]
        .into_iter()
        .find_map(|candidate| verify_raw(candidate, &signature, &account));
    scheme
}

fn verify_raw(message: &[u8], signature: &[u8], account: &AccountId32) -> Option<Scheme> {
    let public: &[u8; 32] = account.as_ref();

    if let Ok(raw) = <[u8; 64]>::try_from(signature) {
        if verify_sr25519(message, raw, public) {
            return Some(Scheme::Sr25519);
        }
        if verify_ed25519(message, raw, public) {
            return Some(Scheme::Ed25519);
        }
    }
    if let Ok(raw) = <[u8; 65]>::try_from(signature) {
        if verify_ecdsa(message, raw, public) {
            return Some(Scheme::Ecdsa);
        }
    }

    // MultiSignature: 0 = ed25519, 1 = sr25519, 2 = ecdsa.
    match signature.split_first()? {
        (0, rest) => {
            let raw = <[u8; 64]>::try_from(rest).ok()?;
            verify_ed25519(message, raw, public).then_some(Scheme::Ed25519)
        }
        (1, rest) => {
            let raw = <[u8; 64]>::try_from(rest).ok()?;
            verify_sr25519(message, raw, public).then_some(Scheme::Sr25519)
        }
        (2, rest) => {
            let raw = <[u8; 65]>::try_from(rest).ok()?;
            verify_ecdsa(message, raw, public).then_some(Scheme::Ecdsa)
        }
        _ => None,
    }
}

fn verify_sr25519(message: &[u8], signature: [u8; 64], public: &[u8; 32]) -> bool {
    sr25519::Pair::verify(
        &sr25519::Signature::from_raw(signature),
        message,
        &sr25519::Public::from_raw(*public),
    )
}

fn verify_ed25519(message: &[u8], signature: [u8; 64], public: &[u8; 32]) -> bool {
    ed25519::Pair::verify(
        &ed25519::Signature::from_raw(signature),
        message,
        &ed25519::Public::from_raw(*public),
    )
}

/// Ecdsa accounts are the blake2-256 hash of the compressed public key.
fn verify_ecdsa(message: &[u8], signature: [u8; 65], account: &[u8; 32]) -> bool {
    ecdsa::Signature::from_raw(signature)
        .recover(message)
        .map(|public| &blake2_256(public.as_ref()) == account)
        .unwrap_or(false)
}
