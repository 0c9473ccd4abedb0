//! Extraction of typed values from dynamically decoded storage.

use subxt::ext::scale_value::{At, Primitive, Value, ValueDef};

use crate::chain::types::{ChainError, ChainResult, DappState};

/// Integer held by `value`, looking through single-field wrappers.
pub fn as_u128<T>(value: &Value<T>) -> Option<u128> {
    if let Some(n) = value.as_u128() {
        return Some(n);
    }
    match &value.value {
        ValueDef::Composite(composite) if composite.len() == 1 => {
            composite.values().next().and_then(as_u128)
        }
        _ => None,
    }
}

/// Integer storage entry; an absent entry is an error, never zero.
pub fn require_u128<T>(value: Option<&Value<T>>, entry: &'static str) -> ChainResult<u128> {
    let value = value.ok_or(ChainError::MissingStorage(entry))?;
    as_u128(value).ok_or_else(|| ChainError::Decode(format!("{} is not an integer", entry)))
}

/// Named integer field of a composite.
pub fn field_u128<T>(value: &Value<T>, name: &'static str) -> ChainResult<u128> {
    value
        .at(name)
        .and_then(as_u128)
        .ok_or_else(|| ChainError::Decode(format!("missing integer field `{}`", name)))
}

/// Perbill field of a composite as a fraction in `[0, 1]`.
pub fn field_perbill<T>(value: &Value<T>, name: &'static str) -> ChainResult<f64> {
    field_u128(value, name).map(|parts| parts as f64 / 1_000_000_000.0)
}

/// Flatten a (possibly nested) composite of bytes.
pub fn bytes_of<T>(value: &Value<T>) -> Option<Vec<u8>> {
    match &value.value {
        ValueDef::Composite(composite) => {
            let mut out = Vec::with_capacity(composite.len());
            for item in composite.values() {
                match &item.value {
                    ValueDef::Primitive(Primitive::U128(byte)) => {
                        out.push(u8::try_from(*byte).ok()?)
                    }
                    _ => out.extend(bytes_of(item)?),
                }
            }
            Some(out)
        }
        _ => None,
    }
}

/// Account id stored in the named field.
pub fn field_account<T>(value: &Value<T>, name: &'static str) -> ChainResult<[u8; 32]> {
    value
        .at(name)
        .and_then(bytes_of)
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .ok_or_else(|| ChainError::Decode(format!("field `{}` is not an account id", name)))
}

/// Dapp state variant stored in the named field.
pub fn field_dapp_state<T>(value: &Value<T>, name: &'static str) -> ChainResult<DappState> {
    let state = value
        .at(name)
        .ok_or_else(|| ChainError::Decode(format!("missing field `{}`", name)))?;

    match &state.value {
        ValueDef::Variant(variant) if variant.name == "Registered" => Ok(DappState::Registered),
        ValueDef::Variant(variant) if variant.name == "Unregistered" => {
            let era = variant
                .values
                .values()
                .next()
                .and_then(as_u128)
                .and_then(|era| u32::try_from(era).ok())
                .ok_or_else(|| ChainError::Decode("unregistered era missing".to_string()))?;
            Ok(DappState::Unregistered(era))
        }
        ValueDef::Variant(variant) => Err(ChainError::Decode(format!(
            "unknown dapp state `{}`",
            variant.name
        ))),
        _ => Err(ChainError::Decode(format!("field `{}` is not a variant", name))),
    }
}
