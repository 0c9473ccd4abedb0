//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default network is configured)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that HTTP deadlines outlast the chain deadlines they wrap
//! - Detect duplicate networks
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ApiConfig, NetworkName};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.server.register_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.register_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if config.networks.is_empty() {
        errors.push(ValidationError::new("networks", "at least one network is required"));
    }

    let mut seen = HashSet::new();
    for (i, network) in config.networks.iter().enumerate() {
        let prefix = format!("networks[{}]", i);

        if !seen.insert(network.name) {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                format!("network '{}' is configured more than once", network.name),
            ));
        }
        if network.rpc_urls.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.rpc_urls", prefix),
                "at least one RPC URL is required",
            ));
        }
        for url_str in &network.rpc_urls {
            match url::Url::parse(url_str) {
                Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
                Ok(url) => errors.push(ValidationError::new(
                    format!("{}.rpc_urls", prefix),
                    format!("'{}' uses scheme '{}', expected ws or wss", url_str, url.scheme()),
                )),
                Err(e) => errors.push(ValidationError::new(
                    format!("{}.rpc_urls", prefix),
                    format!("'{}' is not a URL: {}", url_str, e),
                )),
            }
        }
        if network.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.rpc_timeout_secs", prefix),
                "must be greater than zero",
            ));
        }
        if network.finalization_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.finalization_timeout_secs", prefix),
                "must be greater than zero",
            ));
        }
        if config.server.request_timeout_secs <= network.rpc_timeout_secs {
            errors.push(ValidationError::new(
                "server.request_timeout_secs",
                format!(
                    "must exceed {}.rpc_timeout_secs ({}s)",
                    prefix, network.rpc_timeout_secs
                ),
            ));
        }
        if network.registration.is_some()
            && config.server.register_timeout_secs <= network.finalization_timeout_secs
        {
            errors.push(ValidationError::new(
                "server.register_timeout_secs",
                format!(
                    "must exceed {}.finalization_timeout_secs ({}s)",
                    prefix, network.finalization_timeout_secs
                ),
            ));
        }
    }

    match config.default_network.parse::<NetworkName>() {
        Ok(name) if seen.contains(&name) => {}
        Ok(name) => errors.push(ValidationError::new(
            "default_network",
            format!("network '{}' has no [[networks]] entry", name),
        )),
        Err(e) => errors.push(ValidationError::new("default_network", e.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
