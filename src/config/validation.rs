//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check listener addresses parse and do not collide
//! - Validate value ranges (timeouts > 0, backoff bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Seed records are not validated here; the first table build does that

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{first} and {second} share address {address}")]
    AddressInUse {
        first: &'static str,
        second: &'static str,
        address: SocketAddr,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("reload.backoff_base_ms ({base}) exceeds reload.backoff_max_ms ({max})")]
    BackoffBounds { base: u64, max: u64 },
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut addresses = vec![
        ("listener.router_address", &config.listener.router_address),
        ("listener.admin_address", &config.listener.admin_address),
    ];
    if config.listener.upstream_enabled {
        addresses.push(("listener.upstream_address", &config.listener.upstream_address));
    }
    if config.observability.metrics_enabled {
        addresses.push(("observability.metrics_address", &config.observability.metrics_address));
    }

    let mut seen: HashMap<SocketAddr, &'static str> = HashMap::new();
    for (field, value) in addresses {
        match value.parse::<SocketAddr>() {
            // Port 0 asks the OS for a fresh port, so it never collides
            Ok(addr) if addr.port() == 0 => {}
            Ok(addr) => {
                if let Some(first) = seen.insert(addr, field) {
                    errors.push(ValidationError::AddressInUse {
                        first,
                        second: field,
                        address: addr,
                    });
                }
            }
            Err(_) => errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            }),
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.reload.backoff_base_ms == 0 {
        errors.push(ValidationError::Zero("reload.backoff_base_ms"));
    }
    if config.reload.backoff_base_ms > config.reload.backoff_max_ms {
        errors.push(ValidationError::BackoffBounds {
            base: config.reload.backoff_base_ms,
            max: config.reload.backoff_max_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.router_address = "not-an-address".into();
        config.listener.admin_address = config.listener.upstream_address.clone();
        config.timeouts.upstream_secs = 0;
        config.reload.backoff_base_ms = 60_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.contains(&ValidationError::Zero("timeouts.upstream_secs")));
        assert!(matches!(errors[0], ValidationError::InvalidAddress { field: "listener.router_address", .. }));
    }

    #[test]
    fn test_ephemeral_ports_never_collide() {
        let mut config = ServiceConfig::default();
        config.listener.router_address = "127.0.0.1:0".into();
        config.listener.admin_address = "127.0.0.1:0".into();
        config.listener.upstream_address = "127.0.0.1:0".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_disabled_upstream_address_ignored() {
        let mut config = ServiceConfig::default();
        config.listener.upstream_enabled = false;
        config.listener.upstream_address = config.listener.router_address.clone();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
