//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Detect hostnames claimed by more than one vhost
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Rule contents (wildcards, users, headers) are checked when the vhost is built

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::path::clean_url_path;
use crate::vhost::selector::normalize_host;

/// A semantic configuration defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no virtual host configured")]
    NoVhosts,

    #[error("hostname {0:?} is claimed by more than one vhost")]
    DuplicateHostname(String),

    #[error("vhost #{vhost}: prefix URL {prefix:?} must be an absolute path other than /")]
    InvalidPrefix { vhost: usize, prefix: String },

    #[error("invalid {field} address {address:?}")]
    InvalidAddress { field: &'static str, address: String },

    #[error("timeout {0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a parsed configuration, reporting every defect.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            address: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            address: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }

    if config.vhosts.is_empty() {
        errors.push(ValidationError::NoVhosts);
    }

    let mut hostnames = HashSet::new();
    for (index, vhost) in config.vhosts.iter().enumerate() {
        for hostname in &vhost.hostnames {
            let host = normalize_host(hostname);
            if !hostnames.insert(host.clone()) {
                errors.push(ValidationError::DuplicateHostname(host));
            }
        }

        for prefix in &vhost.prefix_urls {
            if !prefix.starts_with('/') || clean_url_path(prefix) == "/" {
                errors.push(ValidationError::InvalidPrefix {
                    vhost: index,
                    prefix: prefix.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
