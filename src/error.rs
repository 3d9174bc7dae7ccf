//! Crate-wide error taxonomy.
//!
//! Startup builds every vhost completely and gathers all defects into one
//! [`GatewayError::Build`] so an operator can fix everything in one pass.

use std::fmt;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::policy::rules::HeaderRuleError;
use crate::policy::wildcard::PatternError;
use crate::routing::router::RoutingError;
use crate::security::credentials::CredentialError;

/// Errors that can occur while building or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A show/hide wildcard failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Duplicate users or undecodable secrets.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Invalid alias or proxy rule.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Invalid extra header rule.
    #[error(transparent)]
    Header(#[from] HeaderRuleError),

    /// Defects of one virtual host, identified by its position in the config.
    #[error("vhost #{index}: {}", DisplayList(.errors))]
    Vhost { index: usize, errors: Vec<GatewayError> },

    /// Every defect found while building the gateway.
    #[error("{} error(s): {}", .0.len(), DisplayList(.0))]
    Build(Vec<GatewayError>),

    /// The upstream HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Listener or TLS I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Wrap collected errors, or succeed when there are none.
    pub fn check(errors: Vec<GatewayError>) -> Result<(), GatewayError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Build(errors))
        }
    }

    /// Number of leaf defects, looking through vhost and build groups.
    pub fn count(&self) -> usize {
        match self {
            GatewayError::Vhost { errors, .. } | GatewayError::Build(errors) => {
                errors.iter().map(GatewayError::count).sum()
            }
            _ => 1,
        }
    }
}

struct DisplayList<'a>(&'a [GatewayError]);

impl fmt::Display for DisplayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}
