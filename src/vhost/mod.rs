//! Virtual host subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig.vhosts[] (startup)
//!     → context.rs (credentials + policy + router per vhost)
//!     → selector.rs (host name map, default vhost)
//!
//! Request Host header
//!     → selector.rs normalize_host() + lookup
//!     → Arc<VhostContext>
//! ```
//!
//! # Design Decisions
//! - Host names compared case-insensitively without port
//! - Unknown hosts fall back to the default vhost rather than failing

pub mod context;
pub mod selector;

pub use context::VhostContext;
pub use selector::{normalize_host, VhostSelector};
