//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build vhosts → Start listener
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Every vhost is built before the listener binds
//! - TLS shutdown has a grace period: forced close after deadline

pub mod shutdown;

pub use shutdown::Shutdown;
