//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request with a resolved PolicyDecision:
//!     → access_control.rs (Referer/Origin against allowed hosts)
//!     → auth.rs (Basic-Auth header → credentials.rs verify)
//!     → Allow | Deny
//! ```
//!
//! # Design Decisions
//! - Credentials loaded and validated once, before the listener starts
//! - Fail closed: an unparseable Referer on a restricted path is denied
//! - A failed login is a verdict, not an error

pub mod access_control;
pub mod auth;
pub mod credentials;

pub use auth::{authenticate, AuthVerdict};
pub use credentials::{CredentialError, CredentialStore, Encoding};
