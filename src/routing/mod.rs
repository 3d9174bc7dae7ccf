//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (prefix already stripped)
//!     → path.rs (normalise, ancestor checks)
//!     → router.rs
//!         1. shadowing proxies   (most specific wins)
//!         2. aliases             (most specific wins)
//!     → RoutingDecision: Local { fs_path } | Proxy { target }
//!
//! Leaf reports not-found:
//!     → router.rs resolve_fallback()
//!     → ProxyTarget or None
//! ```
//!
//! # Design Decisions
//! - Routers compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Exact beats ancestor, longer ancestor beats shorter, first declared breaks ties
//! - Shadowing proxies are checked strictly before aliases

pub mod matcher;
pub mod path;
pub mod router;

pub use matcher::{MatchKind, Specificity, UrlMatcher};
pub use router::{Alias, BackendKind, ProxyRule, ProxyTarget, Router, RoutingDecision, RoutingError};
