//! Per-path policy subsystem.
//!
//! # Data Flow
//! ```text
//! VhostConfig (startup)
//!     → wildcard.rs (show/hide globs → anchored regex)
//!     → rules.rs (URL/dir keyed feature, restrict and header rules)
//!     → resolver.rs (frozen PolicyResolver)
//!
//! Request (url_path, fs_path, is_dir)
//!     → resolver.rs resolve()
//!     → PolicyDecision
//! ```
//!
//! # Design Decisions
//! - Hide vetoes show
//! - An absent wildcard list is "unrestricted", an all-empty one matches nothing
//! - `Vary` computed once per vhost

pub mod resolver;
pub mod rules;
pub mod visibility;
pub mod wildcard;

pub use resolver::{PolicyDecision, PolicyResolver};
pub use wildcard::{compile_wildcards, CompiledWildcard, PatternError};
