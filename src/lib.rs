//! filegate: a multi-vhost HTTP file-serving gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server (request ID, trace, timeout)
//!                          │
//!                          ▼
//!                      vhost::selector (Host header → VhostContext)
//!                          │
//!                          ▼
//!                      http::middleware
//!                          preprocess → path_transform → multiplex
//!                                                          │
//!                          ┌───────────────────────────────┤
//!                          ▼                               ▼
//!                      routing::router              policy::resolver
//!                      (alias / proxy)              (auth, cors, hide, headers)
//!                          │                               │
//!                          └──────────────┬────────────────┘
//!                                         ▼
//!                                     http::leaf
//!                             file · listing · proxy forward
//!
//!     Cross-cutting: config · security · observability · lifecycle
//! ```
//!
//! All routing and policy state is compiled once from a validated
//! [`GatewayConfig`] and shared read-only between requests.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod policy;
pub mod routing;
pub mod vhost;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::{Gateway, GatewayBuilder};
pub use lifecycle::Shutdown;
