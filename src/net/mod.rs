//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → plain: tokio TcpListener → axum::serve
//!     → TLS:   tls.rs (load PEM) → axum-server rustls acceptor
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Certificate problems are reported before binding

pub mod tls;
