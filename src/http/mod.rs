//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → server.rs dispatch (Host header → vhost pipeline)
//!     → middleware/ (preprocess → path transform → multiplex)
//!     → leaf.rs (auth, restrict, headers; file, listing or proxy.rs)
//!     → Send to client
//! ```

pub mod leaf;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use middleware::{Flow, LeafHandler, OriginalPath, PreMiddleware, RequestContext, Stage, PIPELINE};
pub use request::X_REQUEST_ID;
pub use server::{Gateway, GatewayBuilder};
