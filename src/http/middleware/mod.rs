//! Middleware composition.
//!
//! # Data Flow
//! ```text
//! Request (vhost already selected)
//!     → preprocess.rs      operator middlewares in order, may short-circuit
//!     → path_transform.rs  prefix redirect / strip, OriginalPath recorded
//!     → multiplex.rs       router + policy → RequestContext, metrics
//!     → LeafHandler        executes the decisions
//! ```
//!
//! # Design Decisions
//! - The stage order is the [`PIPELINE`] constant, applied once per vhost at startup
//! - Each stage is a function from inner handler to outer handler
//! - Preprocess runs outermost so it always sees the original path

pub mod multiplex;
pub mod path_transform;
pub mod preprocess;

use std::fs::Metadata;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use crate::policy::resolver::PolicyDecision;
use crate::routing::router::RoutingDecision;
use crate::vhost::context::VhostContext;

/// A composed request handler.
pub type BoxHandler = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// One layer of the per-vhost pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    PathTransform,
    Multiplex,
}

/// Stage order, outermost first.
pub const PIPELINE: [Stage; 3] = [Stage::Preprocess, Stage::PathTransform, Stage::Multiplex];

/// Result of an operator middleware.
pub enum Flow {
    /// Hand the (possibly modified) request to the next stage.
    Continue(Request<Body>),
    /// Answer the client directly; inner stages never run.
    Respond(Response),
}

/// An operator supplied middleware run before path transformation.
pub trait PreMiddleware: Send + Sync + 'static {
    fn process<'a>(&'a self, request: Request<Body>) -> BoxFuture<'a, Flow>;
}

/// Request path as received, before prefix stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPath(pub String);

/// Decisions computed for one request, handed to the leaf.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub vhost: Arc<VhostContext>,
    /// Normalised path after prefix stripping.
    pub url_path: String,
    pub routing: RoutingDecision,
    pub policy: PolicyDecision,
    /// Filesystem metadata for local resources that exist.
    pub metadata: Option<Metadata>,
}

impl RequestContext {
    pub fn is_dir(&self) -> bool {
        self.metadata.as_ref().is_some_and(Metadata::is_dir)
    }
}

/// Executes routing and policy decisions: serves files, forwards to upstreams.
pub trait LeafHandler: Send + Sync + 'static {
    fn handle<'a>(&'a self, request: Request<Body>, ctx: RequestContext) -> BoxFuture<'a, Response>;
}

/// Everything the stages of one vhost are built from.
#[derive(Clone)]
pub struct PipelineParts {
    pub vhost: Arc<VhostContext>,
    pub pre: Arc<[Arc<dyn PreMiddleware>]>,
    pub leaf: Arc<dyn LeafHandler>,
}

impl Stage {
    /// Wrap `inner` with this stage.
    pub fn wrap(self, inner: BoxHandler, parts: &PipelineParts) -> BoxHandler {
        match self {
            Stage::Preprocess => preprocess::wrap(inner, Arc::clone(&parts.pre)),
            Stage::PathTransform => path_transform::wrap(inner, Arc::clone(&parts.vhost)),
            Stage::Multiplex => multiplex::wrap(inner, Arc::clone(&parts.vhost)),
        }
    }
}

/// Build the handler of one vhost by applying `stages`, innermost last.
pub fn compose(stages: &[Stage], parts: &PipelineParts) -> BoxHandler {
    let mut handler = leaf_entry(Arc::clone(&parts.leaf));
    for stage in stages.iter().rev() {
        handler = stage.wrap(handler, parts);
    }
    handler
}

/// Terminal handler: takes the [`RequestContext`] left by multiplex and calls the leaf.
fn leaf_entry(leaf: Arc<dyn LeafHandler>) -> BoxHandler {
    Arc::new(move |mut request: Request<Body>| -> BoxFuture<'static, Response> {
        let leaf = Arc::clone(&leaf);
        Box::pin(async move {
            match request.extensions_mut().remove::<RequestContext>() {
                Some(ctx) => leaf.handle(request, ctx).await,
                None => {
                    tracing::error!(path = %request.uri().path(), "Leaf reached without routing context");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        })
    })
}
