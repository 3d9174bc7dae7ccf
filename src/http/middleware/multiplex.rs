//! Routing and policy dispatch.
//!
//! # Responsibilities
//! - Resolve the backend for the (already stripped) request path
//! - Stat local resources and switch to a fallback proxy when missing
//! - Resolve the policy bundle and attach a [`RequestContext`]
//! - Record request metrics per backend kind

use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use super::{BoxHandler, RequestContext};
use crate::observability::metrics;
use crate::routing::path::decode_url_path;
use crate::routing::router::RoutingDecision;
use crate::vhost::context::VhostContext;

/// Compute routing and policy decisions for a normalised path.
///
/// Local resources are looked up on disk; when missing, a matching fallback
/// proxy takes over.
pub async fn route(vhost: &Arc<VhostContext>, url_path: String) -> Result<RequestContext, Response> {
    let mut routing = vhost.router().resolve(&url_path).map_err(|e| {
        tracing::error!(path = %url_path, error = %e, "Routing invariant violated");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })?;

    let mut metadata = None;
    if let RoutingDecision::Local { fs_path, .. } = &routing {
        match tokio::fs::metadata(fs_path).await {
            Ok(meta) => metadata = Some(meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(target) = vhost.router().resolve_fallback(&url_path) {
                    tracing::debug!(path = %url_path, upstream = %target.base, "Local miss, using fallback proxy");
                    routing = RoutingDecision::fallback(target);
                }
            }
            Err(e) => {
                tracing::warn!(path = %fs_path.display(), error = %e, "Failed to stat local resource");
            }
        }
    }

    let is_dir = metadata.as_ref().is_some_and(|m| m.is_dir());
    let policy = vhost.policy().resolve(&url_path, routing.fs_path(), is_dir);

    Ok(RequestContext {
        vhost: Arc::clone(vhost),
        url_path,
        routing,
        policy,
        metadata,
    })
}

pub fn wrap(inner: BoxHandler, vhost: Arc<VhostContext>) -> BoxHandler {
    Arc::new(move |mut request: Request<Body>| -> BoxFuture<'static, Response> {
        let inner = Arc::clone(&inner);
        let vhost = Arc::clone(&vhost);
        Box::pin(async move {
            let start = Instant::now();
            let url_path = decode_url_path(request.uri().path());

            let ctx = match route(&vhost, url_path).await {
                Ok(ctx) => ctx,
                Err(response) => {
                    metrics::record_request("none", response.status().as_u16(), start);
                    return response;
                }
            };

            let backend = ctx.routing.backend().as_str();
            tracing::debug!(
                method = %request.method(),
                path = %ctx.url_path,
                backend = backend,
                auth = ctx.policy.auth_required,
                "Request routed"
            );
            request.extensions_mut().insert(ctx);

            let response = inner(request).await;
            metrics::record_request(backend, response.status().as_u16(), start);
            response
        })
    })
}
