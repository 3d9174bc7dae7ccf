//! Reference leaf handler.
//!
//! # Responsibilities
//! - Enforce restrict-access and Basic-Auth verdicts
//! - Answer CORS preflights and decorate responses (CORS, `Vary`, extra headers)
//! - Serve files and JSON directory listings filtered by visibility
//! - Forward proxied routes through [`ProxyClient`]
//!
//! # Decision Order
//! ```text
//! restrict-access → 403
//! CORS preflight  → 204
//! auth            → 401 challenge
//! hidden          → 404
//! proxy | file | directory | 404
//! ```

use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::BoxFuture;
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::http::middleware::{LeafHandler, RequestContext};
use crate::http::proxy::ProxyClient;
use crate::policy::resolver::PolicyDecision;
use crate::routing::router::RoutingDecision;
use crate::security::access_control::is_access_allowed;
use crate::security::auth::{authenticate, challenge, AuthVerdict};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// JSON body of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub path: String,
    pub entries: Vec<ListingEntry>,
    pub archive: bool,
    pub upload: bool,
}

/// Serves local resources and forwards proxied ones.
#[derive(Debug, Clone)]
pub struct StaticLeaf {
    proxy: ProxyClient,
}

impl StaticLeaf {
    pub fn new(proxy: ProxyClient) -> Self {
        Self { proxy }
    }

    async fn serve(&self, request: Request<Body>, ctx: &RequestContext) -> Response {
        let headers = request.headers();

        if ctx.policy.restrict_access {
            let host = request_host(&request);
            if !is_access_allowed(headers, &host, &ctx.policy.allowed_hosts) {
                return StatusCode::FORBIDDEN.into_response();
            }
        }

        // Browsers never send credentials on a preflight.
        if ctx.policy.cors_enabled && is_preflight(&request) {
            return preflight(headers);
        }

        if ctx.policy.auth_required
            && authenticate(ctx.vhost.credentials(), headers) == AuthVerdict::Deny
        {
            return challenge();
        }

        if !ctx.policy.visible {
            return StatusCode::NOT_FOUND.into_response();
        }

        match &ctx.routing {
            RoutingDecision::Proxy { target, .. } => self.proxy.forward(request, target).await,
            RoutingDecision::Local { fs_path, .. } => {
                if request.method() != Method::GET && request.method() != Method::HEAD {
                    return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response();
                }
                match &ctx.metadata {
                    None => StatusCode::NOT_FOUND.into_response(),
                    Some(meta) if meta.is_dir() => match list_directory(fs_path, ctx).await {
                        Ok(listing) => Json(listing).into_response(),
                        Err(e) => {
                            tracing::warn!(path = %fs_path.display(), error = %e, "Failed to read directory");
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    },
                    Some(_) => serve_file(fs_path, request).await,
                }
            }
        }
    }
}

impl LeafHandler for StaticLeaf {
    fn handle<'a>(&'a self, request: Request<Body>, ctx: RequestContext) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let origin = request.headers().get(header::ORIGIN).cloned();
            let mut response = self.serve(request, &ctx).await;
            decorate(response.headers_mut(), &ctx.policy, origin);
            response
        })
    }
}

/// Host the client addressed, from `Host` or the absolute URI.
fn request_host(request: &Request<Body>) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_preflight(request: &Request<Body>) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

fn preflight(headers: &HeaderMap) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let out = response.headers_mut();
    out.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, POST, PUT, DELETE, OPTIONS"),
    );
    if let Some(requested) = headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
    out.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

/// Apply vhost-wide and path-specific response headers.
fn decorate(headers: &mut HeaderMap, policy: &PolicyDecision, origin: Option<HeaderValue>) {
    headers.append(header::VARY, HeaderValue::from_static(policy.vary));
    if policy.cors_enabled {
        match origin {
            Some(origin) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            None => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
        }
    }
    for (name, value) in &policy.extra_headers {
        headers.append(name.clone(), value.clone());
    }
}

async fn serve_file(fs_path: &Path, request: Request<Body>) -> Response {
    match ServeFile::new(fs_path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// Visible entries of a directory plus alias mount points below it, sorted by name.
async fn list_directory(fs_path: &Path, ctx: &RequestContext) -> std::io::Result<Listing> {
    let visibility = ctx.vhost.policy().visibility();
    let mut entries = Vec::new();

    let mut dir = tokio::fs::read_dir(fs_path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if visibility.is_visible(&name, meta.is_dir()) {
            entries.push(ListingEntry {
                name,
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
    }

    for name in ctx.vhost.router().child_aliases(&ctx.url_path) {
        if visibility.is_visible(&name, true) && !entries.iter().any(|e| e.name == name) {
            entries.push(ListingEntry {
                name,
                is_dir: true,
                size: 0,
            });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Listing {
        path: ctx.url_path.clone(),
        entries,
        archive: ctx.policy.archive_enabled,
        upload: ctx.policy.upload_enabled,
    })
}
