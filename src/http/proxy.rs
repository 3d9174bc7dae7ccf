//! Upstream forwarding for proxied routes.
//!
//! # Responsibilities
//! - Forward a request to the URL computed by the router
//! - Strip hop-by-hop headers in both directions
//! - Stream the upstream body back to the client
//!
//! # Design Decisions
//! - Two clients: one verifying certificates, one for `ignore_bad_cert` rules
//! - Request bodies are buffered up to a configured limit
//! - Dropping the response future aborts the upstream request

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::schema::ProxyClientConfig;
use crate::routing::router::ProxyTarget;

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    let fixed = [
        header::CONNECTION,
        header::HOST,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ];
    for name in fixed.iter().chain(listed.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// HTTP client used for proxied routes.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    strict: reqwest::Client,
    insecure: reqwest::Client,
    max_body_bytes: usize,
}

impl ProxyClient {
    pub fn new(config: &ProxyClientConfig, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let builder = || {
            reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .no_proxy()
                .redirect(reqwest::redirect::Policy::none())
        };
        Ok(Self {
            strict: builder().build()?,
            insecure: builder().danger_accept_invalid_certs(true).build()?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Forward `request` to `target`, returning the upstream response.
    pub async fn forward(&self, request: Request<Body>, target: &ProxyTarget) -> Response {
        let url = target.forward_url(request.uri().query());
        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(upstream = %url, error = %e, "Request body rejected");
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        };

        let mut headers = parts.headers;
        let host = headers.get(header::HOST).cloned();
        strip_hop_by_hop(&mut headers);
        if let Some(host) = host {
            headers.insert(HeaderName::from_static("x-forwarded-host"), host);
        }

        let client = if target.ignore_bad_cert {
            &self.insecure
        } else {
            &self.strict
        };

        tracing::debug!(method = %parts.method, upstream = %url, "Forwarding request");
        let upstream = client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        match upstream {
            Ok(resp) => {
                let status = resp.status();
                let mut headers = resp.headers().clone();
                strip_hop_by_hop(&mut headers);

                let mut response = Response::new(Body::from_stream(resp.bytes_stream()));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(e) => {
                tracing::error!(upstream = %url, error = %e, "Upstream request failed");
                let status = if e.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, "Upstream request failed").into_response()
            }
        }
    }
}
