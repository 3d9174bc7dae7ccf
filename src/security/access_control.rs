//! Referer/Origin based access restriction.
//!
//! A restricted path only answers requests whose `Referer` (or, failing that,
//! `Origin`) points at the request host itself or at one of the allowed hosts.
//! Requests carrying neither header are let through.

use axum::http::{header, HeaderMap};
use url::Url;

/// Host (with port, if any) of the page that triggered the request.
fn source_host(headers: &HeaderMap) -> Option<Result<String, ()>> {
    let raw = headers
        .get(header::REFERER)
        .or_else(|| headers.get(header::ORIGIN))?;
    let parsed = raw
        .to_str()
        .ok()
        .and_then(|s| Url::parse(s).ok())
        .and_then(|url| {
            let host = url.host_str()?.to_ascii_lowercase();
            Some(match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        });
    Some(parsed.ok_or(()))
}

fn host_matches(source: &str, allowed: &str) -> bool {
    let allowed = allowed.to_ascii_lowercase();
    if source == allowed {
        return true;
    }
    // An allowed entry without a port accepts any port.
    !allowed.contains(':')
        && source
            .rsplit_once(':')
            .is_some_and(|(host, _)| host == allowed)
}

/// Decide whether a request may access a restricted path.
pub fn is_access_allowed(headers: &HeaderMap, request_host: &str, allowed_hosts: &[String]) -> bool {
    let source = match source_host(headers) {
        None => return true,
        Some(Err(())) => {
            tracing::debug!("Unparseable Referer/Origin on restricted path");
            return false;
        }
        Some(Ok(source)) => source,
    };

    let allowed = host_matches(&source, request_host)
        || allowed_hosts.iter().any(|h| host_matches(&source, h));
    if !allowed {
        tracing::debug!(source = %source, host = %request_host, "Cross-site access denied");
    }
    allowed
}
