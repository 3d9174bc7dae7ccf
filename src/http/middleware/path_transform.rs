//! URL prefix handling.
//!
//! # Responsibilities
//! - Redirect a request for a bare prefix to `prefix/`
//! - Strip the prefix so routing sees paths relative to it
//! - Answer 404 for paths outside every configured prefix
//! - Record the untouched path as [`OriginalPath`]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, uri::PathAndQuery, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::{BoxHandler, OriginalPath};
use crate::routing::path::{clean_url_path, has_url_prefix_dir, strip_base};
use crate::vhost::context::VhostContext;

/// Characters escaped when a stripped path is written back into the URI.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What to do with a request path given the configured prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// No prefixes configured.
    Unchanged,
    /// Path equals a prefix without its trailing slash.
    Redirect(String),
    /// Path lies under a prefix; carries the remaining path.
    Strip(String),
    /// Path lies outside every prefix.
    NotFound,
}

/// Decide how a raw (still percent-encoded) request path is transformed.
pub fn transform(raw_path: &str, prefixes: &[String]) -> Transform {
    if prefixes.is_empty() {
        return Transform::Unchanged;
    }
    let decoded = percent_decode_str(raw_path).decode_utf8_lossy();
    let cleaned = clean_url_path(&decoded);

    for prefix in prefixes {
        if decoded == prefix.as_str() {
            return Transform::Redirect(format!("{prefix}/"));
        }
        if has_url_prefix_dir(&cleaned, prefix) {
            let rest = strip_base(&cleaned, prefix);
            let rest = if rest.is_empty() { "/" } else { rest };
            return Transform::Strip(rest.to_string());
        }
    }
    Transform::NotFound
}

fn rewrite_path(uri: &Uri, path: &str) -> Option<Uri> {
    let encoded = utf8_percent_encode(path, PATH_ESCAPE).to_string();
    let path_and_query = match uri.query() {
        Some(query) => format!("{encoded}?{query}"),
        None => encoded,
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

fn redirect(location: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(q) => format!("{location}?{q}"),
        None => location.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub fn wrap(inner: BoxHandler, vhost: Arc<VhostContext>) -> BoxHandler {
    Arc::new(move |mut request: Request<Body>| -> BoxFuture<'static, Response> {
        let original = request.uri().path().to_string();
        request.extensions_mut().insert(OriginalPath(original.clone()));

        match transform(&original, vhost.prefixes()) {
            Transform::Unchanged => inner(request),
            Transform::Redirect(location) => {
                let response = redirect(&location, request.uri().query());
                Box::pin(async move { response })
            }
            Transform::NotFound => {
                tracing::debug!(path = %original, "Request outside configured prefixes");
                Box::pin(async { StatusCode::NOT_FOUND.into_response() })
            }
            Transform::Strip(rest) => match rewrite_path(request.uri(), &rest) {
                Some(uri) => {
                    *request.uri_mut() = uri;
                    inner(request)
                }
                None => Box::pin(async { StatusCode::BAD_REQUEST.into_response() }),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::VhostConfig;
    use crate::http::middleware::test_support::{get, parts};
    use crate::http::middleware::{compose, PIPELINE};

    fn prefixes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_transform() {
        let p = prefixes(&["/files", "/pub"]);
        assert_eq!(transform("/x", &[]), Transform::Unchanged);
        assert_eq!(transform("/files", &p), Transform::Redirect("/files/".into()));
        assert_eq!(transform("/files/", &p), Transform::Strip("/".into()));
        assert_eq!(transform("/files/a/b", &p), Transform::Strip("/a/b".into()));
        assert_eq!(transform("/pub/my%20doc", &p), Transform::Strip("/my doc".into()));
        assert_eq!(transform("/filesystem", &p), Transform::NotFound);
        assert_eq!(transform("/files/../etc", &p), Transform::NotFound);
    }

    #[test]
    fn test_rewrite_keeps_query_and_escapes() {
        let uri: Uri = "/files/a?x=1".parse().unwrap();
        let rewritten = rewrite_path(&uri, "/my doc#1").unwrap();
        assert_eq!(rewritten.path(), "/my%20doc%231");
        assert_eq!(rewritten.query(), Some("x=1"));
    }

    fn handler() -> BoxHandler {
        let vhost = VhostContext::from_config(&VhostConfig {
            prefix_urls: vec!["/files".into()],
            ..Default::default()
        })
        .unwrap();
        compose(&PIPELINE, &parts(vhost, vec![]))
    }

    #[tokio::test]
    async fn test_bare_prefix_redirects() {
        let response = handler()(get("/files?sort=name")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/files/?sort=name");
    }

    #[tokio::test]
    async fn test_outside_prefix_is_404() {
        let response = handler()(get("/other/a.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prefix_root_routes_to_root() {
        let response = handler()(get("/files/")).await;
        assert_eq!(response.headers()["x-url-path"], "/");
        assert_eq!(response.headers()["x-original-path"], "/files/");
    }
}
