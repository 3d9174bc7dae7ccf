//! Basic-Auth challenge handling.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};

use crate::security::credentials::CredentialStore;

/// Credentials supplied in an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Outcome of checking a request against a credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Allow,
    Deny,
}

/// Extract Basic-Auth credentials, if present and well-formed.
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Verify the request's Basic-Auth credentials.
pub fn authenticate(store: &CredentialStore, headers: &HeaderMap) -> AuthVerdict {
    match parse_basic_auth(headers) {
        Some(creds) if store.verify(&creds.username, &creds.password) => AuthVerdict::Allow,
        Some(creds) => {
            tracing::debug!(username = %creds.username, "Basic auth rejected");
            AuthVerdict::Deny
        }
        None => AuthVerdict::Deny,
    }
}

/// A 401 response asking the client for credentials.
pub fn challenge() -> Response<Body> {
    let mut response = Response::new(Body::from("Unauthorized"));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"files\", charset=\"UTF-8\""),
    );
    response
}
