//! Per-request policy resolution.
//!
//! # Responsibilities
//! - Compile a vhost's rule sets once at startup
//! - Answer every policy for a `(url_path, fs_path, is_dir)` triple
//! - Derive the vhost-wide `Vary` value
//!
//! Policies are evaluated independently; none of them share mutable state.

use std::path::Path;

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::VhostConfig;
use crate::error::GatewayError;
use crate::policy::rules::{HeaderRules, PathRule, RestrictAccessRules};
use crate::policy::visibility::VisibilityFilter;

const VARY_BASE: &str = "accept-encoding";
const VARY_RESTRICTED: &str = "accept-encoding, referer, origin";

/// Policies in effect for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub visible: bool,
    pub auth_required: bool,
    pub cors_enabled: bool,
    pub restrict_access: bool,
    /// Source hosts allowed besides the request host, when restricted.
    pub allowed_hosts: Vec<String>,
    pub archive_enabled: bool,
    pub upload_enabled: bool,
    /// Headers to append, in application order.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
    pub vary: &'static str,
}

/// Compiled policy rules of one virtual host.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    visibility: VisibilityFilter,
    auth: PathRule,
    cors: PathRule,
    archive: PathRule,
    upload: PathRule,
    restrict: RestrictAccessRules,
    headers: HeaderRules,
    vary: &'static str,
}

impl PolicyResolver {
    /// Compile every rule set, reporting all pattern and header errors together.
    pub fn from_config(config: &VhostConfig) -> Result<Self, Vec<GatewayError>> {
        let mut errors: Vec<GatewayError> = Vec::new();

        let visibility = VisibilityFilter::from_config(&config.visibility).unwrap_or_else(|errs| {
            errors.extend(errs.into_iter().map(GatewayError::Pattern));
            VisibilityFilter::default()
        });
        let headers = HeaderRules::from_config(&config.headers).unwrap_or_else(|errs| {
            errors.extend(errs.into_iter().map(GatewayError::Header));
            HeaderRules::default()
        });
        if !errors.is_empty() {
            return Err(errors);
        }

        let restrict = RestrictAccessRules::from_config(&config.restrict_access);
        let vary = if restrict.is_configured() {
            VARY_RESTRICTED
        } else {
            VARY_BASE
        };

        Ok(Self {
            visibility,
            auth: PathRule::from_config(&config.auth),
            cors: PathRule::from_config(&config.cors),
            archive: PathRule::from_config(&config.archive),
            upload: PathRule::from_config(&config.upload),
            restrict,
            headers,
            vary,
        })
    }

    /// Resolve all policies for a normalised URL path.
    ///
    /// `fs_path` is `None` for proxied resources; directory-keyed rules then
    /// never apply.
    pub fn resolve(&self, url_path: &str, fs_path: Option<&Path>, is_dir: bool) -> PolicyDecision {
        let allowed = self.restrict.resolve(url_path, fs_path);
        PolicyDecision {
            visible: self.is_path_visible(url_path, is_dir),
            auth_required: self.auth.applies(url_path, fs_path),
            cors_enabled: self.cors.applies(url_path, fs_path),
            restrict_access: allowed.is_some(),
            allowed_hosts: allowed.unwrap_or_default(),
            archive_enabled: self.archive.applies(url_path, fs_path),
            upload_enabled: self.upload.applies(url_path, fs_path),
            extra_headers: self.headers.resolve(url_path, fs_path),
            vary: self.vary,
        }
    }

    /// A path is visible when every segment of it is.
    fn is_path_visible(&self, url_path: &str, is_dir: bool) -> bool {
        if self.visibility.is_unrestricted() {
            return true;
        }
        let segments: Vec<&str> = url_path.split('/').filter(|s| !s.is_empty()).collect();
        segments.iter().enumerate().all(|(i, name)| {
            let last = i + 1 == segments.len();
            self.visibility.is_visible(name, if last { is_dir } else { true })
        })
    }

    pub fn vary(&self) -> &'static str {
        self.vary
    }

    pub fn visibility(&self) -> &VisibilityFilter {
        &self.visibility
    }
}
