//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::security::credentials::Encoding;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream forwarding settings.
    pub proxy: ProxyClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Virtual hosts, selected by the request `Host` header.
    pub vhosts: Vec<VhostConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            proxy: ProxyClientConfig::default(),
            observability: ObservabilityConfig::default(),
            vhosts: vec![VhostConfig::default()],
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
            shutdown_secs: 10,
        }
    }
}

/// Settings for requests forwarded to upstreams.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyClientConfig {
    /// Largest request body forwarded upstream, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ProxyClientConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One virtual host: its file trees, upstreams and per-path policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VhostConfig {
    /// Host names served by this vhost. Empty marks the default vhost.
    pub hostnames: Vec<String>,

    /// Directory served at `/` unless an alias for `/` is configured.
    pub root: PathBuf,

    /// URL prefixes stripped before routing, e.g. `/files`.
    pub prefix_urls: Vec<String>,

    pub aliases: Vec<AliasConfig>,

    pub proxies: Vec<ProxyRuleConfig>,

    pub auth: FeatureConfig,
    pub cors: FeatureConfig,
    pub archive: FeatureConfig,
    pub upload: FeatureConfig,

    pub restrict_access: RestrictAccessConfig,

    pub headers: HeadersConfig,

    pub visibility: VisibilityConfig,

    /// Basic-Auth users, across all encodings.
    pub users: Vec<UserConfig>,

    /// Compare usernames case-sensitively.
    pub user_match_case: bool,
}

impl Default for VhostConfig {
    fn default() -> Self {
        Self {
            hostnames: Vec::new(),
            root: PathBuf::from("."),
            prefix_urls: Vec::new(),
            aliases: Vec::new(),
            proxies: Vec::new(),
            auth: FeatureConfig::default(),
            cors: FeatureConfig::default(),
            archive: FeatureConfig::default(),
            upload: FeatureConfig::default(),
            restrict_access: RestrictAccessConfig::default(),
            headers: HeadersConfig::default(),
            visibility: VisibilityConfig::default(),
            users: Vec::new(),
            user_match_case: false,
        }
    }
}

/// Maps a URL path to a filesystem path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AliasConfig {
    pub url: String,
    pub path: PathBuf,

    /// Match only the URL itself, not the paths below it.
    #[serde(default)]
    pub exact: bool,
}

/// When a proxy rule is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Only when the local resource is not found.
    #[default]
    Fallback,
    /// Always, shadowing local resources.
    Always,
}

/// Forwards a URL path to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyRuleConfig {
    pub url: String,

    /// Upstream URL, e.g. `http://remote/doc`.
    pub target: String,

    #[serde(default)]
    pub mode: ProxyMode,

    /// Accept invalid upstream TLS certificates.
    #[serde(default)]
    pub ignore_bad_cert: bool,
}

/// A feature enabled globally, for URL subtrees or for directory subtrees.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FeatureConfig {
    pub global: bool,
    pub urls: Vec<String>,
    pub dirs: Vec<PathBuf>,
}

/// Referer/Origin based access restriction.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RestrictAccessConfig {
    /// Restrict every path, allowing these source hosts besides the request host.
    pub global: Option<Vec<String>>,
    pub urls: Vec<PathHostsConfig>,
    pub dirs: Vec<PathHostsConfig>,
}

/// Allowed source hosts for one path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathHostsConfig {
    pub path: String,
    #[serde(default)]
    pub hosts: Vec<String>,
}

/// Extra response headers keyed by URL or directory.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeadersConfig {
    pub urls: Vec<PathHeadersConfig>,
    pub dirs: Vec<PathHeadersConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathHeadersConfig {
    pub path: String,
    pub headers: Vec<HeaderEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Show/hide wildcards applied to entry names.
///
/// A missing list means "no restriction"; a present list whose entries are
/// all empty matches nothing.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VisibilityConfig {
    pub shows: Option<Vec<String>>,
    pub show_dirs: Option<Vec<String>>,
    pub show_files: Option<Vec<String>>,
    pub hides: Option<Vec<String>>,
    pub hide_dirs: Option<Vec<String>>,
    pub hide_files: Option<Vec<String>>,
}

/// A Basic-Auth user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,

    /// The password, in the representation named by `encoding`.
    pub password: String,

    #[serde(default)]
    pub encoding: Encoding,
}
