//! Path-keyed policy rules.
//!
//! Every rule is keyed by either a URL path or a filesystem directory. A rule
//! applies to its key and to everything below it.

use std::path::{Path, PathBuf};

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{FeatureConfig, HeadersConfig, PathHostsConfig, RestrictAccessConfig};
use crate::routing::path::{clean_url_path, has_fs_prefix_dir, is_clean_ancestor};

/// Key of a path rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// A normalised URL path.
    Url(String),
    /// A filesystem directory.
    Dir(PathBuf),
}

impl PathPattern {
    pub fn url(url: &str) -> Self {
        PathPattern::Url(clean_url_path(url).into_owned())
    }

    pub fn dir(dir: impl Into<PathBuf>) -> Self {
        PathPattern::Dir(dir.into())
    }

    /// `url_path` must be normalised; proxied requests have no `fs_path`.
    pub fn matches(&self, url_path: &str, fs_path: Option<&Path>) -> bool {
        match self {
            PathPattern::Url(url) => url == url_path || is_clean_ancestor(url, url_path),
            PathPattern::Dir(dir) => fs_path.is_some_and(|fs| has_fs_prefix_dir(fs, dir)),
        }
    }
}

/// A feature switched on globally or for some paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRule {
    global: bool,
    patterns: Vec<PathPattern>,
}

impl PathRule {
    pub fn new(global: bool, patterns: Vec<PathPattern>) -> Self {
        Self { global, patterns }
    }

    pub fn from_config(config: &FeatureConfig) -> Self {
        let patterns = config
            .urls
            .iter()
            .map(|u| PathPattern::url(u))
            .chain(config.dirs.iter().map(PathPattern::dir))
            .collect();
        Self::new(config.global, patterns)
    }

    /// True if the rule can be on for any path.
    pub fn is_configured(&self) -> bool {
        self.global || !self.patterns.is_empty()
    }

    pub fn applies(&self, url_path: &str, fs_path: Option<&Path>) -> bool {
        self.global || self.patterns.iter().any(|p| p.matches(url_path, fs_path))
    }
}

/// Access restriction rules with their allowed source hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictAccessRules {
    global: Option<Vec<String>>,
    rules: Vec<(PathPattern, Vec<String>)>,
}

impl RestrictAccessRules {
    pub fn from_config(config: &RestrictAccessConfig) -> Self {
        let url_rules = config
            .urls
            .iter()
            .map(|r: &PathHostsConfig| (PathPattern::url(&r.path), r.hosts.clone()));
        let dir_rules = config
            .dirs
            .iter()
            .map(|r| (PathPattern::dir(&r.path), r.hosts.clone()));
        Self {
            global: config.global.clone(),
            rules: url_rules.chain(dir_rules).collect(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.global.is_some() || !self.rules.is_empty()
    }

    /// Allowed source hosts if the path is restricted, `None` otherwise.
    pub fn resolve(&self, url_path: &str, fs_path: Option<&Path>) -> Option<Vec<String>> {
        let mut restricted = self.global.is_some();
        let mut hosts: Vec<String> = self.global.clone().unwrap_or_default();
        for (pattern, allowed) in &self.rules {
            if pattern.matches(url_path, fs_path) {
                restricted = true;
                for host in allowed {
                    if !hosts.contains(host) {
                        hosts.push(host.clone());
                    }
                }
            }
        }
        restricted.then_some(hosts)
    }
}

/// A header rule whose name or value is not valid HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid header {name:?} for {path:?}")]
pub struct HeaderRuleError {
    pub path: String,
    pub name: String,
}

/// One extra response header for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub pattern: PathPattern,
    pub name: HeaderName,
    pub value: HeaderValue,
}

/// Extra response headers, URL-keyed rules first, each group in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRules {
    rules: Vec<HeaderRule>,
}

impl HeaderRules {
    pub fn from_config(config: &HeadersConfig) -> Result<Self, Vec<HeaderRuleError>> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        let keyed = config
            .urls
            .iter()
            .map(|p| (PathPattern::url(&p.path), p))
            .chain(config.dirs.iter().map(|p| (PathPattern::dir(&p.path), p)));

        for (pattern, entry) in keyed {
            for header in &entry.headers {
                let name = HeaderName::from_bytes(header.name.as_bytes());
                let value = HeaderValue::from_str(&header.value);
                match (name, value) {
                    (Ok(name), Ok(value)) => rules.push(HeaderRule {
                        pattern: pattern.clone(),
                        name,
                        value,
                    }),
                    _ => errors.push(HeaderRuleError {
                        path: entry.path.clone(),
                        name: header.name.clone(),
                    }),
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self { rules })
    }

    pub fn resolve(&self, url_path: &str, fs_path: Option<&Path>) -> Vec<(HeaderName, HeaderValue)> {
        self.rules
            .iter()
            .filter(|r| r.pattern.matches(url_path, fs_path))
            .map(|r| (r.name.clone(), r.value.clone()))
            .collect()
    }
}
