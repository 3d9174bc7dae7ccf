//! Alias and proxy resolution.
//!
//! # Responsibilities
//! - Store the aliases and proxy rules of one virtual host
//! - Resolve a request path to a local alias or a shadowing proxy
//! - Expose fallback proxy lookup for the leaf handler's retry
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Shadowing proxies are consulted strictly before aliases
//! - A path with no alias is an invariant violation, not a 404

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyMode, VhostConfig};
use crate::routing::matcher::{most_specific, MatchKind, UrlMatcher};
use crate::routing::path::{clean_url_path, strip_base};

/// Errors raised while building or querying a [`Router`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("proxy target {target:?} for {url:?} is not a valid http(s) URL")]
    InvalidTarget { url: String, target: String },

    #[error("no alias matches {path:?}; the root alias is missing")]
    NoAlias { path: String },
}

/// A URL path served from a filesystem directory or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    matcher: UrlMatcher,
    fs_path: PathBuf,
}

impl Alias {
    pub fn new(url: &str, fs_path: impl Into<PathBuf>, kind: MatchKind) -> Self {
        Self {
            matcher: UrlMatcher::new(url, kind),
            fs_path: fs_path.into(),
        }
    }

    pub fn url_path(&self) -> &str {
        self.matcher.url()
    }

    pub fn fs_path(&self) -> &Path {
        &self.fs_path
    }

    /// Filesystem location for a clean request path this alias matches.
    fn resolve(&self, path: &str) -> PathBuf {
        let rest = strip_base(path, self.matcher.url()).trim_start_matches('/');
        if rest.is_empty() {
            self.fs_path.clone()
        } else {
            self.fs_path.join(rest)
        }
    }
}

/// A URL path forwarded to a remote upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    matcher: UrlMatcher,
    target: Url,
    shadowing: bool,
    ignore_bad_cert: bool,
}

impl ProxyRule {
    pub fn new(url: &str, target: &str, shadowing: bool, ignore_bad_cert: bool) -> Result<Self, RoutingError> {
        let invalid = || RoutingError::InvalidTarget {
            url: url.to_string(),
            target: target.to_string(),
        };
        let parsed = Url::parse(target).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid());
        }
        Ok(Self {
            matcher: UrlMatcher::new(url, MatchKind::Ancestor),
            target: parsed,
            shadowing,
            ignore_bad_cert,
        })
    }

    pub fn url_path(&self) -> &str {
        self.matcher.url()
    }

    pub fn is_shadowing(&self) -> bool {
        self.shadowing
    }

    fn target_for(&self, path: &str) -> ProxyTarget {
        ProxyTarget {
            rule_url: self.matcher.url().to_string(),
            base: self.target.clone(),
            rest: strip_base(path, self.matcher.url()).to_string(),
            ignore_bad_cert: self.ignore_bad_cert,
        }
    }
}

/// A resolved upstream for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    /// URL path of the rule that matched.
    pub rule_url: String,
    /// Configured upstream URL.
    pub base: Url,
    /// Request path below the rule URL, empty when the request hit the rule URL itself.
    pub rest: String,
    pub ignore_bad_cert: bool,
}

impl ProxyTarget {
    /// Upstream URL to forward to, carrying the request query string.
    pub fn forward_url(&self, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if !self.rest.is_empty() {
            let path = format!("{}{}", self.base.path().trim_end_matches('/'), self.rest);
            url.set_path(&path);
        }
        url.set_query(query);
        url
    }
}

/// Which kind of backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    ShadowProxy,
    FallbackProxy,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::ShadowProxy => "shadow_proxy",
            BackendKind::FallbackProxy => "fallback_proxy",
        }
    }
}

/// Outcome of routing one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Serve from the filesystem below an alias.
    Local { alias_url: String, fs_path: PathBuf },
    /// Forward to an upstream.
    Proxy { kind: BackendKind, target: ProxyTarget },
}

impl RoutingDecision {
    pub fn backend(&self) -> BackendKind {
        match self {
            RoutingDecision::Local { .. } => BackendKind::Local,
            RoutingDecision::Proxy { kind, .. } => *kind,
        }
    }

    pub fn fs_path(&self) -> Option<&Path> {
        match self {
            RoutingDecision::Local { fs_path, .. } => Some(fs_path),
            RoutingDecision::Proxy { .. } => None,
        }
    }

    /// Turn a fallback target into a decision, used after local not-found.
    pub fn fallback(target: ProxyTarget) -> Self {
        RoutingDecision::Proxy {
            kind: BackendKind::FallbackProxy,
            target,
        }
    }
}

/// Immutable per-vhost router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    aliases: Vec<Alias>,
    shadowing: Vec<ProxyRule>,
    fallback: Vec<ProxyRule>,
}

impl Router {
    /// Build a router from explicit rules, keeping declaration order.
    pub fn new(aliases: Vec<Alias>, proxies: Vec<ProxyRule>) -> Self {
        let (shadowing, fallback): (Vec<_>, Vec<_>) = proxies.into_iter().partition(|p| p.shadowing);
        Self {
            aliases,
            shadowing,
            fallback,
        }
    }

    /// Build the router of a virtual host.
    ///
    /// The root alias is synthesised from `root` unless an alias for `/` is
    /// configured. Every invalid proxy target is reported.
    pub fn from_config(config: &VhostConfig) -> Result<Self, Vec<RoutingError>> {
        let mut aliases = Vec::with_capacity(config.aliases.len() + 1);
        let has_root = config
            .aliases
            .iter()
            .any(|a| clean_url_path(&a.url) == "/");
        if !has_root {
            aliases.push(Alias::new("/", &config.root, MatchKind::Ancestor));
        }
        for alias in &config.aliases {
            let kind = if alias.exact {
                MatchKind::Exact
            } else {
                MatchKind::Ancestor
            };
            aliases.push(Alias::new(&alias.url, &alias.path, kind));
        }

        let mut proxies = Vec::with_capacity(config.proxies.len());
        let mut errors = Vec::new();
        for proxy in &config.proxies {
            let shadowing = proxy.mode == ProxyMode::Always;
            match ProxyRule::new(&proxy.url, &proxy.target, shadowing, proxy.ignore_bad_cert) {
                Ok(rule) => proxies.push(rule),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        warn_shadowed(aliases.iter().map(Alias::url_path), "alias");
        warn_shadowed(proxies.iter().filter(|p| p.shadowing).map(ProxyRule::url_path), "shadowing proxy");
        warn_shadowed(proxies.iter().filter(|p| !p.shadowing).map(ProxyRule::url_path), "fallback proxy");
        Ok(Self::new(aliases, proxies))
    }

    /// Resolve a request path to its backend.
    pub fn resolve(&self, path: &str) -> Result<RoutingDecision, RoutingError> {
        let path = clean_url_path(path);

        if let Some(rule) = most_specific(&self.shadowing, &path, |r| &r.matcher) {
            return Ok(RoutingDecision::Proxy {
                kind: BackendKind::ShadowProxy,
                target: rule.target_for(&path),
            });
        }

        let alias = most_specific(&self.aliases, &path, |a| &a.matcher).ok_or_else(|| {
            RoutingError::NoAlias {
                path: path.to_string(),
            }
        })?;

        Ok(RoutingDecision::Local {
            alias_url: alias.url_path().to_string(),
            fs_path: alias.resolve(&path),
        })
    }

    /// Fallback upstream for a path whose local lookup reported not-found.
    pub fn resolve_fallback(&self, path: &str) -> Option<ProxyTarget> {
        let path = clean_url_path(path);
        most_specific(&self.fallback, &path, |r| &r.matcher).map(|rule| rule.target_for(&path))
    }

    /// Names of the immediate children of `path` that exist only as alias mount points.
    pub fn child_aliases(&self, path: &str) -> Vec<String> {
        let path = clean_url_path(path);
        let mut names: Vec<String> = Vec::new();
        for alias in &self.aliases {
            if !alias.matcher.is_successor_of(&path) {
                continue;
            }
            let rest = strip_base(alias.url_path(), &path).trim_start_matches('/');
            let name = rest.split('/').next().unwrap_or(rest);
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }
}

/// Later rules on an already declared URL can never match.
fn warn_shadowed<'a>(urls: impl Iterator<Item = &'a str>, kind: &'static str) {
    let mut seen: Vec<&str> = Vec::new();
    for url in urls {
        if seen.contains(&url) {
            tracing::warn!(url = %url, kind = kind, "Duplicate rule URL, keeping the first declared");
        } else {
            seen.push(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(proxies: Vec<ProxyRule>) -> Router {
        Router::new(
            vec![
                Alias::new("/", "/srv/a", MatchKind::Ancestor),
                Alias::new("/docs", "/srv/b", MatchKind::Ancestor),
            ],
            proxies,
        )
    }

    #[test]
    fn test_alias_round_trip() {
        let router = router(vec![]);
        for alias in router.aliases() {
            let decision = router.resolve(alias.url_path()).unwrap();
            assert_eq!(decision.fs_path(), Some(alias.fs_path()));
        }
    }

    #[test]
    fn test_specific_alias_wins_over_root() {
        let router = router(vec![]);
        let decision = router.resolve("/docs/readme").unwrap();
        assert_eq!(
            decision,
            RoutingDecision::Local {
                alias_url: "/docs".into(),
                fs_path: PathBuf::from("/srv/b/readme"),
            }
        );

        let decision = router.resolve("/other/file.txt").unwrap();
        assert_eq!(decision.fs_path(), Some(Path::new("/srv/a/other/file.txt")));
    }

    #[test]
    fn test_exact_alias_does_not_cover_children() {
        let router = Router::new(
            vec![
                Alias::new("/", "/srv/a", MatchKind::Ancestor),
                Alias::new("/robots.txt", "/etc/robots.txt", MatchKind::Exact),
            ],
            vec![],
        );
        let decision = router.resolve("/robots.txt").unwrap();
        assert_eq!(decision.fs_path(), Some(Path::new("/etc/robots.txt")));
        let decision = router.resolve("/robots.txt/x").unwrap();
        assert_eq!(decision.fs_path(), Some(Path::new("/srv/a/robots.txt/x")));
    }

    #[test]
    fn test_shadowing_proxy_beats_specific_alias() {
        let shadow = ProxyRule::new("/docs", "http://remote/doc", true, false).unwrap();
        let router = router(vec![shadow]);
        let decision = router.resolve("/docs/readme").unwrap();
        assert_eq!(decision.backend(), BackendKind::ShadowProxy);
        match decision {
            RoutingDecision::Proxy { target, .. } => {
                assert_eq!(target.forward_url(None).as_str(), "http://remote/doc/readme");
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_shadowing_root_proxy_beats_exact_alias() {
        let shadow = ProxyRule::new("/", "http://remote/", true, false).unwrap();
        let router = router(vec![shadow]);
        assert_eq!(router.resolve("/docs").unwrap().backend(), BackendKind::ShadowProxy);
    }

    #[test]
    fn test_fallback_proxy_does_not_affect_resolution() {
        let fallback = ProxyRule::new("/missing", "http://remote/", false, true).unwrap();
        let router = router(vec![fallback]);
        let decision = router.resolve("/missing").unwrap();
        assert_eq!(decision.backend(), BackendKind::Local);

        let target = router.resolve_fallback("/missing/x").unwrap();
        assert!(target.ignore_bad_cert);
        assert_eq!(target.forward_url(Some("a=1")).as_str(), "http://remote/x?a=1");
        assert!(router.resolve_fallback("/present").is_none());
    }

    #[test]
    fn test_no_alias_is_reported() {
        let router = Router::new(vec![Alias::new("/docs", "/srv/b", MatchKind::Ancestor)], vec![]);
        assert_eq!(
            router.resolve("/other"),
            Err(RoutingError::NoAlias { path: "/other".into() })
        );
    }

    #[test]
    fn test_invalid_proxy_target() {
        assert!(ProxyRule::new("/x", "not a url", false, false).is_err());
        assert!(ProxyRule::new("/x", "ftp://remote/", false, false).is_err());
    }

    #[test]
    fn test_child_aliases() {
        let router = Router::new(
            vec![
                Alias::new("/", "/srv/a", MatchKind::Ancestor),
                Alias::new("/docs/api", "/srv/api", MatchKind::Ancestor),
                Alias::new("/docs/guide", "/srv/guide", MatchKind::Ancestor),
                Alias::new("/media", "/srv/media", MatchKind::Ancestor),
            ],
            vec![],
        );
        assert_eq!(router.child_aliases("/"), vec!["docs".to_string(), "media".to_string()]);
        assert_eq!(router.child_aliases("/docs"), vec!["api".to_string(), "guide".to_string()]);
        assert!(router.child_aliases("/media").is_empty());
    }
}
