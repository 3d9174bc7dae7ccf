//! Per-vhost routing and policy bundle.
//!
//! # Responsibilities
//! - Build credentials, policy rules and router of one vhost from config
//! - Report every defect of the vhost at once
//!
//! # Design Decisions
//! - Built once at startup, shared through `Arc`, never mutated
//! - Filesystem paths (root, aliases, dir-keyed rules) are made absolute and
//!   cleaned before anything is compiled, so dir rules compare like with like

use std::path::Path;

use crate::config::schema::VhostConfig;
use crate::error::GatewayError;
use crate::policy::resolver::PolicyResolver;
use crate::routing::path::{absolutize_fs_path, clean_url_path};
use crate::routing::router::Router;
use crate::security::credentials::CredentialStore;

/// Everything a request needs once its virtual host is known.
#[derive(Debug, Clone, Default)]
pub struct VhostContext {
    hostnames: Vec<String>,
    prefixes: Vec<String>,
    credentials: CredentialStore,
    policy: PolicyResolver,
    router: Router,
}

impl VhostContext {
    pub fn new(
        hostnames: Vec<String>,
        prefixes: Vec<String>,
        credentials: CredentialStore,
        policy: PolicyResolver,
        router: Router,
    ) -> Self {
        Self {
            hostnames,
            prefixes: prefixes
                .iter()
                .map(|p| clean_url_path(p).into_owned())
                .collect(),
            credentials,
            policy,
            router,
        }
    }

    /// Compile a vhost, gathering credential, pattern, header and routing errors.
    ///
    /// Relative filesystem paths are resolved against the working directory.
    pub fn from_config(config: &VhostConfig) -> Result<Self, Vec<GatewayError>> {
        let cwd = std::env::current_dir().map_err(|e| vec![GatewayError::Io(e)])?;
        Self::from_config_in(config, &cwd)
    }

    /// [`VhostContext::from_config`] with relative paths resolved against `base`.
    pub fn from_config_in(config: &VhostConfig, base: &Path) -> Result<Self, Vec<GatewayError>> {
        let config = &absolutize_fs_paths(config, base);
        let mut errors: Vec<GatewayError> = Vec::new();

        let credentials = CredentialStore::from_users(&config.users, config.user_match_case)
            .map_err(|errs| errors.extend(errs.into_iter().map(GatewayError::Credential)))
            .ok();
        let policy = PolicyResolver::from_config(config)
            .map_err(|errs| errors.extend(errs))
            .ok();
        let router = Router::from_config(config)
            .map_err(|errs| errors.extend(errs.into_iter().map(GatewayError::Routing)))
            .ok();

        match (credentials, policy, router) {
            (Some(credentials), Some(policy), Some(router)) if errors.is_empty() => Ok(Self::new(
                config.hostnames.clone(),
                config.prefix_urls.clone(),
                credentials,
                policy,
                router,
            )),
            _ => Err(errors),
        }
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    /// Normalised URL prefixes stripped before routing.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn policy(&self) -> &PolicyResolver {
        &self.policy
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Copy of `config` with every filesystem path absolute and cleaned.
fn absolutize_fs_paths(config: &VhostConfig, base: &Path) -> VhostConfig {
    let abs = |path: &Path| absolutize_fs_path(path, base);
    let abs_str = |path: &str| abs(Path::new(path)).to_string_lossy().into_owned();

    let mut config = config.clone();
    config.root = abs(config.root.as_path());
    for alias in &mut config.aliases {
        alias.path = abs(&alias.path);
    }
    for feature in [&mut config.auth, &mut config.cors, &mut config.archive, &mut config.upload] {
        for dir in &mut feature.dirs {
            *dir = abs(dir.as_path());
        }
    }
    for rule in &mut config.restrict_access.dirs {
        rule.path = abs_str(&rule.path);
    }
    for rule in &mut config.headers.dirs {
        rule.path = abs_str(&rule.path);
    }
    config
}
