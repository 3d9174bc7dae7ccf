//! Host header → virtual host lookup.
//!
//! # Responsibilities
//! - Normalise host names (lowercase, port stripped, IPv6 aware)
//! - Exact lookup with a default vhost fallback
//!
//! # Design Decisions
//! - No wildcard host names; lookup is a single hash lookup
//! - Default is the first vhost without host names, else the first vhost

use std::collections::HashMap;
use std::sync::Arc;

/// Lowercase a host and strip its port.
///
/// `[::1]:8080` and `[::1]` both become `::1`; a bare IPv6 address is kept whole.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let stripped = if let Some(rest) = host.strip_prefix('[') {
        rest.split_once(']').map_or(rest, |(addr, _)| addr)
    } else {
        match host.rsplit_once(':') {
            Some((name, port))
                if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                name
            }
            _ => host,
        }
    };
    stripped.trim_end_matches('.').to_ascii_lowercase()
}

/// Immutable host → vhost map.
#[derive(Debug)]
pub struct VhostSelector<T> {
    by_host: HashMap<String, Arc<T>>,
    default: Arc<T>,
}

impl<T> VhostSelector<T> {
    /// Build from `(hostnames, vhost)` pairs in declaration order.
    ///
    /// Returns `None` when `vhosts` is empty. On duplicate host names the
    /// first declaration wins; validation rejects those beforehand.
    pub fn new<I>(vhosts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Vec<String>, T)>,
    {
        let mut by_host = HashMap::new();
        let mut first = None;
        let mut default = None;

        for (hostnames, vhost) in vhosts {
            let vhost = Arc::new(vhost);
            if first.is_none() {
                first = Some(Arc::clone(&vhost));
            }
            if hostnames.is_empty() && default.is_none() {
                default = Some(Arc::clone(&vhost));
            }
            for hostname in hostnames {
                by_host
                    .entry(normalize_host(&hostname))
                    .or_insert_with(|| Arc::clone(&vhost));
            }
        }

        Some(Self {
            by_host,
            default: default.or(first)?,
        })
    }

    /// The vhost for a request `Host` header value.
    pub fn select(&self, host: Option<&str>) -> &Arc<T> {
        host.and_then(|h| self.by_host.get(&normalize_host(h)))
            .unwrap_or(&self.default)
    }

    pub fn default_vhost(&self) -> &Arc<T> {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.by_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }
}
