//! URL rule matching and specificity.
//!
//! # Responsibilities
//! - Match a normalised request path against a configured URL
//! - Rank competing matches so the most specific rule wins
//!
//! # Design Decisions
//! - One tagged matcher (`Exact` / `Ancestor`) instead of a trait object per kind
//! - Path matching is case-sensitive
//! - Exact beats ancestor, longer ancestor beats shorter, first declared wins ties
//! - No regex: matching is O(len) string comparison

use crate::routing::path::{clean_url_path, is_clean_ancestor};

/// How a configured URL is compared with request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Only the URL itself.
    Exact,
    /// The URL itself and everything below it.
    Ancestor,
}

/// Rank of a successful match. Greater is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    /// Matched as a directory ancestor; carries the length of the matched URL.
    Ancestor(usize),
    /// Matched the request path exactly.
    Exact,
}

/// A configured URL path together with its match kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatcher {
    url: String,
    kind: MatchKind,
}

impl UrlMatcher {
    /// Create a matcher. The URL is normalised once here.
    pub fn new(url: &str, kind: MatchKind) -> Self {
        Self {
            url: clean_url_path(url).into_owned(),
            kind,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    /// Specificity of the match against a normalised request path, if any.
    ///
    /// Every matcher matches its own URL exactly, whatever its kind.
    pub fn specificity(&self, path: &str) -> Option<Specificity> {
        if self.url == path {
            return Some(Specificity::Exact);
        }
        match self.kind {
            MatchKind::Exact => None,
            MatchKind::Ancestor => {
                is_clean_ancestor(&self.url, path).then_some(Specificity::Ancestor(self.url.len()))
            }
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.specificity(path).is_some()
    }

    /// True when this matcher's URL lies strictly below `path`.
    pub fn is_successor_of(&self, path: &str) -> bool {
        is_clean_ancestor(path, &self.url)
    }
}

/// Select the most specific rule matching `path`.
///
/// Ties keep the earliest rule in iteration order.
pub fn most_specific<'a, T, I, F>(rules: I, path: &str, matcher: F) -> Option<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &UrlMatcher,
{
    let mut best: Option<(Specificity, &'a T)> = None;
    for rule in rules {
        let Some(spec) = matcher(rule).specificity(path) else {
            continue;
        };
        match best {
            Some((current, _)) if current >= spec => {}
            _ => best = Some((spec, rule)),
        }
    }
    best.map(|(_, rule)| rule)
}
