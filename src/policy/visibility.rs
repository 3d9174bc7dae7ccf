//! Show/hide filtering of directory entries.
//!
//! Hide is a veto: an entry matched by a hide pattern is never shown, even
//! if a show pattern also matches it. When show patterns relevant to the
//! entry kind are configured, the entry must match one of them as well.

use crate::config::schema::VisibilityConfig;
use crate::policy::wildcard::{compile_wildcards, CompiledWildcard, PatternError};

#[derive(Debug, Clone, Default)]
pub struct VisibilityFilter {
    shows: Option<CompiledWildcard>,
    show_dirs: Option<CompiledWildcard>,
    show_files: Option<CompiledWildcard>,
    hides: Option<CompiledWildcard>,
    hide_dirs: Option<CompiledWildcard>,
    hide_files: Option<CompiledWildcard>,
}

impl VisibilityFilter {
    /// Compile all six lists, reporting every bad pattern across them.
    pub fn from_config(config: &VisibilityConfig) -> Result<Self, Vec<PatternError>> {
        let mut errors = Vec::new();
        let mut compile = |list: &Option<Vec<String>>| match compile_wildcards(list.as_deref()) {
            Ok(compiled) => compiled,
            Err(mut errs) => {
                errors.append(&mut errs);
                None
            }
        };

        let filter = Self {
            shows: compile(&config.shows),
            show_dirs: compile(&config.show_dirs),
            show_files: compile(&config.show_files),
            hides: compile(&config.hides),
            hide_dirs: compile(&config.hide_dirs),
            hide_files: compile(&config.hide_files),
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(filter)
    }

    pub fn is_visible(&self, name: &str, is_dir: bool) -> bool {
        let (show_kind, hide_kind) = if is_dir {
            (&self.show_dirs, &self.hide_dirs)
        } else {
            (&self.show_files, &self.hide_files)
        };

        let matched = |wc: &Option<CompiledWildcard>| wc.as_ref().is_some_and(|wc| wc.is_match(name));

        if matched(&self.hides) || matched(hide_kind) {
            return false;
        }

        if self.shows.is_none() && show_kind.is_none() {
            return true;
        }
        matched(&self.shows) || matched(show_kind)
    }

    /// True when no list is configured at all.
    pub fn is_unrestricted(&self) -> bool {
        [
            &self.shows,
            &self.show_dirs,
            &self.show_files,
            &self.hides,
            &self.hide_dirs,
            &self.hide_files,
        ]
        .iter()
        .all(|wc| wc.is_none())
    }
}
