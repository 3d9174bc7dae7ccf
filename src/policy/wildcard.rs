//! Glob-style wildcard compilation.
//!
//! `*` matches any run of characters, `?` exactly one, everything else is
//! literal. A list of wildcards compiles to one anchored, case-sensitive
//! regex equivalent to their alternation.

use regex::Regex;
use thiserror::Error;

/// A wildcard that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid wildcard {pattern:?}: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

/// A compiled, non-empty wildcard list.
///
/// Absence of a list is modelled as `Option::None` by callers and means
/// "not restricted"; `Nothing` is a configured list without any usable entry.
#[derive(Debug, Clone)]
pub enum CompiledWildcard {
    Nothing,
    Pattern(Regex),
}

impl CompiledWildcard {
    pub fn is_match(&self, name: &str) -> bool {
        match self {
            CompiledWildcard::Nothing => false,
            CompiledWildcard::Pattern(re) => re.is_match(name),
        }
    }
}

/// Translate one wildcard into an unanchored regex fragment.
pub fn wildcard_to_regex(wildcard: &str) -> String {
    let mut out = String::with_capacity(wildcard.len() * 2);
    let mut literal = String::new();
    for ch in wildcard.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

/// Compile a configured wildcard list.
///
/// `None` stays `None`. Empty entries are skipped; a list made only of empty
/// entries compiles to [`CompiledWildcard::Nothing`]. Every entry that fails
/// to compile is reported.
pub fn compile_wildcards(wildcards: Option<&[String]>) -> Result<Option<CompiledWildcard>, Vec<PatternError>> {
    let Some(wildcards) = wildcards else {
        return Ok(None);
    };

    let mut alternatives = Vec::with_capacity(wildcards.len());
    let mut errors = Vec::new();
    for wildcard in wildcards.iter().filter(|w| !w.is_empty()) {
        let fragment = wildcard_to_regex(wildcard);
        match Regex::new(&anchored(&fragment)) {
            Ok(_) => alternatives.push(fragment),
            Err(e) => errors.push(PatternError {
                pattern: wildcard.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if alternatives.is_empty() {
        return Ok(Some(CompiledWildcard::Nothing));
    }

    Regex::new(&anchored(&alternatives.join("|")))
        .map(|re| Some(CompiledWildcard::Pattern(re)))
        .map_err(|e| {
            vec![PatternError {
                pattern: wildcards.join(" "),
                reason: e.to_string(),
            }]
        })
}

fn anchored(fragment: &str) -> String {
    format!("^(?s:{fragment})$")
}
