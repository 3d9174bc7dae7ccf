//! URL and filesystem path matching.
//!
//! # Responsibilities
//! - Normalise URL paths (leading `/`, `.`/`..` resolved, no trailing slash)
//! - Exact and ancestor ("directory and below") matching
//! - Filesystem prefix matching on path components
//! - Absolute, lexically cleaned filesystem paths for rule keys
//!
//! # Design Decisions
//! - Pure functions over strings, no allocation when input is already clean
//! - Filesystem matching is component-wise so `/srv/data` never matches `/srv/database`

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Normalise a URL path.
///
/// The result always starts with `/`, has `.` and `..` segments resolved
/// (never escaping the root), collapses repeated slashes and carries no
/// trailing slash except for the root itself.
pub fn clean_url_path(path: &str) -> Cow<'_, str> {
    if is_clean(path) {
        return Cow::Borrowed(path);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Cow::Borrowed("/");
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    Cow::Owned(cleaned)
}

fn is_clean(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest
            .split('/')
            .all(|s| !s.is_empty() && s != "." && s != ".."),
        None => false,
    }
}

/// Percent-decode a raw request path and normalise it.
///
/// Invalid UTF-8 sequences are replaced rather than rejected; the result can
/// never address anything outside the URL root.
pub fn decode_url_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    clean_url_path(&decoded).into_owned()
}

/// Byte equality of both paths after normalisation.
pub fn is_exact(candidate: &str, request_path: &str) -> bool {
    clean_url_path(candidate) == clean_url_path(request_path)
}

/// True iff `candidate` is a proper directory ancestor of `request_path`.
///
/// The root `/` is an ancestor of every other path.
pub fn is_ancestor(candidate: &str, request_path: &str) -> bool {
    let candidate = clean_url_path(candidate);
    let request_path = clean_url_path(request_path);
    is_clean_ancestor(&candidate, &request_path)
}

/// [`is_ancestor`] for inputs already passed through [`clean_url_path`].
pub(crate) fn is_clean_ancestor(candidate: &str, request_path: &str) -> bool {
    if candidate == request_path {
        return false;
    }
    if candidate == "/" {
        return true;
    }
    request_path
        .strip_prefix(candidate)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// True when `request_path` equals `prefix` or lies below it.
pub fn has_url_prefix_dir(request_path: &str, prefix: &str) -> bool {
    let request_path = clean_url_path(request_path);
    let prefix = clean_url_path(prefix);
    request_path == prefix || is_clean_ancestor(&prefix, &request_path)
}

/// True when `fs_path` equals `prefix` or lies below it, compared component-wise.
pub fn has_fs_prefix_dir(fs_path: &Path, prefix: &Path) -> bool {
    fs_path.starts_with(prefix)
}

/// Make `path` absolute against `base` and resolve `.` and `..` lexically.
///
/// Symlinks are left alone; `..` at the root stays at the root.
pub fn absolutize_fs_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// The part of `request_path` below `base`, always starting with `/` unless empty.
///
/// Both inputs must be clean and `base` must be `request_path` or an ancestor of it.
pub(crate) fn strip_base<'a>(request_path: &'a str, base: &str) -> &'a str {
    if base == "/" {
        if request_path == "/" {
            ""
        } else {
            request_path
        }
    } else {
        request_path.strip_prefix(base).unwrap_or("")
    }
}
