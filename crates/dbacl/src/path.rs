// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Path decomposition and session path resolution.
//!
//! A path like `/home/user/dir/file.txt` is split into the chain
//!
//! ```text
//! /home
//! /home/user
//! /home/user/dir
//! /home/user/dir/file.txt
//! ```
//!
//! which is the candidate set for the longest-match rule lookup.

use crate::error::ResolveError;

/// Namespace separator.
pub const SEPARATOR: char = '/';

/// Ancestor prefixes of a path, shallowest first, ending with the path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChain {
    elements: Vec<String>,
}

impl PathChain {
    /// Chain elements, shallowest first.
    pub fn as_slice(&self) -> &[String] {
        &self.elements
    }

    /// Number of elements (at least one).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false; a chain holds at least the path itself.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The full path the chain was built from.
    pub fn deepest(&self) -> &str {
        self.elements.last().map(String::as_str).unwrap_or("/")
    }

    /// Iterate elements, shallowest first.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.elements.iter()
    }
}

impl<'a> IntoIterator for &'a PathChain {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Split an absolute path into its ancestor chain.
///
/// The root path yields `["/"]`. Any other path needs at least one
/// separator past position 0 (after stripping one trailing separator);
/// `/x` is rejected with [`ResolveError::InvalidPath`].
pub fn decompose(path: &str) -> Result<PathChain, ResolveError> {
    if !path.starts_with(SEPARATOR) {
        return Err(ResolveError::InvalidPath(path.to_string()));
    }

    if path.len() == 1 {
        return Ok(PathChain {
            elements: vec![SEPARATOR.to_string()],
        });
    }

    let trimmed = path.strip_suffix(SEPARATOR).unwrap_or(path);

    let mut elements: Vec<String> = trimmed
        .match_indices(SEPARATOR)
        .filter(|(idx, _)| *idx > 0)
        .map(|(idx, _)| trimmed[..idx].to_string())
        .collect();

    if elements.is_empty() {
        tracing::trace!(target: "dbacl", "unable to split path '{}': no usable path separators found", path);
        return Err(ResolveError::InvalidPath(path.to_string()));
    }

    elements.push(trimmed.to_string());
    Ok(PathChain { elements })
}

/// Collapse `.`/`..` segments and duplicate separators of an absolute path.
///
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        SEPARATOR.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Strip leading option tokens (`-la`, `-R`, ...) from a LIST/NLST argument.
///
/// Returns the remaining path text, which may be empty when only options
/// were given.
pub fn skip_list_options(arg: &str) -> &str {
    let mut rest = arg.trim_start();
    if !rest.starts_with('-') {
        return arg;
    }

    while rest.starts_with('-') {
        rest = match rest.find(char::is_whitespace) {
            Some(end) => rest[end..].trim_start(),
            None => "",
        };
    }
    rest
}

/// Turns command arguments into absolute paths for the current session.
///
/// The command layer owns normalization; the engine only asks for it.
pub trait PathResolver {
    /// Current working directory of the session (absolute).
    fn cwd(&self) -> String;

    /// Absolute path for `path`, or `None` if it cannot be resolved.
    ///
    /// An empty argument refers to the working directory.
    fn absolute(&self, path: &str) -> Option<String>;
}

/// Lexical resolver against a fixed working directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    cwd: String,
}

impl SessionPaths {
    /// Create a resolver rooted at `cwd` (made absolute and normalized).
    pub fn new(cwd: impl AsRef<str>) -> Self {
        Self {
            cwd: normalize(cwd.as_ref()),
        }
    }
}

impl Default for SessionPaths {
    fn default() -> Self {
        Self::new("/")
    }
}

impl PathResolver for SessionPaths {
    fn cwd(&self) -> String {
        self.cwd.clone()
    }

    fn absolute(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return Some(self.cwd.clone());
        }

        let resolved = if path.starts_with(SEPARATOR) {
            normalize(path)
        } else {
            normalize(&format!("{}/{}", self.cwd, path))
        };

        tracing::trace!(target: "dbacl", "resolved path '{}' to '{}'", path, resolved);
        Some(resolved)
    }
}
