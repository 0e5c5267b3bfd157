// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolution error taxonomy.
//!
//! Every variant ends up as an unresolved outcome and falls back to the
//! configured policy. The distinction only matters for diagnostics.

use crate::store::StoreError;
use thiserror::Error;

/// Why a path could not be resolved to an explicit allow or deny.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Path is empty, relative, or has no separator past the root.
    #[error("cannot split path '{0}': no usable path separators")]
    InvalidPath(String),

    /// No ancestor of the path has a row in the ACL table.
    #[error("no ACL row matches '{0}'")]
    NoMatchingRule(String),

    /// The deepest matching path has more than one row.
    #[error("{rows} ACL rows match '{path}'")]
    AmbiguousRule { path: String, rows: usize },

    /// A row exists but its value is not boolean-like.
    #[error("cannot interpret ACL value '{0}' as a boolean")]
    UnparseableRuleValue(String),

    /// A two-path request arrived without both paths.
    #[error("malformed {0} request: missing source/destination delimiter")]
    MalformedDualPathArgument(String),

    /// The command argument could not be turned into an absolute path.
    #[error("cannot resolve a path from '{0}'")]
    UnresolvablePath(String),

    /// The rule store failed.
    #[error("rule store error: {0}")]
    Store(#[from] StoreError),
}
