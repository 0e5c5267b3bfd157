// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Permission resolution
//!
//! Turns a (category, absolute path) pair into an allow/deny answer by
//! longest-match lookup, or reports that the table has no usable answer.

use crate::category::PermissionCategory;
use crate::config::{Policy, Settings};
use crate::error::ResolveError;
use crate::path::decompose;
use crate::store::{Lookup, RuleStore};
use crate::value::RuleValue;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Final answer for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Operation may proceed.
    Allow,
    /// Operation is refused.
    Deny,
}

impl Verdict {
    /// True for [`Verdict::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

impl From<Policy> for Verdict {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Allow => Self::Allow,
            Policy::Deny => Self::Deny,
        }
    }
}

/// Tri-state result of resolving one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A row grants access.
    Allow,
    /// A row refuses access.
    Deny,
    /// No explicit answer; the caller applies the policy.
    Unresolved,
}

impl ResolutionOutcome {
    /// Collapse to a verdict, using `policy` when unresolved.
    pub fn or_policy(self, policy: Policy) -> Verdict {
        match self {
            Self::Allow => Verdict::Allow,
            Self::Deny => Verdict::Deny,
            Self::Unresolved => policy.into(),
        }
    }
}

impl From<Verdict> for ResolutionOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => Self::Allow,
            Verdict::Deny => Self::Deny,
        }
    }
}

/// Longest-match resolver over a rule store.
///
/// Holds no per-request state and caches nothing: every call is one store
/// lookup (or none, for paths that cannot be decomposed).
pub struct PermissionResolver<S> {
    settings: Arc<Settings>,
    store: S,
}

impl<S: RuleStore> PermissionResolver<S> {
    /// Create a resolver over an activation snapshot and a rule store.
    pub fn new(settings: Arc<Settings>, store: S) -> Self {
        Self { settings, store }
    }

    /// Settings snapshot in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Backing rule store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `path` for `category`, reporting why no answer was found.
    pub fn try_resolve(
        &self,
        category: PermissionCategory,
        path: &str,
    ) -> Result<Verdict, ResolveError> {
        let chain = decompose(path)?;
        tracing::trace!(target: "dbacl", "checking {} ACL for path chain {:?}", category, chain.as_slice());

        let column = self.settings.column(category);
        match self.store.lookup(column, &chain)? {
            Lookup::Found { path: matched, value } => match RuleValue::parse(&value) {
                RuleValue::Allow => {
                    tracing::debug!(target: "dbacl", "{} allowed for '{}' by row '{}'", category, path, matched);
                    Ok(Verdict::Allow)
                }
                RuleValue::Deny => {
                    tracing::debug!(target: "dbacl", "{} denied for '{}' by row '{}'", category, path, matched);
                    Ok(Verdict::Deny)
                }
                RuleValue::Unset => Err(ResolveError::UnparseableRuleValue(value.to_string())),
            },
            Lookup::NotFound => Err(ResolveError::NoMatchingRule(path.to_string())),
            Lookup::Ambiguous { path, rows } => Err(ResolveError::AmbiguousRule { path, rows }),
        }
    }

    /// Resolve `path` for `category`, folding every failure into
    /// [`ResolutionOutcome::Unresolved`].
    pub fn resolve(&self, category: PermissionCategory, path: &str) -> ResolutionOutcome {
        match self.try_resolve(category, path) {
            Ok(verdict) => verdict.into(),
            Err(err) => {
                match &err {
                    ResolveError::AmbiguousRule { .. } | ResolveError::Store(_) => {
                        tracing::warn!(target: "dbacl", "{} ACL for '{}' unresolved: {}", category, path, err);
                    }
                    _ => {
                        tracing::debug!(target: "dbacl", "{} ACL for '{}' unresolved: {}", category, path, err);
                    }
                }
                ResolutionOutcome::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRuleStore;
    use crate::value::RawRuleValue;

    fn resolver(store: MemoryRuleStore) -> PermissionResolver<MemoryRuleStore> {
        PermissionResolver::new(Arc::new(Settings::default()), store)
    }

    #[test]
    fn test_deeper_rule_wins() {
        let r = resolver(
            MemoryRuleStore::new()
                .with_rule("read_acl", "/a", "deny")
                .with_rule("read_acl", "/a/b", "allow"),
        );

        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/b/c"),
            ResolutionOutcome::Allow
        );
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/x/y"),
            ResolutionOutcome::Deny
        );
    }

    #[test]
    fn test_categories_use_their_own_column() {
        let r = resolver(MemoryRuleStore::new().with_rule("write_acl", "/a", "deny"));
        assert_eq!(
            r.resolve(PermissionCategory::Write, "/a/f"),
            ResolutionOutcome::Deny
        );
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/f"),
            ResolutionOutcome::Unresolved
        );
    }

    #[test]
    fn test_unparseable_value_is_unresolved() {
        let r = resolver(MemoryRuleStore::new().with_rule("read_acl", "/a", "maybe"));
        assert!(matches!(
            r.try_resolve(PermissionCategory::Read, "/a/f"),
            Err(ResolveError::UnparseableRuleValue(v)) if v == "maybe"
        ));
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/f"),
            ResolutionOutcome::Unresolved
        );
    }

    #[test]
    fn test_null_on_deepest_row_does_not_fall_through() {
        let r = resolver(
            MemoryRuleStore::new()
                .with_rule("read_acl", "/a", "allow")
                .with_rule("read_acl", "/a/b", RawRuleValue::Null),
        );
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/b/c"),
            ResolutionOutcome::Unresolved
        );
    }

    #[test]
    fn test_invalid_path_skips_store() {
        let store = MemoryRuleStore::new().with_rule("read_acl", "/x", "deny");
        let r = resolver(store);

        assert!(matches!(
            r.try_resolve(PermissionCategory::Read, "/x"),
            Err(ResolveError::InvalidPath(_))
        ));
        assert_eq!(
            r.resolve(PermissionCategory::Read, "relative/path"),
            ResolutionOutcome::Unresolved
        );
        assert_eq!(r.store().lookups(), 0);
    }

    #[test]
    fn test_root_path() {
        let r = resolver(MemoryRuleStore::new().with_rule("navigate_acl", "/", "deny"));
        assert_eq!(
            r.resolve(PermissionCategory::Navigate, "/"),
            ResolutionOutcome::Deny
        );
    }

    #[test]
    fn test_ambiguous_rows_are_unresolved() {
        for (first, second) in [("allow", "deny"), ("deny", "allow")] {
            let r = resolver(
                MemoryRuleStore::new()
                    .with_rule("read_acl", "/a/b", first)
                    .with_rule("read_acl", "/a/b", second),
            );
            assert!(matches!(
                r.try_resolve(PermissionCategory::Read, "/a/b/c"),
                Err(ResolveError::AmbiguousRule { rows: 2, .. })
            ));
            assert_eq!(
                r.resolve(PermissionCategory::Read, "/a/b/c"),
                ResolutionOutcome::Unresolved
            );
        }
    }

    #[test]
    fn test_store_failure_is_unresolved() {
        let store = MemoryRuleStore::new().with_rule("read_acl", "/a", "deny");
        store.set_failure(Some("database is locked"));
        let r = resolver(store);
        assert!(matches!(
            r.try_resolve(PermissionCategory::Read, "/a/b"),
            Err(ResolveError::Store(_))
        ));
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/b"),
            ResolutionOutcome::Unresolved
        );
    }

    #[test]
    fn test_no_caching() {
        let r = resolver(MemoryRuleStore::new().with_rule("read_acl", "/a", "deny"));
        r.resolve(PermissionCategory::Read, "/a/b");
        r.store().insert("read_acl", "/a/b", "allow");
        assert_eq!(
            r.resolve(PermissionCategory::Read, "/a/b"),
            ResolutionOutcome::Allow
        );
        assert_eq!(r.store().lookups(), 2);
    }

    #[test]
    fn test_or_policy() {
        assert_eq!(
            ResolutionOutcome::Unresolved.or_policy(Policy::Deny),
            Verdict::Deny
        );
        assert_eq!(
            ResolutionOutcome::Unresolved.or_policy(Policy::Allow),
            Verdict::Allow
        );
        assert_eq!(ResolutionOutcome::Deny.or_policy(Policy::Allow), Verdict::Deny);
    }
}
