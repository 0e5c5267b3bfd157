// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rule store abstraction
//!
//! Defines the lookup contract for ACL backends (SQLite, in-memory).

use crate::path::PathChain;
use crate::value::RawRuleValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Rule store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("rule store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a longest-match lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Value stored for the deepest chain element that has a row.
    Found {
        /// Matching chain element.
        path: String,
        /// Value of the requested column.
        value: RawRuleValue,
    },
    /// No chain element has a row.
    NotFound,
    /// The deepest matching element has more than one row.
    Ambiguous {
        /// Matching chain element.
        path: String,
        /// Number of rows seen (at least two).
        rows: usize,
    },
}

/// Rule store trait
///
/// Backend-agnostic longest-match lookup.
///
/// # Contract
///
/// Among the chain elements that have a row, pick the longest one and return
/// the value of `column` for it. A stored path matches only if it is
/// byte-identical to a chain element. Implementations never choose between
/// duplicate rows; they report [`Lookup::Ambiguous`].
///
/// Escaping candidate paths is the implementation's responsibility.
pub trait RuleStore {
    /// Look up `column` for the deepest element of `chain` that has a row.
    fn lookup(&self, column: &str, chain: &PathChain) -> Result<Lookup, StoreError>;
}

impl<S: RuleStore + ?Sized> RuleStore for &S {
    fn lookup(&self, column: &str, chain: &PathChain) -> Result<Lookup, StoreError> {
        (**self).lookup(column, chain)
    }
}

impl<S: RuleStore + ?Sized> RuleStore for std::sync::Arc<S> {
    fn lookup(&self, column: &str, chain: &PathChain) -> Result<Lookup, StoreError> {
        (**self).lookup(column, chain)
    }
}

/// In-memory rule store
///
/// Rows are keyed by (column, path). Adding a second value for the same key
/// models a duplicate row. Counts lookups so callers can assert how many
/// round trips a decision took.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rows: Mutex<HashMap<(String, String), Vec<RawRuleValue>>>,
    failure: Mutex<Option<String>>,
    lookups: AtomicUsize,
}

impl MemoryRuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row value for `path` in `column`.
    pub fn insert(&self, column: &str, path: &str, value: impl Into<RawRuleValue>) {
        self.rows
            .lock()
            .entry((column.to_string(), path.to_string()))
            .or_default()
            .push(value.into());
    }

    /// Builder-style [`MemoryRuleStore::insert`].
    pub fn with_rule(self, column: &str, path: &str, value: impl Into<RawRuleValue>) -> Self {
        self.insert(column, path, value);
        self
    }

    /// Make every subsequent lookup fail with `message` (`None` to recover).
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Number of lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl RuleStore for MemoryRuleStore {
    fn lookup(&self, column: &str, chain: &PathChain) -> Result<Lookup, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = self.failure.lock().as_ref() {
            return Err(StoreError::Unavailable(message.clone()));
        }

        let rows = self.rows.lock();
        let deepest = chain
            .iter()
            .filter_map(|path| {
                rows.get(&(column.to_string(), path.clone()))
                    .map(|values| (path, values))
            })
            .max_by_key(|(path, _)| path.len());

        Ok(match deepest {
            None => Lookup::NotFound,
            Some((path, values)) if values.len() > 1 => Lookup::Ambiguous {
                path: path.clone(),
                rows: values.len(),
            },
            Some((path, values)) => Lookup::Found {
                path: path.clone(),
                value: values[0].clone(),
            },
        })
    }
}
