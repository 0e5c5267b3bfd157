// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database-backed ACLs for FTP/SFTP file operations
//!
//! Decides whether a file-transfer command may proceed by looking up the
//! permission column for its category in a table of path rules.
//!
//! # Features
//!
//! - **Longest match** -- The deepest ancestor of the target with a row wins
//! - **Default policy** -- Allow or deny when no row answers
//! - **Two-path requests** -- SFTP rename/link check source, then destination
//! - **Per-server settings** -- Engine, policy, schema and filter per virtual host
//!
//! # Architecture
//!
//! ```text
//! DecisionEngine
//! +-- classify()            (operation -> permission category)
//! +-- PathResolver          (argument -> absolute path, per session)
//! +-- PermissionResolver
//!     +-- decompose()       (path -> ancestor chain)
//!     +-- RuleStore         (SQLite or in-memory backend)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dbacl::{AclConfig, DecisionEngine, Operation, Protocol, SessionPaths, SqliteRuleStore};
//! use std::sync::Arc;
//!
//! let config = AclConfig::load("dbacl.toml")?;
//! let settings = Arc::new(config.activate(Some("ftp.example.com")));
//! let store = SqliteRuleStore::open("/var/lib/dbacl/acl.db", &settings)?;
//! let engine = DecisionEngine::new(settings, store);
//!
//! let op = Operation::from_wire(Protocol::Ftp, "RETR", "report.pdf");
//! let decision = engine.decide(&op, &SessionPaths::new("/home/alice"));
//! if !decision.is_allowed() {
//!     println!("{}", dbacl::denial_reply(&op));
//! }
//! ```

pub mod category;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod path;
pub mod reply;
pub mod resolver;
pub mod sqlite;
pub mod store;
pub mod value;

pub use category::{PermissionCategory, Protocol};
pub use classify::{classify, Classification, TargetShape};
pub use config::{AclConfig, AclConfigBuilder, ColumnNames, ConfigError, Policy, Schema, ServerOverride, Settings};
pub use engine::{
    extract_target, Decision, DecisionEngine, DecisionSource, DenialContext, DualPath, Operation,
};
pub use error::ResolveError;
pub use path::{decompose, PathChain, PathResolver, SessionPaths};
pub use reply::{denial_reply, Reply};
pub use resolver::{PermissionResolver, ResolutionOutcome, Verdict};
pub use sqlite::SqliteRuleStore;
pub use store::{Lookup, MemoryRuleStore, RuleStore, StoreError};
pub use value::{RawRuleValue, RuleValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
