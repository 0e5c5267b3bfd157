// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decision engine
//!
//! Classifies an operation, resolves its target path(s) against the rule
//! store and applies the default policy when no rule answers.
//!
//! # Evaluation
//!
//! ```text
//! disabled            -> allow (Disabled)
//! no category         -> allow (Unmapped), no store access
//! single path         -> resolve(target) | policy
//! dual path           -> resolve(source): deny stops here
//!                        unresolved source stops here with the policy
//!                        resolve(destination) | policy
//! ```

use crate::category::{PermissionCategory, Protocol};
use crate::classify::{classify, is_site_attr_command, TargetShape};
use crate::config::Settings;
use crate::error::ResolveError;
use crate::path::{normalize, skip_list_options, PathResolver};
use crate::resolver::{PermissionResolver, ResolutionOutcome, Verdict};
use crate::store::RuleStore;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Delimiter between source and destination in two-path SFTP requests.
pub const DUAL_PATH_DELIMITER: char = '\t';

/// Source and destination of a two-path request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DualPath {
    /// Existing path.
    pub source: String,
    /// New path.
    pub destination: String,
}

/// An access request as seen at the protocol boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Session protocol.
    pub protocol: Protocol,
    /// Command or request name, upper-cased.
    pub name: String,
    /// Whitespace-separated argument tokens.
    pub args: Vec<String>,
    /// Raw argument string.
    pub arg: String,
    /// Both paths of a two-path request, when present.
    pub dual: Option<DualPath>,
}

impl Operation {
    /// Single-argument operation.
    pub fn new(protocol: Protocol, name: impl AsRef<str>, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        Self {
            protocol,
            name: name.as_ref().to_ascii_uppercase(),
            args: arg.split_whitespace().map(str::to_string).collect(),
            arg,
            dual: None,
        }
    }

    /// Two-path operation with already separated paths.
    pub fn with_paths(
        protocol: Protocol,
        name: impl AsRef<str>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let dual = DualPath {
            source: source.into(),
            destination: destination.into(),
        };
        let mut op = Self::new(
            protocol,
            name,
            format!("{}{}{}", dual.source, DUAL_PATH_DELIMITER, dual.destination),
        );
        op.dual = Some(dual);
        op
    }

    /// Decode an operation from its wire form.
    ///
    /// Two-path SFTP requests carry `source\tdestination` in a single
    /// argument; it is split at the first tab. A missing tab or an empty
    /// half leaves `dual` empty and the engine treats the request as
    /// malformed.
    pub fn from_wire(protocol: Protocol, name: impl AsRef<str>, raw_arg: impl Into<String>) -> Self {
        let mut op = Self::new(protocol, name, raw_arg);

        let dual_shaped = classify(protocol, &op.name, &op.args)
            .is_some_and(|c| c.shape == TargetShape::Dual);
        if dual_shaped {
            op.dual = op
                .arg
                .split_once(DUAL_PATH_DELIMITER)
                .filter(|(source, destination)| !source.is_empty() && !destination.is_empty())
                .map(|(source, destination)| DualPath {
                    source: source.to_string(),
                    destination: destination.to_string(),
                });
        }
        op
    }

    /// Name used in logs and denial contexts (`SITE CHMOD` for SITE).
    pub fn display_name(&self) -> String {
        match (self.name.as_str(), self.args.first()) {
            ("SITE", Some(sub)) => format!("SITE {}", sub.to_ascii_uppercase()),
            _ => self.name.clone(),
        }
    }
}

/// What produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Engine disabled for this server.
    Disabled,
    /// Operation has no permission category.
    Unmapped,
    /// An ACL row answered.
    Rule,
    /// No row answered; the default policy applied.
    Policy,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Unmapped => f.write_str("unmapped"),
            Self::Rule => f.write_str("rule"),
            Self::Policy => f.write_str("policy"),
        }
    }
}

/// Details handed back to the caller on denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialContext {
    /// Command name (`SITE CHMOD` for SITE sub-commands).
    pub operation: String,
    /// Path that was denied, or the raw argument if none could be resolved.
    pub target: String,
    /// Category whose column was consulted.
    pub category: PermissionCategory,
}

/// Outcome of [`DecisionEngine::decide`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Allow or deny.
    pub verdict: Verdict,
    /// What produced the verdict.
    pub source: DecisionSource,
    /// Category of the operation, if it has one.
    pub category: Option<PermissionCategory>,
    /// Set on denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<DenialContext>,
}

impl Decision {
    fn allow(source: DecisionSource, category: Option<PermissionCategory>) -> Self {
        Self {
            verdict: Verdict::Allow,
            source,
            category,
            denial: None,
        }
    }

    /// True if the operation may proceed.
    pub fn is_allowed(&self) -> bool {
        self.verdict.is_allow()
    }
}

/// Access-control decision engine.
///
/// Stateless per request; share it across sessions behind an `Arc`. A new
/// engine is built for each configuration activation.
pub struct DecisionEngine<S> {
    resolver: PermissionResolver<S>,
}

impl<S: RuleStore> DecisionEngine<S> {
    /// Create an engine over an activation snapshot and a rule store.
    pub fn new(settings: Arc<Settings>, store: S) -> Self {
        Self {
            resolver: PermissionResolver::new(settings, store),
        }
    }

    /// Settings snapshot in use.
    pub fn settings(&self) -> &Settings {
        self.resolver.settings()
    }

    /// Underlying path resolver.
    pub fn resolver(&self) -> &PermissionResolver<S> {
        &self.resolver
    }

    /// Decide whether `op` may proceed.
    ///
    /// `paths` turns command arguments into absolute paths for the issuing
    /// session.
    pub fn decide(&self, op: &Operation, paths: &dyn PathResolver) -> Decision {
        if !self.settings().enabled {
            return Decision::allow(DecisionSource::Disabled, None);
        }

        let Some(class) = classify(op.protocol, &op.name, &op.args) else {
            tracing::trace!(target: "dbacl", "{} {} is not ACL-governed", op.protocol, op.display_name());
            return Decision::allow(DecisionSource::Unmapped, None);
        };

        match class.shape {
            TargetShape::Single => self.decide_single(op, class.category, paths),
            TargetShape::Dual => self.decide_dual(op, class.category, paths),
        }
    }

    fn decide_single(
        &self,
        op: &Operation,
        category: PermissionCategory,
        paths: &dyn PathResolver,
    ) -> Decision {
        let target = match extract_target(op, paths) {
            Ok(target) => target,
            Err(err) => {
                tracing::debug!(target: "dbacl", "{}: {}", op.display_name(), err);
                return self.apply_policy(op, category, op.arg.clone());
            }
        };

        match self.resolver.resolve(category, &target) {
            ResolutionOutcome::Allow => Decision::allow(DecisionSource::Rule, Some(category)),
            ResolutionOutcome::Deny => self.deny(op, category, target, DecisionSource::Rule),
            ResolutionOutcome::Unresolved => self.apply_policy(op, category, target),
        }
    }

    fn decide_dual(
        &self,
        op: &Operation,
        category: PermissionCategory,
        paths: &dyn PathResolver,
    ) -> Decision {
        let Some(dual) = op
            .dual
            .as_ref()
            .filter(|d| !d.source.is_empty() && !d.destination.is_empty())
        else {
            let err = ResolveError::MalformedDualPathArgument(op.display_name());
            tracing::warn!(target: "dbacl", "{}", err);
            return self.apply_policy(op, category, op.arg.clone());
        };

        let source = paths
            .absolute(&dual.source)
            .unwrap_or_else(|| dual.source.clone());
        match self.resolver.resolve(category, &source) {
            ResolutionOutcome::Deny => {
                return self.deny(op, category, source, DecisionSource::Rule);
            }
            ResolutionOutcome::Unresolved => {
                return self.apply_policy(op, category, source);
            }
            ResolutionOutcome::Allow => {}
        }

        let destination = paths
            .absolute(&dual.destination)
            .unwrap_or_else(|| dual.destination.clone());
        match self.resolver.resolve(category, &destination) {
            ResolutionOutcome::Allow => Decision::allow(DecisionSource::Rule, Some(category)),
            ResolutionOutcome::Deny => self.deny(op, category, destination, DecisionSource::Rule),
            ResolutionOutcome::Unresolved => self.apply_policy(op, category, destination),
        }
    }

    fn apply_policy(&self, op: &Operation, category: PermissionCategory, target: String) -> Decision {
        match ResolutionOutcome::Unresolved.or_policy(self.settings().policy) {
            Verdict::Allow => {
                tracing::debug!(target: "dbacl", "{} on '{}' allowed by default policy", op.display_name(), target);
                Decision::allow(DecisionSource::Policy, Some(category))
            }
            Verdict::Deny => self.deny(op, category, target, DecisionSource::Policy),
        }
    }

    fn deny(
        &self,
        op: &Operation,
        category: PermissionCategory,
        target: String,
        source: DecisionSource,
    ) -> Decision {
        let operation = op.display_name();
        tracing::info!(
            target: "dbacl",
            "{} denied for '{}' ({} ACL, {})",
            operation,
            target,
            category,
            source
        );

        Decision {
            verdict: Verdict::Deny,
            source,
            category: Some(category),
            denial: Some(DenialContext {
                operation,
                target,
                category,
            }),
        }
    }
}

/// Absolute target path of a single-path operation.
pub fn extract_target(op: &Operation, paths: &dyn PathResolver) -> Result<String, ResolveError> {
    let raw = if op.protocol.is_ftp_family() {
        match op.name.as_str() {
            "PWD" | "XPWD" => return Ok(paths.cwd()),
            "CDUP" | "XCUP" => return Ok(normalize(&format!("{}/..", paths.cwd()))),
            "SITE" => match op.args.first() {
                Some(sub) if is_site_attr_command(sub) => join_from(&op.args, 2),
                _ => join_from(&op.args, 1),
            },
            "LIST" | "NLST" => skip_list_options(&op.arg).to_string(),
            "MFMT" | "MFF" => join_from(&op.args, 1),
            _ => op.arg.clone(),
        }
    } else {
        op.arg.clone()
    };

    paths
        .absolute(&raw)
        .ok_or(ResolveError::UnresolvablePath(raw))
}

fn join_from(tokens: &[String], start: usize) -> String {
    tokens.get(start..).map(|rest| rest.join(" ")).unwrap_or_default()
}
