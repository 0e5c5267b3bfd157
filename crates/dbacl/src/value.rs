// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stored ACL values and their boolean interpretation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value as it comes out of the rule store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRuleValue {
    /// Column is NULL.
    Null,
    /// Native boolean.
    Bool(bool),
    /// Integer column.
    Integer(i64),
    /// Floating-point column.
    Real(f64),
    /// Text column.
    Text(String),
}

impl fmt::Display for RawRuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawRuleValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for RawRuleValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Interpreted permission setting for one (category, path) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleValue {
    /// Access granted.
    Allow,
    /// Access refused.
    Deny,
    /// Row present but value missing or not boolean-like.
    Unset,
}

impl RuleValue {
    /// Interpret a raw store value.
    ///
    /// Text tokens are matched case-insensitively: `on yes true 1 allow
    /// allowed` grant, `off no false 0 deny denied` refuse. Integers 1 and 0
    /// count as their literal tokens. Everything else is [`RuleValue::Unset`].
    pub fn parse(raw: &RawRuleValue) -> Self {
        match raw {
            RawRuleValue::Bool(true) => Self::Allow,
            RawRuleValue::Bool(false) => Self::Deny,
            RawRuleValue::Integer(1) => Self::Allow,
            RawRuleValue::Integer(0) => Self::Deny,
            RawRuleValue::Text(text) => Self::parse_token(text),
            _ => Self::Unset,
        }
    }

    /// Interpret a single text token.
    pub fn parse_token(token: &str) -> Self {
        const ALLOW: [&str; 6] = ["on", "yes", "true", "1", "allow", "allowed"];
        const DENY: [&str; 6] = ["off", "no", "false", "0", "deny", "denied"];

        if ALLOW.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Self::Allow
        } else if DENY.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Self::Deny
        } else {
            Self::Unset
        }
    }
}
