// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ACL engine configuration.
//!
//! Supports TOML files, the classic directive syntax, and programmatic
//! construction. A configuration is turned into an immutable [`Settings`]
//! snapshot by [`AclConfig::activate`], once per session start; the engine
//! only ever reads that snapshot.
//!
//! # Directive syntax
//!
//! ```text
//! DBACLEngine on
//! DBACLPolicy deny
//! DBACLSchema ftpacl path read_acl write_acl delete_acl create_acl modify_acl move_acl view_acl navigate_acl default
//! DBACLWhereClause "owner = 'ftp'"
//!
//! <VirtualHost ftp.example.com>
//!   DBACLPolicy allow
//! </VirtualHost>
//! ```

use crate::category::PermissionCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("line {line}: {message}")]
    Directive { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Decision applied when no rule resolves an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Fail open.
    #[default]
    Allow,
    /// Fail closed.
    Deny,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("allow") {
            Ok(Self::Allow)
        } else if s.eq_ignore_ascii_case("deny") {
            Ok(Self::Deny)
        } else {
            Err(format!("unknown DBACLPolicy '{}'", s))
        }
    }
}

/// Column name per permission category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub read: String,
    pub write: String,
    pub delete: String,
    pub create: String,
    pub modify: String,
    #[serde(rename = "move")]
    pub move_: String,
    pub view: String,
    pub navigate: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            read: "read_acl".to_string(),
            write: "write_acl".to_string(),
            delete: "delete_acl".to_string(),
            create: "create_acl".to_string(),
            modify: "modify_acl".to_string(),
            move_: "move_acl".to_string(),
            view: "view_acl".to_string(),
            navigate: "navigate_acl".to_string(),
        }
    }
}

impl ColumnNames {
    /// Column holding the rule for `category`.
    pub fn get(&self, category: PermissionCategory) -> &str {
        match category {
            PermissionCategory::Read => &self.read,
            PermissionCategory::Write => &self.write,
            PermissionCategory::Delete => &self.delete,
            PermissionCategory::Create => &self.create,
            PermissionCategory::Modify => &self.modify,
            PermissionCategory::Move => &self.move_,
            PermissionCategory::View => &self.view,
            PermissionCategory::Navigate => &self.navigate,
        }
    }

    fn from_slice(names: &[String]) -> Self {
        Self {
            read: names[0].clone(),
            write: names[1].clone(),
            delete: names[2].clone(),
            create: names[3].clone(),
            modify: names[4].clone(),
            move_: names[5].clone(),
            view: names[6].clone(),
            navigate: names[7].clone(),
        }
    }
}

/// Table layout of the ACL store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Table name.
    pub table: String,
    /// Column holding the path each row applies to.
    pub path_column: String,
    /// Category columns.
    pub columns: ColumnNames,
    /// Named connection the table lives in.
    pub connection: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            table: "ftpacl".to_string(),
            path_column: "path".to_string(),
            columns: ColumnNames::default(),
            connection: "default".to_string(),
        }
    }
}

impl Schema {
    /// Schema with default column names for `table`.
    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{}: empty table name", scope)));
        }

        let mut seen: Vec<&str> = vec![self.path_column.as_str()];
        for category in PermissionCategory::ALL {
            seen.push(self.columns.get(category));
        }

        for (i, name) in seen.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{}: empty column name", scope)));
            }
            if seen[..i].contains(name) {
                return Err(ConfigError::Invalid(format!(
                    "{}: column '{}' used more than once",
                    scope, name
                )));
            }
        }

        Ok(())
    }
}

/// Per-virtual-server overrides. Unset fields inherit the global value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// ACL configuration as loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclConfig {
    /// Engine on/off switch. Off by default.
    #[serde(default)]
    pub enabled: bool,

    /// Policy for unresolved operations.
    #[serde(default)]
    pub policy: Policy,

    /// Extra SQL condition ANDed into every lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    /// Table layout.
    #[serde(default)]
    pub schema: Schema,

    /// Named connections (name -> SQLite database path).
    #[serde(default)]
    pub connections: BTreeMap<String, PathBuf>,

    /// Per-virtual-server overrides, keyed by server name.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerOverride>,
}

/// Activation snapshot consumed by the engine.
///
/// Built once per activation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub policy: Policy,
    pub schema: Schema,
    pub where_clause: Option<String>,
}

impl Settings {
    /// Column holding the rule for `category`.
    pub fn column(&self, category: PermissionCategory) -> &str {
        self.schema.columns.get(category)
    }
}

impl Default for Settings {
    fn default() -> Self {
        AclConfig::default().activate(None)
    }
}

impl AclConfig {
    /// Create a new config builder
    pub fn builder() -> AclConfigBuilder {
        AclConfigBuilder::default()
    }

    /// Load configuration from a file.
    ///
    /// `.toml` files are parsed as TOML; anything else as directives.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            Self::from_toml(&content)?
        } else {
            Self::from_directives(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse directive syntax.
    pub fn from_directives(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut server: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let err = |message: String| ConfigError::Directive { line, message };

            if let Some(inner) = text.strip_prefix("</") {
                if !inner.trim_end_matches('>').eq_ignore_ascii_case("VirtualHost") {
                    return Err(err(format!("unexpected closing section '{}'", text)));
                }
                if server.take().is_none() {
                    return Err(err("</VirtualHost> without matching section".into()));
                }
                continue;
            }

            if let Some(inner) = text.strip_prefix('<') {
                let inner = inner
                    .strip_suffix('>')
                    .ok_or_else(|| err(format!("unterminated section '{}'", text)))?;
                let mut parts = inner.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(kind), Some(name)) if kind.eq_ignore_ascii_case("VirtualHost") => {
                        if server.is_some() {
                            return Err(err("nested <VirtualHost> sections".into()));
                        }
                        config.servers.entry(name.to_string()).or_default();
                        server = Some(name.to_string());
                    }
                    _ => return Err(err(format!("unsupported section '{}'", text))),
                }
                continue;
            }

            let tokens = tokenize(text).map_err(err)?;
            let (name, args) = match tokens.split_first() {
                Some(split) => split,
                None => continue,
            };

            let target = match server.as_deref() {
                Some(host) => {
                    DirectiveTarget::Server(config.servers.entry(host.to_string()).or_default())
                }
                None => DirectiveTarget::Global(&mut config),
            };
            apply_directive(target, name, args).map_err(err)?;
        }

        if server.is_some() {
            return Err(ConfigError::Invalid("unterminated <VirtualHost> section".into()));
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.validate("global schema")?;
        self.check_connection(&self.schema.connection)?;

        for (name, server) in &self.servers {
            if let Some(schema) = &server.schema {
                schema.validate(&format!("server '{}' schema", name))?;
                self.check_connection(&schema.connection)?;
            }
        }

        if let Some(clause) = &self.where_clause {
            if clause.trim().is_empty() {
                return Err(ConfigError::Invalid("empty where clause".into()));
            }
        }

        Ok(())
    }

    fn check_connection(&self, name: &str) -> Result<(), ConfigError> {
        if !self.connections.is_empty() && !self.connections.contains_key(name) {
            return Err(ConfigError::Invalid(format!(
                "unknown connection '{}'",
                name
            )));
        }
        Ok(())
    }

    /// Database path of a named connection.
    pub fn connection_path(&self, name: &str) -> Option<&Path> {
        self.connections.get(name).map(PathBuf::as_path)
    }

    /// Build the settings snapshot for `server` (global scope when `None`).
    ///
    /// Unknown server names fall back to the global settings.
    pub fn activate(&self, server: Option<&str>) -> Settings {
        let overrides = server.and_then(|name| self.servers.get(name));

        let settings = Settings {
            enabled: overrides
                .and_then(|o| o.enabled)
                .unwrap_or(self.enabled),
            policy: overrides.and_then(|o| o.policy).unwrap_or(self.policy),
            schema: overrides
                .and_then(|o| o.schema.clone())
                .unwrap_or_else(|| self.schema.clone()),
            where_clause: overrides
                .and_then(|o| o.where_clause.clone())
                .or_else(|| self.where_clause.clone()),
        };

        tracing::debug!(
            target: "dbacl",
            server = server.unwrap_or("<global>"),
            enabled = settings.enabled,
            policy = %settings.policy,
            "activated ACL settings"
        );
        tracing::debug!(target: "dbacl", "using table name '{}' for ACLs", settings.schema.table);
        tracing::debug!(target: "dbacl", "using column name '{}' for paths", settings.schema.path_column);
        for category in PermissionCategory::ALL {
            tracing::debug!(
                target: "dbacl",
                "using column name '{}' for the {} ACL",
                settings.column(category),
                category
            );
        }

        settings
    }
}

enum DirectiveTarget<'a> {
    Global(&'a mut AclConfig),
    Server(&'a mut ServerOverride),
}

fn apply_directive(target: DirectiveTarget<'_>, name: &str, args: &[String]) -> Result<(), String> {
    if name.eq_ignore_ascii_case("DBACLEngine") {
        let enabled = parse_bool(single(name, args)?)
            .ok_or_else(|| format!("{}: expected Boolean parameter", name))?;
        match target {
            DirectiveTarget::Global(c) => c.enabled = enabled,
            DirectiveTarget::Server(s) => s.enabled = Some(enabled),
        }
    } else if name.eq_ignore_ascii_case("DBACLPolicy") {
        let policy: Policy = single(name, args)?.parse()?;
        match target {
            DirectiveTarget::Global(c) => c.policy = policy,
            DirectiveTarget::Server(s) => s.policy = Some(policy),
        }
    } else if name.eq_ignore_ascii_case("DBACLSchema") {
        let schema = match args.len() {
            1 => Schema::with_table(args[0].clone()),
            10 | 11 => Schema {
                table: args[0].clone(),
                path_column: args[1].clone(),
                columns: ColumnNames::from_slice(&args[2..10]),
                connection: args
                    .get(10)
                    .cloned()
                    .unwrap_or_else(|| Schema::default().connection),
            },
            _ => return Err(format!("{}: wrong number of parameters", name)),
        };
        match target {
            DirectiveTarget::Global(c) => c.schema = schema,
            DirectiveTarget::Server(s) => s.schema = Some(schema),
        }
    } else if name.eq_ignore_ascii_case("DBACLWhereClause") {
        let clause = single(name, args)?.clone();
        match target {
            DirectiveTarget::Global(c) => c.where_clause = Some(clause),
            DirectiveTarget::Server(s) => s.where_clause = Some(clause),
        }
    } else {
        return Err(format!("unknown directive '{}'", name));
    }

    Ok(())
}

fn single<'a>(name: &str, args: &'a [String]) -> Result<&'a String, String> {
    match args {
        [value] => Ok(value),
        _ => Err(format!("{} expects exactly one parameter", name)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Split a directive line on whitespace, honouring double-quoted tokens.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".into());
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct AclConfigBuilder {
    enabled: Option<bool>,
    policy: Option<Policy>,
    where_clause: Option<String>,
    schema: Option<Schema>,
    connections: BTreeMap<String, PathBuf>,
    servers: BTreeMap<String, ServerOverride>,
}

impl AclConfigBuilder {
    /// Turn the engine on or off
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the default policy
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the extra lookup condition
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Set the table layout
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Register a named connection
    pub fn connection(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.connections.insert(name.into(), path.into());
        self
    }

    /// Add overrides for a virtual server
    pub fn server(mut self, name: impl Into<String>, overrides: ServerOverride) -> Self {
        self.servers.insert(name.into(), overrides);
        self
    }

    /// Build the configuration
    pub fn build(self) -> AclConfig {
        let defaults = AclConfig::default();

        AclConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            policy: self.policy.unwrap_or(defaults.policy),
            where_clause: self.where_clause.or(defaults.where_clause),
            schema: self.schema.unwrap_or(defaults.schema),
            connections: self.connections,
            servers: self.servers,
        }
    }
}
