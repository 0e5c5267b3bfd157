// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Permission categories and session protocols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of access an operation needs on its target path.
///
/// Each category is backed by one column of the ACL table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionCategory {
    /// Download file contents.
    Read,
    /// Upload or append file contents.
    Write,
    /// Remove files or directories.
    Delete,
    /// Create directories or links.
    Create,
    /// Change metadata (mode, group, timestamps).
    Modify,
    /// Rename or copy.
    Move,
    /// List directories or stat entries.
    View,
    /// Change or query the working directory.
    Navigate,
}

impl PermissionCategory {
    /// All categories, in schema column order.
    pub const ALL: [PermissionCategory; 8] = [
        Self::Read,
        Self::Write,
        Self::Delete,
        Self::Create,
        Self::Modify,
        Self::Move,
        Self::View,
        Self::Navigate,
    ];

    /// Lowercase name, as used in configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Move => "move",
            Self::View => "view",
            Self::Navigate => "navigate",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown permission category '{}'", s))
    }
}

/// Protocol of the session issuing the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain FTP.
    Ftp,
    /// FTP over TLS.
    Ftps,
    /// SFTP (SSH file transfer).
    Sftp,
}

impl Protocol {
    /// Protocol name as reported by the session layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ftp => "ftp",
            Self::Ftps => "ftps",
            Self::Sftp => "sftp",
        }
    }

    /// FTP and FTPS share the command vocabulary and path conventions.
    pub fn is_ftp_family(&self) -> bool {
        matches!(self, Self::Ftp | Self::Ftps)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Self::Ftp),
            "ftps" => Ok(Self::Ftps),
            "sftp" => Ok(Self::Sftp),
            other => Err(format!("unsupported protocol '{}'", other)),
        }
    }
}
