// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operation classification.
//!
//! Maps a protocol command to the permission category that governs it. The
//! FTP command vocabulary applies to every protocol (SFTP sessions dispatch
//! FTP-named commands such as `RETR` and `MKD` as well); the SFTP request
//! vocabulary applies to SFTP sessions only.
//!
//! Commands with no mapping are not governed by the ACL table at all.

use crate::category::{PermissionCategory, Protocol};

/// How many paths an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShape {
    /// One target path.
    Single,
    /// Source and destination paths (rename, link creation).
    Dual,
}

/// Result of classifying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Category whose column is consulted.
    pub category: PermissionCategory,
    /// Number of paths to resolve.
    pub shape: TargetShape,
}

impl Classification {
    fn single(category: PermissionCategory) -> Self {
        Self {
            category,
            shape: TargetShape::Single,
        }
    }

    fn dual(category: PermissionCategory) -> Self {
        Self {
            category,
            shape: TargetShape::Dual,
        }
    }
}

/// `SITE` sub-commands that carry a path after a mode/group token.
pub(crate) fn is_site_attr_command(sub: &str) -> bool {
    sub.eq_ignore_ascii_case("CHMOD") || sub.eq_ignore_ascii_case("CHGRP")
}

/// Classify `operation` issued over `protocol`.
///
/// `args` are the argument tokens following the operation name; `SITE` uses
/// the first one to pick its sub-command.
pub fn classify(protocol: Protocol, operation: &str, args: &[String]) -> Option<Classification> {
    use PermissionCategory::*;

    let name = operation.to_ascii_uppercase();

    let common = match name.as_str() {
        "RETR" => Some(Classification::single(Read)),
        "STOR" | "APPE" | "STOU" => Some(Classification::single(Write)),
        "DELE" | "RMD" | "XRMD" => Some(Classification::single(Delete)),
        "MKD" | "XMKD" => Some(Classification::single(Create)),
        "MFMT" | "MFF" => Some(Classification::single(Modify)),
        "RNFR" | "RNTO" => Some(Classification::single(Move)),
        "LIST" | "MLSD" | "MLST" | "NLST" | "STAT" | "MDTM" | "SIZE" => {
            Some(Classification::single(View))
        }
        "CDUP" | "XCUP" | "CWD" | "XCWD" | "PWD" | "XPWD" => {
            Some(Classification::single(Navigate))
        }
        "SITE" => return classify_site(args),
        _ => None,
    };

    if common.is_some() || protocol != Protocol::Sftp {
        return common;
    }

    match name.as_str() {
        "LSTAT" | "OPENDIR" | "READLINK" => Some(Classification::single(View)),
        "REALPATH" => Some(Classification::single(Navigate)),
        "SETSTAT" | "FSETSTAT" => Some(Classification::single(Modify)),
        "RENAME" => Some(Classification::dual(Move)),
        "SYMLINK" | "LINK" => Some(Classification::dual(Create)),
        _ => None,
    }
}

fn classify_site(args: &[String]) -> Option<Classification> {
    let sub = args.first()?;

    if is_site_attr_command(sub) {
        Some(Classification::single(PermissionCategory::Modify))
    } else if sub.eq_ignore_ascii_case("CPTO") {
        Some(Classification::single(PermissionCategory::Move))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn category(protocol: Protocol, op: &str, a: &[&str]) -> Option<PermissionCategory> {
        classify(protocol, op, &args(a)).map(|c| c.category)
    }

    #[test]
    fn test_ftp_vocabulary() {
        use PermissionCategory::*;
        let cases = [
            ("RETR", Read),
            ("STOR", Write),
            ("APPE", Write),
            ("STOU", Write),
            ("DELE", Delete),
            ("XRMD", Delete),
            ("MKD", Create),
            ("MFF", Modify),
            ("RNFR", Move),
            ("RNTO", Move),
            ("MLSD", View),
            ("SIZE", View),
            ("CDUP", Navigate),
            ("XPWD", Navigate),
        ];
        for (op, expected) in cases {
            assert_eq!(category(Protocol::Ftp, op, &[]), Some(expected), "{}", op);
        }
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(
            category(Protocol::Ftps, "retr", &["a"]),
            Some(PermissionCategory::Read)
        );
        assert_eq!(
            category(Protocol::Sftp, "opendir", &[]),
            Some(PermissionCategory::View)
        );
    }

    #[test]
    fn test_site_sub_commands() {
        assert_eq!(
            category(Protocol::Ftp, "SITE", &["CHMOD", "644", "f"]),
            Some(PermissionCategory::Modify)
        );
        assert_eq!(
            category(Protocol::Ftp, "SITE", &["chgrp", "staff", "f"]),
            Some(PermissionCategory::Modify)
        );
        assert_eq!(
            category(Protocol::Ftp, "SITE", &["CPTO", "f"]),
            Some(PermissionCategory::Move)
        );
        assert_eq!(category(Protocol::Ftp, "SITE", &["UTIME", "f"]), None);
        assert_eq!(category(Protocol::Ftp, "SITE", &[]), None);
    }

    #[test]
    fn test_listing_differs_by_protocol_vocabulary() {
        assert_eq!(
            category(Protocol::Ftp, "LIST", &[]),
            Some(PermissionCategory::View)
        );
        assert_eq!(
            category(Protocol::Sftp, "OPENDIR", &[]),
            Some(PermissionCategory::View)
        );
        // SFTP request names are not FTP commands
        assert_eq!(category(Protocol::Ftp, "OPENDIR", &[]), None);
    }

    #[test]
    fn test_sftp_dual_path_requests() {
        let link = classify(Protocol::Sftp, "SYMLINK", &[]).unwrap();
        assert_eq!(link.category, PermissionCategory::Create);
        assert_eq!(link.shape, TargetShape::Dual);

        let rename = classify(Protocol::Sftp, "RENAME", &[]).unwrap();
        assert_eq!(rename.category, PermissionCategory::Move);
        assert_eq!(rename.shape, TargetShape::Dual);

        assert_eq!(
            classify(Protocol::Sftp, "SETSTAT", &[]).map(|c| c.shape),
            Some(TargetShape::Single)
        );
    }

    #[test]
    fn test_unmapped_operations() {
        assert_eq!(category(Protocol::Ftp, "NOOP", &[]), None);
        assert_eq!(category(Protocol::Ftp, "USER", &["bob"]), None);
        assert_eq!(category(Protocol::Sftp, "READ", &[]), None);
    }
}
