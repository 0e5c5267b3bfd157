// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FTP error replies for denied operations.

use crate::classify::is_site_attr_command;
use crate::engine::Operation;
use crate::path::skip_list_options;
use std::fmt;

/// Text of every denial reply.
pub const DENIED_MESSAGE: &str = "Permission denied";

/// FTP reply code and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn with_subject(code: u16, subject: &str) -> Self {
        Self::new(code, format!("{}: {}", subject, DENIED_MESSAGE))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Reply sent when `op` is denied.
///
/// Directory listings answer with a transient 450, everything else with 550.
pub fn denial_reply(op: &Operation) -> Reply {
    match op.name.as_str() {
        "CDUP" | "XCUP" | "PWD" | "XPWD" => Reply::new(550, DENIED_MESSAGE),
        "LIST" | "NLST" => {
            if skip_list_options(&op.arg).trim().is_empty() {
                Reply::with_subject(450, ".")
            } else {
                Reply::with_subject(450, &op.arg)
            }
        }
        "MFMT" | "MFF" => Reply::with_subject(550, op.args.get(1).map_or("", String::as_str)),
        "MLSD" | "MLST" if op.arg.is_empty() => Reply::with_subject(550, "."),
        "STAT" if op.arg.is_empty() => Reply::new(550, DENIED_MESSAGE),
        "SITE" => {
            let skip = match op.args.first() {
                Some(sub) if is_site_attr_command(sub) => 2,
                _ => 1,
            };
            let subject = op.args.get(skip..).map(|rest| rest.join(" ")).unwrap_or_default();
            Reply::with_subject(550, &subject)
        }
        _ => Reply::with_subject(550, &op.arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Protocol;

    fn reply(name: &str, arg: &str) -> String {
        denial_reply(&Operation::new(Protocol::Ftp, name, arg)).to_string()
    }

    #[test]
    fn test_navigation_replies() {
        assert_eq!(reply("CDUP", ""), "550 Permission denied");
        assert_eq!(reply("XPWD", ""), "550 Permission denied");
        assert_eq!(reply("CWD", "/a/b"), "550 /a/b: Permission denied");
    }

    #[test]
    fn test_listing_replies() {
        assert_eq!(reply("LIST", ""), "450 .: Permission denied");
        assert_eq!(reply("NLST", "-la"), "450 .: Permission denied");
        assert_eq!(reply("LIST", "-la /pub"), "450 -la /pub: Permission denied");
        assert_eq!(reply("MLSD", ""), "550 .: Permission denied");
        assert_eq!(reply("MLST", "f.txt"), "550 f.txt: Permission denied");
    }

    #[test]
    fn test_stat_replies() {
        assert_eq!(reply("STAT", ""), "550 Permission denied");
        assert_eq!(reply("STAT", "/pub"), "550 /pub: Permission denied");
    }

    #[test]
    fn test_mfmt_reply_names_path() {
        assert_eq!(
            reply("MFMT", "20250101120000 a.txt"),
            "550 a.txt: Permission denied"
        );
    }

    #[test]
    fn test_site_replies() {
        assert_eq!(
            reply("SITE", "CHMOD 755 my dir"),
            "550 my dir: Permission denied"
        );
        assert_eq!(reply("SITE", "CPTO /a/b"), "550 /a/b: Permission denied");
    }

    #[test]
    fn test_reply_fields() {
        let r = denial_reply(&Operation::new(Protocol::Ftp, "RETR", "/a/b"));
        assert_eq!(r.code, 550);
        assert_eq!(r.message, "/a/b: Permission denied");
    }
}
