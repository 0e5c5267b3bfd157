// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite rule store
//!
//! Longest-match lookups against an ACL table with one row per path and one
//! column per permission category.

use crate::category::PermissionCategory;
use crate::config::{Schema, Settings};
use crate::path::PathChain;
use crate::store::{Lookup, RuleStore, StoreError};
use crate::value::RawRuleValue;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;

/// SQLite rule store
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync).
///
/// # Schema
///
/// With the default names:
///
/// ```sql
/// CREATE TABLE ftpacl (
///     path TEXT NOT NULL,
///     read_acl TEXT, write_acl TEXT, delete_acl TEXT, create_acl TEXT,
///     modify_acl TEXT, move_acl TEXT, view_acl TEXT, navigate_acl TEXT
/// );
/// CREATE INDEX idx_ftpacl_path ON ftpacl(path);
/// ```
///
/// # Query
///
/// ```sql
/// SELECT path, <column> FROM ftpacl
///   WHERE (<where clause>) AND path IN (?1, ?2, ...)
///   ORDER BY LENGTH(path) DESC
/// ```
///
/// Candidate paths are bound as parameters and identifiers are quoted, so
/// neither can inject SQL. The where clause is operator-supplied SQL and is
/// used verbatim.
pub struct SqliteRuleStore {
    conn: Mutex<Connection>,
    schema: Schema,
    where_clause: Option<String>,
}

impl SqliteRuleStore {
    /// Open a file-based database with the schema and filter of `settings`.
    pub fn open<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self::from_connection(conn, settings))
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory(settings: &Settings) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, settings))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection, settings: &Settings) -> Self {
        Self {
            conn: Mutex::new(conn),
            schema: settings.schema.clone(),
            where_clause: settings.where_clause.clone(),
        }
    }

    /// Create the ACL table and its path index if missing.
    pub fn install_schema(&self) -> Result<(), StoreError> {
        let table = quote_ident(&self.schema.table);
        let path_col = quote_ident(&self.schema.path_column);

        let mut columns = vec![format!("{} TEXT NOT NULL", path_col)];
        for category in PermissionCategory::ALL {
            columns.push(format!(
                "{} TEXT",
                quote_ident(self.schema.columns.get(category))
            ));
        }

        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                table,
                columns.join(", ")
            ),
            [],
        )?;

        let index = quote_ident(&format!(
            "idx_{}_{}",
            self.schema.table, self.schema.path_column
        ));
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                index, table, path_col
            ),
            [],
        )?;

        Ok(())
    }

    /// Set the `category` value of the row for `path`, inserting the row if
    /// there is none.
    pub fn set_rule(
        &self,
        path: &str,
        category: PermissionCategory,
        value: &str,
    ) -> Result<(), StoreError> {
        let table = quote_ident(&self.schema.table);
        let path_col = quote_ident(&self.schema.path_column);
        let column = quote_ident(self.schema.columns.get(category));

        let conn = self.conn.lock();
        let updated = conn.execute(
            &format!("UPDATE {} SET {} = ?1 WHERE {} = ?2", table, column, path_col),
            params![value, path],
        )?;

        if updated == 0 {
            conn.execute(
                &format!(
                    "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                    table, path_col, column
                ),
                params![path, value],
            )?;
        }

        tracing::debug!(target: "dbacl", "set {} ACL for '{}' to '{}'", category, path, value);
        Ok(())
    }

    /// Number of rows in the ACL table.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.schema.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn lookup_query(&self, column: &str, candidates: usize) -> String {
        let path_col = quote_ident(&self.schema.path_column);
        let placeholders: Vec<String> = (1..=candidates).map(|i| format!("?{}", i)).collect();

        let mut query = format!(
            "SELECT {}, {} FROM {} WHERE ",
            path_col,
            quote_ident(column),
            quote_ident(&self.schema.table)
        );
        if let Some(clause) = &self.where_clause {
            query.push_str(&format!("({}) AND ", clause));
        }
        query.push_str(&format!(
            "{} IN ({}) ORDER BY LENGTH({}) DESC",
            path_col,
            placeholders.join(", "),
            path_col
        ));
        query
    }
}

impl RuleStore for SqliteRuleStore {
    fn lookup(&self, column: &str, chain: &PathChain) -> Result<Lookup, StoreError> {
        let query = self.lookup_query(column, chain.len());
        tracing::trace!(target: "dbacl", "constructed query '{}'", query);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query(params_from_iter(chain.iter()))?;

        let mut deepest: Option<(String, RawRuleValue)> = None;
        let mut matches = 0usize;

        while let Some(row) = rows.next()? {
            let path: String = row.get(0)?;
            match deepest.as_ref().map(|(first, _)| *first == path) {
                None => {
                    deepest = Some((path, raw_value(row.get(1)?)));
                    matches = 1;
                }
                Some(true) => matches += 1,
                // Rows are ordered by path length, so the deepest path is done
                Some(false) => break,
            }
        }

        Ok(match deepest {
            None => Lookup::NotFound,
            Some((path, _)) if matches > 1 => Lookup::Ambiguous {
                path,
                rows: matches,
            },
            Some((path, value)) => Lookup::Found { path, value },
        })
    }
}

fn raw_value(value: Value) -> RawRuleValue {
    match value {
        Value::Null => RawRuleValue::Null,
        Value::Integer(i) => RawRuleValue::Integer(i),
        Value::Real(r) => RawRuleValue::Real(r),
        Value::Text(s) => RawRuleValue::Text(s),
        Value::Blob(b) => RawRuleValue::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

/// Quote an SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AclConfig;
    use crate::path::decompose;

    fn store_with(settings: &Settings) -> SqliteRuleStore {
        let store = SqliteRuleStore::open_in_memory(settings).unwrap();
        store.install_schema().unwrap();
        store
    }

    fn lookup(store: &SqliteRuleStore, column: &str, path: &str) -> Lookup {
        store.lookup(column, &decompose(path).unwrap()).unwrap()
    }

    #[test]
    fn test_sqlite_longest_match() {
        let store = store_with(&Settings::default());
        store.set_rule("/a", PermissionCategory::Read, "deny").unwrap();
        store.set_rule("/a/b", PermissionCategory::Read, "allow").unwrap();

        assert_eq!(
            lookup(&store, "read_acl", "/a/b/c"),
            Lookup::Found {
                path: "/a/b".to_string(),
                value: RawRuleValue::from("allow"),
            }
        );
        assert_eq!(
            lookup(&store, "read_acl", "/a/z"),
            Lookup::Found {
                path: "/a".to_string(),
                value: RawRuleValue::from("deny"),
            }
        );
        assert_eq!(lookup(&store, "read_acl", "/b/c"), Lookup::NotFound);
    }

    #[test]
    fn test_sqlite_set_rule_updates_existing_row() {
        let store = store_with(&Settings::default());
        store.set_rule("/a/b", PermissionCategory::Write, "deny").unwrap();
        store.set_rule("/a/b", PermissionCategory::Read, "allow").unwrap();
        store.set_rule("/a/b", PermissionCategory::Write, "allow").unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            lookup(&store, "write_acl", "/a/b"),
            Lookup::Found {
                path: "/a/b".to_string(),
                value: RawRuleValue::from("allow"),
            }
        );
    }

    #[test]
    fn test_sqlite_null_column_shadows_ancestor() {
        let store = store_with(&Settings::default());
        store.set_rule("/a", PermissionCategory::Read, "deny").unwrap();
        store.set_rule("/a/b", PermissionCategory::Write, "allow").unwrap();

        // The /a/b row exists, so its NULL read value is what the lookup sees
        assert_eq!(
            lookup(&store, "read_acl", "/a/b/c"),
            Lookup::Found {
                path: "/a/b".to_string(),
                value: RawRuleValue::Null,
            }
        );
    }

    #[test]
    fn test_sqlite_duplicate_rows_are_ambiguous() {
        let store = store_with(&Settings::default());
        {
            let conn = store.conn.lock();
            conn.execute_batch(
                "INSERT INTO ftpacl (path, read_acl) VALUES ('/a', 'allow');
                 INSERT INTO ftpacl (path, read_acl) VALUES ('/a/b', 'allow');
                 INSERT INTO ftpacl (path, read_acl) VALUES ('/a/b', 'deny');",
            )
            .unwrap();
        }

        assert_eq!(
            lookup(&store, "read_acl", "/a/b/c"),
            Lookup::Ambiguous {
                path: "/a/b".to_string(),
                rows: 2,
            }
        );
    }

    #[test]
    fn test_sqlite_duplicate_rows_deny_first() {
        let store = store_with(&Settings::default());
        {
            let conn = store.conn.lock();
            conn.execute_batch(
                "INSERT INTO ftpacl (path, read_acl) VALUES ('/a/b', 'deny');
                 INSERT INTO ftpacl (path, read_acl) VALUES ('/a', 'deny');
                 INSERT INTO ftpacl (path, read_acl) VALUES ('/a/b', 'allow');",
            )
            .unwrap();
        }

        assert_eq!(
            lookup(&store, "read_acl", "/a/b/c"),
            Lookup::Ambiguous {
                path: "/a/b".to_string(),
                rows: 2,
            }
        );
    }

    #[test]
    fn test_sqlite_integer_values() {
        let store = store_with(&Settings::default());
        {
            let conn = store.conn.lock();
            conn.execute_batch("INSERT INTO ftpacl (path, view_acl) VALUES ('/pub/x', 1);")
                .unwrap();
        }

        assert_eq!(
            lookup(&store, "view_acl", "/pub/x"),
            Lookup::Found {
                path: "/pub/x".to_string(),
                value: RawRuleValue::Integer(1),
            }
        );
    }

    #[test]
    fn test_sqlite_where_clause() {
        let settings = AclConfig::builder()
            .where_clause("owner = 'alice'")
            .build()
            .activate(None);
        let store = SqliteRuleStore::open_in_memory(&settings).unwrap();
        {
            let conn = store.conn.lock();
            conn.execute_batch(
                "CREATE TABLE ftpacl (owner TEXT, path TEXT NOT NULL, read_acl TEXT);
                 INSERT INTO ftpacl VALUES ('alice', '/home', 'deny');
                 INSERT INTO ftpacl VALUES ('bob', '/home/shared', 'allow');",
            )
            .unwrap();
        }

        assert_eq!(
            lookup(&store, "read_acl", "/home/shared/f"),
            Lookup::Found {
                path: "/home".to_string(),
                value: RawRuleValue::from("deny"),
            }
        );
    }

    #[test]
    fn test_sqlite_custom_schema_and_quoting() {
        let mut schema = Schema::with_table("acl \"rules\"");
        schema.path_column = "resource".to_string();
        schema.columns.read = "may read".to_string();
        let settings = AclConfig::builder().schema(schema).build().activate(None);

        let store = store_with(&settings);
        store.set_rule("/it's/here", PermissionCategory::Read, "yes").unwrap();

        assert_eq!(
            lookup(&store, "may read", "/it's/here"),
            Lookup::Found {
                path: "/it's/here".to_string(),
                value: RawRuleValue::from("yes"),
            }
        );
    }

    #[test]
    fn test_sqlite_missing_table_is_an_error() {
        let store = SqliteRuleStore::open_in_memory(&Settings::default()).unwrap();
        assert!(store
            .lookup("read_acl", &decompose("/a/b").unwrap())
            .is_err());
    }

    #[test]
    fn test_sqlite_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("acl.db");
        let settings = Settings::default();

        {
            let store = SqliteRuleStore::open(&db, &settings).unwrap();
            store.install_schema().unwrap();
            store.set_rule("/srv/ftp", PermissionCategory::Delete, "denied").unwrap();
        }

        let store = SqliteRuleStore::open(&db, &settings).unwrap();
        assert_eq!(
            lookup(&store, "delete_acl", "/srv/ftp/old.log"),
            Lookup::Found {
                path: "/srv/ftp".to_string(),
                value: RawRuleValue::from("denied"),
            }
        );
    }
}
