// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dbacl CLI
//!
//! Evaluates FTP/SFTP commands against a database ACL table and manages
//! the table and configuration.
//!
//! # Usage
//!
//! ```bash
//! # Create the ACL table and add a rule
//! dbacl --db acl.db init-db
//! dbacl --db acl.db set --path /pub/incoming --category write --value deny
//!
//! # Check a command (exit code 0 = allowed, 1 = denied)
//! dbacl --config dbacl.toml check --cwd /pub STOR incoming/file.bin
//!
//! # SFTP rename
//! dbacl --config dbacl.toml check --protocol sftp --to /pub/b RENAME /pub/a
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dbacl::{
    denial_reply, AclConfig, DecisionEngine, Operation, PermissionCategory, Policy, Protocol,
    RuleValue, ServerOverride, SessionPaths, Settings, SqliteRuleStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Database-backed ACL checks for FTP/SFTP commands
#[derive(Parser, Debug)]
#[command(name = "dbacl")]
#[command(about = "Database-backed ACL checks for FTP/SFTP commands")]
#[command(version)]
struct Args {
    /// Configuration file (.toml, or directive syntax otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Virtual server whose settings apply
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// SQLite database (overrides the configured connection)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one command against the ACL table
    Check {
        /// Session protocol (ftp, ftps, sftp)
        #[arg(long, default_value = "ftp")]
        protocol: Protocol,

        /// Session working directory
        #[arg(long, default_value = "/")]
        cwd: String,

        /// Destination path of a two-path SFTP request
        #[arg(long)]
        to: Option<String>,

        /// Evaluate even if the configuration leaves the engine off
        #[arg(long)]
        enable: bool,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,

        /// Command or request name
        command: String,

        /// Command argument
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arg: Vec<String>,
    },

    /// Create the ACL table in the database
    InitDb,

    /// Set one rule value
    Set {
        /// Path the rule applies to
        #[arg(long)]
        path: String,

        /// Permission category
        #[arg(long)]
        category: PermissionCategory,

        /// Value (allow/deny, on/off, yes/no, true/false, 1/0)
        #[arg(long)]
        value: String,
    },

    /// Generate an example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "dbacl.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &args.command {
        Commands::Check {
            protocol,
            cwd,
            to,
            enable,
            json,
            command,
            arg,
        } => {
            let op = build_operation(*protocol, command, &arg.join(" "), to.as_deref());
            cmd_check(&args, &op, cwd, *enable, *json)
        }
        Commands::InitDb => cmd_init_db(&args),
        Commands::Set {
            path,
            category,
            value,
        } => cmd_set(&args, path, *category, value),
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate => cmd_validate(&args),
    }
}

fn build_operation(protocol: Protocol, command: &str, arg: &str, to: Option<&str>) -> Operation {
    match to {
        Some(destination) => Operation::with_paths(protocol, command, arg, destination),
        None => Operation::from_wire(protocol, command, arg),
    }
}

fn load_config(args: &Args) -> Result<AclConfig> {
    match &args.config {
        Some(path) => AclConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(AclConfig::default()),
    }
}

fn open_store(args: &Args, config: &AclConfig, settings: &Settings) -> Result<SqliteRuleStore> {
    let connection = &settings.schema.connection;
    let path = match &args.db {
        Some(path) => path.clone(),
        None => config
            .connection_path(connection)
            .map(Path::to_path_buf)
            .with_context(|| format!("no database for connection '{}' (use --db)", connection))?,
    };

    tracing::info!("Database: {}", path.display());
    SqliteRuleStore::open(&path, settings)
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn cmd_check(args: &Args, op: &Operation, cwd: &str, enable: bool, json: bool) -> Result<()> {
    let config = load_config(args)?;
    let mut settings = config.activate(args.server.as_deref());
    if enable {
        settings.enabled = true;
    }

    let store = open_store(args, &config, &settings)?;
    let engine = DecisionEngine::new(Arc::new(settings), store);
    let decision = engine.decide(op, &SessionPaths::new(cwd));

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        let verdict = if decision.is_allowed() { "ALLOW" } else { "DENY" };
        match decision.category {
            Some(category) => println!("{} ({}, {} ACL)", verdict, decision.source, category),
            None => println!("{} ({})", verdict, decision.source),
        }
        if let Some(denial) = &decision.denial {
            println!("  target: {}", denial.target);
            if op.protocol.is_ftp_family() {
                println!("  reply:  {}", denial_reply(op));
            }
        }
    }

    if !decision.is_allowed() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_init_db(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let settings = config.activate(args.server.as_deref());
    let store = open_store(args, &config, &settings)?;

    store.install_schema().context("failed to create ACL table")?;
    println!(
        "ACL table '{}' ready ({} rows)",
        settings.schema.table,
        store.count()?
    );
    Ok(())
}

fn cmd_set(args: &Args, path: &str, category: PermissionCategory, value: &str) -> Result<()> {
    if RuleValue::parse_token(value) == RuleValue::Unset {
        bail!("'{}' is not a recognised ACL value", value);
    }
    if !path.starts_with('/') {
        bail!("rule path '{}' must be absolute", path);
    }

    let config = load_config(args)?;
    let settings = config.activate(args.server.as_deref());
    let store = open_store(args, &config, &settings)?;

    store
        .set_rule(path, category, value)
        .with_context(|| format!("failed to set {} ACL for '{}'", category, path))?;
    println!("{} {} = {}", path, settings.column(category), value);
    Ok(())
}

fn cmd_gen_config(output: &Path) -> Result<()> {
    let config = AclConfig::builder()
        .enabled(true)
        .policy(Policy::Deny)
        .connection("default", "/var/lib/dbacl/acl.db")
        .server(
            "ftp.example.com",
            ServerOverride {
                policy: Some(Policy::Allow),
                ..Default::default()
            },
        )
        .build();

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# dbacl Configuration
# Generated by dbacl gen-config
#
# Values in the ACL table: allow/deny, on/off, yes/no, true/false, 1/0
# (case-insensitive). Anything else leaves the row undecided.

{}
"#,
        toml_str
    );

    std::fs::write(output, content)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(args: &Args) -> Result<()> {
    let Some(path) = &args.config else {
        bail!("validate requires --config");
    };

    match AclConfig::load(path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Engine: {}", if config.enabled { "on" } else { "off" });
            println!("Policy: {}", config.policy);
            println!(
                "Table:  {} (path column '{}', connection '{}')",
                config.schema.table, config.schema.path_column, config.schema.connection
            );
            if let Some(clause) = &config.where_clause {
                println!("Filter: {}", clause);
            }
            for (name, db) in &config.connections {
                println!("  connection {} -> {}", name, db.display());
            }
            for name in config.servers.keys() {
                let settings = config.activate(Some(name));
                println!(
                    "  server {}: engine {}, policy {}, table {}",
                    name,
                    if settings.enabled { "on" } else { "off" },
                    settings.policy,
                    settings.schema.table
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
