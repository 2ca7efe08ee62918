//! # artgraph CLI Module
//!
//! This module implements the CLI interface for artgraph.
//!
//! ## Available Commands
//!
//! - `init` - Initialize new database
//! - `status` - Show vertex and edge counts
//! - `register` - Add an artifact to a group (created if missing)
//! - `show` - Print a group with its hydrated members
//! - `proxy` - Create a remote proxy for a canonical artifact
//! - `adopt` - Attach a remote proxy to a group
//! - `remove` - Drop a member from a group
//! - `delete` - Cascade-delete groups

mod commands;

use crate::config::{Backend, Config, ConfigError};
use artgraph_core::OgmError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Graph(#[from] OgmError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// artgraph - artifact groups on a property graph
///
/// Registers artifacts into groups, follows remote proxies to their
/// canonical artifacts, and cascade-deletes groups.
#[derive(Parser, Debug)]
#[command(name = "artgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (default: ./artgraph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the graph database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Natural key of a group.
#[derive(Args, Debug, Clone)]
pub struct GroupKey {
    /// Storage id
    #[arg(short, long)]
    pub storage: String,

    /// Repository id
    #[arg(short, long)]
    pub repository: String,

    /// Group name
    #[arg(short, long)]
    pub name: String,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show graph status
    Status,

    /// Register an artifact in a group
    Register {
        #[command(flatten)]
        group: GroupKey,

        /// Artifact path inside the repository
        #[arg(short, long)]
        path: String,

        /// Artifact size in bytes
        #[arg(long)]
        size: Option<i64>,

        /// Artifact checksum
        #[arg(long)]
        checksum: Option<String>,
    },

    /// Show a group and its members
    Show {
        #[command(flatten)]
        group: GroupKey,
    },

    /// Create a remote proxy for a canonical artifact
    Proxy {
        /// Vertex id of the canonical artifact
        #[arg(short, long)]
        artifact: u64,
    },

    /// Attach a remote proxy to a group
    Adopt {
        #[command(flatten)]
        group: GroupKey,

        /// Vertex id of the proxy
        #[arg(long)]
        proxy: u64,
    },

    /// Remove a member from a group (the artifact vertex is kept)
    Remove {
        #[command(flatten)]
        group: GroupKey,

        /// Member uuid
        #[arg(short, long)]
        uuid: String,
    },

    /// Cascade-delete groups with their members
    Delete {
        /// Group vertex id (repeatable)
        #[arg(long = "group-id")]
        group_ids: Vec<u64>,

        /// Storage id of a group selected by natural key
        #[arg(long, requires_all = ["repository", "name"])]
        storage: Option<String>,

        /// Repository id of a group selected by natural key
        #[arg(long, requires_all = ["storage", "name"])]
        repository: Option<String>,

        /// Name of a group selected by natural key
        #[arg(long, requires_all = ["storage", "repository"])]
        name: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolved settings every command runs with.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: Backend,
    pub json_mode: bool,
}

impl Context {
    /// Merge command-line flags over the loaded config.
    #[must_use]
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            database: cli.database.clone().unwrap_or_else(|| config.database.clone()),
            backend: cli.backend.unwrap_or(config.backend),
            json_mode: cli.json_mode,
        }
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), CliError> {
    let ctx = Context::resolve(&cli, config);

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Register {
            group,
            path,
            size,
            checksum,
        }) => cmd_register(&ctx, &group, &path, size, checksum),
        Some(Commands::Show { group }) => cmd_show(&ctx, &group),
        Some(Commands::Proxy { artifact }) => cmd_proxy(&ctx, artifact),
        Some(Commands::Adopt { group, proxy }) => cmd_adopt(&ctx, &group, proxy),
        Some(Commands::Remove { group, uuid }) => cmd_remove(&ctx, &group, &uuid),
        Some(Commands::Delete {
            group_ids,
            storage,
            repository,
            name,
        }) => {
            let key = match (storage, repository, name) {
                (Some(storage), Some(repository), Some(name)) => Some(GroupKey {
                    storage,
                    repository,
                    name,
                }),
                _ => None,
            };
            cmd_delete(&ctx, &group_ids, key.as_ref())
        }
    }
}
