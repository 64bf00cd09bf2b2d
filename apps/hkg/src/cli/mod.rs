//! # hkg CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create an empty store file
//! - `status` - Show entity counts and index health
//! - `import` - Add or update entities from a JSON file
//! - `show` - Print one entity in wire form
//! - `children` - List the entities contained in a context
//! - `neighbors` - List entities sharing a link with an entity
//! - `remove` - Delete an entity
//! - `fact` - Assert a `subject predicate object` fact
//! - `relations` - List the links of a connector
//! - `hash` - Compute snapshot checksums

mod commands;

use crate::config::HkgConfig;
use clap::{Parser, Subcommand};
use hyperknowledge_core::HkError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// hkg - hyperknowledge graph tool
///
/// Loads a JSON snapshot, applies one command, and saves it back.
#[derive(Parser, Debug)]
#[command(name = "hkg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the snapshot file (overrides the config)
    #[arg(short = 'S', long, global = true)]
    pub store: Option<PathBuf>,

    /// Path to a TOML config file (default: ./hkg.toml when present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty store
    Init {
        /// Overwrite an existing store
        #[arg(short, long)]
        force: bool,
    },

    /// Show store status
    Status,

    /// Import entities from a JSON file (array, single entity or snapshot)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print an entity
    Show {
        /// Entity id
        id: String,
    },

    /// List children of a context (the root when omitted)
    Children {
        /// Parent context id
        parent: Option<String>,
    },

    /// List neighbors of an entity
    Neighbors {
        /// Entity id
        id: String,
    },

    /// Remove an entity
    Remove {
        /// Entity id
        id: String,
    },

    /// Assert a binary fact
    Fact {
        subject: String,
        predicate: String,
        object: String,

        /// Context holding the new entities
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List the links of a connector
    Relations {
        /// Connector id
        connector: String,
    },

    /// Compute FNV-1a and BLAKE3 hashes of the snapshot
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments, writing results to stdout.
pub fn execute(cli: Cli, config: &HkgConfig) -> Result<(), HkError> {
    let settings = Settings::new(&cli, config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &settings, &mut out)
}

/// Dispatch one command against `settings`, writing results to `out`.
pub fn run(
    command: Option<Commands>,
    settings: &Settings,
    out: &mut impl std::io::Write,
) -> Result<(), HkError> {
    match command {
        Some(Commands::Init { force }) => cmd_init(settings, out, force),
        Some(Commands::Status) => cmd_status(settings, out),
        Some(Commands::Import { input }) => cmd_import(settings, out, &input),
        Some(Commands::Show { id }) => cmd_show(settings, out, &id),
        Some(Commands::Children { parent }) => cmd_children(settings, out, parent.as_deref()),
        Some(Commands::Neighbors { id }) => cmd_neighbors(settings, out, &id),
        Some(Commands::Remove { id }) => cmd_remove(settings, out, &id),
        Some(Commands::Fact {
            subject,
            predicate,
            object,
            parent,
        }) => cmd_fact(
            settings,
            out,
            &subject,
            &predicate,
            &object,
            parent.as_deref(),
        ),
        Some(Commands::Relations { connector }) => cmd_relations(settings, out, &connector),
        Some(Commands::Hash) => cmd_hash(settings, out),
        None => {
            // No subcommand - show status by default
            cmd_status(settings, out)
        }
    }
}
