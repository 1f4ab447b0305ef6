//! Operator command line for the backfill tools.
//!
//! ```text
//! txn-backfill [--database-url URL] [--id-generator-url URL] <COMMAND>
//!
//! Commands:
//!   transactions       assign transactions to every change missing one
//!   file-associations  bind referenced file handles to their tables
//!   migrate            apply schema migrations to both stores
//! ```

pub mod settings;

use clap::{Parser, Subcommand};

pub use settings::{BackfillSettings, ResolvedSettings, SettingsError, SettingsOverrides};

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "txn-backfill", version, about = "Transaction and file-association backfill")]
pub struct Cli {
    /// Primary store URL, overriding `BACKFILL_DATABASE_URL`.
    #[arg(long, global = true)]
    pub database_url: Option<String>,
    /// Id-generation store URL, overriding `BACKFILL_ID_GENERATOR_URL`.
    #[arg(long, global = true)]
    pub id_generator_url: Option<String>,
    /// Task to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Tasks the binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Assign transactions to every change missing one.
    Transactions,
    /// Bind file handles referenced by table changes to their tables.
    FileAssociations,
    /// Apply schema migrations to both stores.
    Migrate,
}

impl Cli {
    /// URL overrides taken from the command line.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            database_url: self.database_url.clone(),
            id_generator_url: self.id_generator_url.clone(),
        }
    }
}
