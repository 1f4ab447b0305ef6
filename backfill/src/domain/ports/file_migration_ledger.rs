//! Driven port recording which changes the file-migration sweep has visited.

use std::fmt;

use async_trait::async_trait;
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};

use super::define_port_error;
use crate::domain::RowChange;

/// Result of one migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    /// File handles were bound and committed.
    Success,
    /// The attempt failed and was rolled back.
    Failure,
}

impl MigrationState {
    /// Persisted name of the state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

define_port_error! {
    /// Errors raised by the migration ledger.
    pub enum FileMigrationLedgerError {
        /// Ledger connection could not be established.
        Connection { message: String } =>
            "migration ledger connection failed: {message}",
        /// Query or upsert failed during execution.
        Query { message: String } =>
            "migration ledger query failed: {message}",
    }
}

/// Port listing unvisited changes and recording attempt outcomes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileMigrationLedger: Send + Sync {
    /// List changes whose `(table_id, row_version, etag)` has no ledger
    /// entry, ordered by `(table_id, row_version)`.
    async fn list_unmigrated(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, FileMigrationLedgerError>;

    /// Upsert the outcome for `change`, keyed by table and version and
    /// stamped with the change's etag.
    async fn record_outcome(
        &self,
        change: &RowChange,
        state: MigrationState,
    ) -> Result<(), FileMigrationLedgerError>;
}
