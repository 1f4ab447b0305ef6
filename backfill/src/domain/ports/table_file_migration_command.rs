//! Driving port re-binding the file handles of a single change.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{Error, FileHandleId, RowChange};

/// Driving port for one file-association migration attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableFileMigrationCommand: Send + Sync {
    /// Bind every file handle referenced by `change` to its table.
    ///
    /// Runs in its own scope: either all bindings commit or none do. Returns
    /// the distinct ids that were bound.
    async fn attempt_table_file_migration(
        &self,
        change: &RowChange,
    ) -> Result<BTreeSet<FileHandleId>, Error>;
}
