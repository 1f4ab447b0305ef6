//! Resumable sweep binding file handles for every unvisited change.
//!
//! Each change is migrated in isolation: a failure is logged, recorded as
//! `FAILURE` in the ledger and the sweep moves on. Every attempt lands in the
//! ledger, so the unvisited set shrinks with each batch and the sweep
//! terminates. Only ledger failures abort.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use pagination::{DEFAULT_PAGE_LIMIT, PageRequest};
use tracing::{debug, error, info};

use crate::domain::port_error_mapping::map_ledger_error;
use crate::domain::ports::{
    FileMigrationLedger, FileMigrationSweep, MigrationState, SweepReport,
    TableFileMigrationCommand,
};
use crate::domain::{ChangeKey, Error, RowChange};

/// Domain service implementing the sweep.
pub struct FileMigrationSweepService<M, L> {
    migrator: Arc<M>,
    ledger: Arc<L>,
    batch: PageRequest,
}

impl<M, L> FileMigrationSweepService<M, L> {
    /// Create a sweep listing `batch_size` changes per batch.
    pub fn new(migrator: Arc<M>, ledger: Arc<L>, batch_size: u32) -> Result<Self, Error> {
        let batch = PageRequest::first(batch_size)
            .map_err(|err| Error::invalid_request(format!("invalid sweep batch size: {err}")))?;
        Ok(Self {
            migrator,
            ledger,
            batch,
        })
    }

    /// Create a sweep using the default batch size.
    pub fn with_default_batch(migrator: Arc<M>, ledger: Arc<L>) -> Result<Self, Error> {
        Self::new(migrator, ledger, DEFAULT_PAGE_LIMIT)
    }
}

impl<M, L> FileMigrationSweepService<M, L>
where
    M: TableFileMigrationCommand,
    L: FileMigrationLedger,
{
    async fn migrate_one(&self, change: &RowChange) -> MigrationState {
        match self.migrator.attempt_table_file_migration(change).await {
            Ok(file_handle_ids) => {
                debug!(
                    table_id = %change.table_id,
                    row_version = change.row_version,
                    file_handles = file_handle_ids.len(),
                    "migrated table change"
                );
                MigrationState::Success
            }
            Err(cause) => {
                error!(
                    table_id = %change.table_id,
                    row_version = change.row_version,
                    code = ?cause.code(),
                    error = %cause,
                    "failed to migrate table change"
                );
                MigrationState::Failure
            }
        }
    }
}

#[async_trait]
impl<M, L> FileMigrationSweep for FileMigrationSweepService<M, L>
where
    M: TableFileMigrationCommand,
    L: FileMigrationLedger,
{
    async fn migrate_changes(&self, changes: Vec<RowChange>) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();
        for change in changes {
            let state = self.migrate_one(&change).await;
            self.ledger
                .record_outcome(&change, state)
                .await
                .map_err(map_ledger_error)?;
            match state {
                MigrationState::Success => report.succeeded += 1,
                MigrationState::Failure => report.failed += 1,
            }
        }
        Ok(report)
    }

    async fn run(&self) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();
        let mut previous_batch: HashSet<(ChangeKey, String)> = HashSet::new();

        loop {
            let page = self
                .ledger
                .list_unmigrated(self.batch)
                .await
                .map_err(map_ledger_error)?;
            if page.is_empty() {
                break;
            }
            let last_batch = page.is_last();

            let batch: HashSet<_> = page
                .items()
                .iter()
                .map(|change| (change.key(), change.etag.clone()))
                .collect();
            if let Some((key, _)) = batch.intersection(&previous_batch).next() {
                return Err(Error::conflict(format!(
                    "migration ledger did not record table {} version {}",
                    key.table_id, key.row_version
                )));
            }

            report += self.migrate_changes(page.into_items()).await?;
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "file migration batch complete"
            );
            if last_batch {
                break;
            }
            previous_batch = batch;
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "file migration sweep complete"
        );
        Ok(report)
    }
}
