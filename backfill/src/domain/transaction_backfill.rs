//! Transaction backfill driver.
//!
//! Pulls unassigned changes one at a time, decides whether each joins the
//! transaction of its predecessor or starts a new one, and commits the
//! assignment before pulling the next change. Any error aborts the run;
//! committed assignments survive and drop out of the next run's input.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{DEFAULT_PAGE_LIMIT, PageRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::change_log_reader::MissingTransactionReader;
use crate::domain::port_error_mapping::map_row_change_error;
use crate::domain::ports::{
    BackfillReport, RowChangeRepository, TransactionBackfillCommand, TransactionIdGenerator,
    TransactionRepository,
};
use crate::domain::transaction_allocator::TransactionAllocator;
use crate::domain::transaction_matcher::{DEFAULT_ADJACENCY_WINDOW_MS, TransactionMatcher};
use crate::domain::{ClassifiedChange, Error, RowChange, Transaction, TransactionId};

/// Tunables of a backfill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    page_size: u32,
    adjacency_window_ms: i64,
}

impl BackfillConfig {
    /// Validate and build a configuration.
    pub fn new(page_size: u32, adjacency_window_ms: u64) -> Result<Self, Error> {
        PageRequest::first(page_size)
            .map_err(|err| Error::invalid_request(format!("invalid page size: {err}")))?;
        let adjacency_window_ms = i64::try_from(adjacency_window_ms)
            .ok()
            .filter(|window| *window > 0)
            .ok_or_else(|| {
                Error::invalid_request("adjacency window must be a positive number of milliseconds")
            })?;
        Ok(Self {
            page_size,
            adjacency_window_ms,
        })
    }

    /// Changes fetched per page.
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Adjacency window in milliseconds.
    pub const fn adjacency_window_ms(&self) -> i64 {
        self.adjacency_window_ms
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_LIMIT,
            adjacency_window_ms: DEFAULT_ADJACENCY_WINDOW_MS,
        }
    }
}

/// Store state observed before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillPreflight {
    /// Greatest transaction id allocated so far.
    pub max_transaction_id: Option<TransactionId>,
    /// Changes still lacking a transaction.
    pub missing_transactions: u64,
}

/// How a change was assigned to its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The change joined a transaction that already existed.
    Existing(TransactionId),
    /// A transaction was allocated and registered for the change.
    New(Transaction),
}

impl Assignment {
    /// Transaction the change belongs to.
    pub const fn transaction_id(&self) -> TransactionId {
        match self {
            Self::Existing(transaction_id) => *transaction_id,
            Self::New(transaction) => transaction.transaction_id,
        }
    }
}

/// Domain service implementing the backfill command.
pub struct TransactionBackfillService<R, T, G> {
    row_changes: Arc<R>,
    matcher: TransactionMatcher<R, T>,
    allocator: TransactionAllocator<G, T>,
    config: BackfillConfig,
}

impl<R, T, G> TransactionBackfillService<R, T, G> {
    /// Wire the service to its stores.
    pub fn new(
        row_changes: Arc<R>,
        transactions: Arc<T>,
        ids: Arc<G>,
        config: BackfillConfig,
    ) -> Self {
        Self {
            matcher: TransactionMatcher::new(
                Arc::clone(&row_changes),
                Arc::clone(&transactions),
                config.adjacency_window_ms(),
            ),
            allocator: TransactionAllocator::new(ids, transactions),
            row_changes,
            config,
        }
    }
}

impl<R, T, G> TransactionBackfillService<R, T, G>
where
    R: RowChangeRepository,
    T: TransactionRepository,
    G: TransactionIdGenerator,
{
    /// Report the current id high-water mark and the outstanding work.
    pub async fn preflight(&self) -> Result<BackfillPreflight, Error> {
        let max_transaction_id = self.allocator.current_max_id().await?;
        let missing_transactions = self
            .row_changes
            .count_missing_transactions()
            .await
            .map_err(map_row_change_error)?;
        Ok(BackfillPreflight {
            max_transaction_id,
            missing_transactions,
        })
    }

    /// Decide the transaction of `change`, creating one when none matches.
    ///
    /// `previous` is the change classified immediately before, if any.
    pub async fn find_or_create_transaction(
        &self,
        change: &RowChange,
        previous: Option<&ClassifiedChange>,
    ) -> Result<Assignment, Error> {
        if let Some(transaction_id) = self
            .matcher
            .find_matching_transaction(change, previous)
            .await?
        {
            return Ok(Assignment::Existing(transaction_id));
        }

        self.allocator
            .start_transaction_for_change(change)
            .await
            .map(Assignment::New)
    }

    async fn assign(&self, change: &RowChange, transaction_id: TransactionId) -> Result<(), Error> {
        self.row_changes
            .set_transaction_id(change.table_id, change.row_version, transaction_id)
            .await
            .map_err(map_row_change_error)
    }
}

#[async_trait]
impl<R, T, G> TransactionBackfillCommand for TransactionBackfillService<R, T, G>
where
    R: RowChangeRepository,
    T: TransactionRepository,
    G: TransactionIdGenerator,
{
    async fn start_backfill(&self) -> Result<BackfillReport, Error> {
        let preflight = self.preflight().await?;
        info!(
            max_transaction_id = ?preflight.max_transaction_id.map(TransactionId::get),
            missing_transactions = preflight.missing_transactions,
            "starting transaction backfill"
        );

        let mut reader =
            MissingTransactionReader::new(Arc::clone(&self.row_changes), self.config.page_size())?;
        let mut report = BackfillReport::default();
        let mut previous: Option<ClassifiedChange> = None;

        while let Some(change) = reader.next_change().await? {
            let assignment = self
                .find_or_create_transaction(&change, previous.as_ref())
                .await?;
            let transaction_id = assignment.transaction_id();
            self.assign(&change, transaction_id).await?;

            match assignment {
                Assignment::Existing(_) => report.transactions_reused += 1,
                Assignment::New(_) => report.transactions_created += 1,
            }
            report.changes_classified += 1;
            debug!(
                table_id = %change.table_id,
                row_version = change.row_version,
                %transaction_id,
                created = matches!(assignment, Assignment::New(_)),
                "classified row change"
            );
            previous = Some(ClassifiedChange::new(change, transaction_id));
        }

        info!(
            changes_classified = report.changes_classified,
            transactions_created = report.transactions_created,
            transactions_reused = report.transactions_reused,
            "transaction backfill complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "transaction_backfill_tests.rs"]
mod tests;
