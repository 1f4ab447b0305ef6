//! Adjacency rule deciding whether a change joins an existing transaction.
//!
//! Two changes belong to the same transaction when they touch the same
//! table, share an author and the earlier one was created within the
//! adjacency window before the later one.

use std::sync::Arc;

use tracing::trace;

use crate::domain::port_error_mapping::{map_row_change_error, map_transaction_error};
use crate::domain::ports::{RowChangeRepository, TransactionRepository};
use crate::domain::{ClassifiedChange, Error, RowChange, TransactionId};

/// Default adjacency window: one minute.
pub const DEFAULT_ADJACENCY_WINDOW_MS: i64 = 60_000;

/// Apply the adjacency rule to a `(previous, candidate)` pair.
///
/// The comparison is strict: a predecessor created exactly `window_ms`
/// before the candidate does not match.
///
/// # Examples
/// ```
/// use txn_backfill::domain::{
///     ColumnId, PrincipalId, RowChange, TableId, changes_are_from_same_transaction,
/// };
///
/// let change = |row_version, created_on| RowChange {
///     table_id: TableId::new(42),
///     row_version,
///     created_by: PrincipalId::new(7),
///     created_on,
///     transaction_id: None,
///     etag: String::new(),
///     column_ids: vec![ColumnId::new(1)],
///     row_count: 1,
/// };
/// assert!(changes_are_from_same_transaction(&change(1, 0), &change(2, 59_999), 60_000));
/// assert!(!changes_are_from_same_transaction(&change(1, 0), &change(2, 60_000), 60_000));
/// ```
pub fn changes_are_from_same_transaction(
    previous: &RowChange,
    candidate: &RowChange,
    window_ms: i64,
) -> bool {
    previous.table_id == candidate.table_id
        && previous.created_by == candidate.created_by
        && previous.created_on > candidate.created_on.saturating_sub(window_ms)
}

/// Finds the transaction a candidate change should join, if any.
pub struct TransactionMatcher<R, T> {
    row_changes: Arc<R>,
    transactions: Arc<T>,
    window_ms: i64,
}

impl<R, T> TransactionMatcher<R, T> {
    /// Create a matcher using `window_ms` as the adjacency window.
    pub fn new(row_changes: Arc<R>, transactions: Arc<T>, window_ms: i64) -> Self {
        Self {
            row_changes,
            transactions,
            window_ms,
        }
    }
}

impl<R, T> TransactionMatcher<R, T>
where
    R: RowChangeRepository,
    T: TransactionRepository,
{
    /// Return the transaction `candidate` belongs to, or `None` when it must
    /// start a new one.
    ///
    /// `previous` is the change classified immediately before `candidate`.
    /// When it is absent, belongs to another table or is not an earlier
    /// version of the candidate's table, the nearest earlier change of the
    /// candidate's table is loaded from storage instead, and its transaction
    /// is only reused when it is registered for the same table.
    pub async fn find_matching_transaction(
        &self,
        candidate: &RowChange,
        previous: Option<&ClassifiedChange>,
    ) -> Result<Option<TransactionId>, Error> {
        let predecessor = previous.filter(|p| {
            p.change.table_id == candidate.table_id && p.change.row_version < candidate.row_version
        });
        if let Some(previous) = predecessor {
            let joined = changes_are_from_same_transaction(
                &previous.change,
                candidate,
                self.window_ms,
            );
            return Ok(joined.then_some(previous.transaction_id));
        }

        self.match_from_storage(candidate).await
    }

    async fn match_from_storage(&self, candidate: &RowChange) -> Result<Option<TransactionId>, Error> {
        let Some(prior) = self
            .row_changes
            .get_max_version_below(candidate.table_id, candidate.row_version)
            .await
            .map_err(map_row_change_error)?
        else {
            return Ok(None);
        };
        let Some(transaction_id) = prior.transaction_id else {
            return Ok(None);
        };
        if !changes_are_from_same_transaction(&prior, candidate, self.window_ms) {
            return Ok(None);
        }

        let registered = self
            .transactions
            .find_transaction(transaction_id)
            .await
            .map_err(map_transaction_error)?;
        let matched = registered
            .filter(|transaction| transaction.table_id == candidate.table_id)
            .map(|transaction| transaction.transaction_id);
        if matched.is_none() {
            trace!(
                table_id = %candidate.table_id,
                row_version = candidate.row_version,
                %transaction_id,
                "predecessor transaction is not registered for this table"
            );
        }
        Ok(matched)
    }
}
