//! Row-change log entries and the transactions that group them.

use serde::{Deserialize, Serialize};

use super::{ColumnId, PrincipalId, TableId, TransactionId};

/// Globally unique key of a change: `(table_id, row_version)`.
///
/// Ordering is lexicographic on the tuple, which is the order in which the
/// backfill classifies changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeKey {
    /// Table the change was appended to.
    pub table_id: TableId,
    /// Version of the table produced by the change.
    pub row_version: i64,
}

impl ChangeKey {
    /// Build a key from its parts.
    pub const fn new(table_id: TableId, row_version: i64) -> Self {
        Self {
            table_id,
            row_version,
        }
    }
}

/// One row-set append operation on a table.
///
/// ## Invariants
/// - `(table_id, row_version)` is globally unique.
/// - `transaction_id` moves from `None` to `Some` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowChange {
    /// Table the change was appended to.
    pub table_id: TableId,
    /// Table version produced by this change.
    pub row_version: i64,
    /// Principal that appended the rows.
    pub created_by: PrincipalId,
    /// Append time in epoch milliseconds.
    pub created_on: i64,
    /// Transaction grouping, once assigned.
    pub transaction_id: Option<TransactionId>,
    /// Version token of the change record.
    pub etag: String,
    /// Columns referenced by the change, in cell order.
    pub column_ids: Vec<ColumnId>,
    /// Number of rows carried by the change.
    pub row_count: i64,
}

impl RowChange {
    /// Unique key of this change.
    pub fn key(&self) -> ChangeKey {
        ChangeKey::new(self.table_id, self.row_version)
    }
}

/// A change whose transaction assignment is known.
///
/// Threaded between consecutive classifications so the matcher can compare a
/// candidate against its immediate predecessor without a storage round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedChange {
    /// The classified change.
    pub change: RowChange,
    /// Transaction the change belongs to.
    pub transaction_id: TransactionId,
}

impl ClassifiedChange {
    /// Pair a change with its transaction, recording the id on the change.
    pub fn new(mut change: RowChange, transaction_id: TransactionId) -> Self {
        change.transaction_id = Some(transaction_id);
        Self {
            change,
            transaction_id,
        }
    }
}

/// A grouping of row changes believed to have been applied together.
///
/// ## Invariants
/// - Every change referencing `transaction_id` shares `table_id`.
/// - Immutable once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Allocator-assigned identifier.
    pub transaction_id: TransactionId,
    /// Table every member change belongs to.
    pub table_id: TableId,
    /// Principal that authored the first change.
    pub started_by: PrincipalId,
    /// Epoch milliseconds of the first change.
    pub started_on: i64,
}

impl Transaction {
    /// Describe a transaction opened by `change`.
    pub fn started_by_change(transaction_id: TransactionId, change: &RowChange) -> Self {
        Self {
            transaction_id,
            table_id: change.table_id,
            started_by: change.created_by,
            started_on: change.created_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn change(table: i64, version: i64) -> RowChange {
        RowChange {
            table_id: TableId::new(table),
            row_version: version,
            created_by: PrincipalId::new(7),
            created_on: 1_000,
            transaction_id: None,
            etag: "etag".to_owned(),
            column_ids: vec![ColumnId::new(1)],
            row_count: 1,
        }
    }

    #[rstest]
    fn keys_order_by_table_then_version() {
        let mut keys = vec![change(2, 1).key(), change(1, 9).key(), change(1, 3).key()];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ChangeKey::new(TableId::new(1), 3),
                ChangeKey::new(TableId::new(1), 9),
                ChangeKey::new(TableId::new(2), 1),
            ]
        );
    }

    #[rstest]
    fn classifying_records_transaction_on_change() {
        let classified = ClassifiedChange::new(change(1, 1), TransactionId::new(5));
        assert_eq!(classified.change.transaction_id, Some(TransactionId::new(5)));
    }

    #[rstest]
    fn transactions_inherit_table_author_and_time() {
        let source = change(42, 1);
        let transaction = Transaction::started_by_change(TransactionId::new(3), &source);
        assert_eq!(transaction.table_id, TableId::new(42));
        assert_eq!(transaction.started_by, PrincipalId::new(7));
        assert_eq!(transaction.started_on, 1_000);
    }
}
