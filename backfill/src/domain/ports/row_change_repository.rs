//! Driven port over the append-only table row-change log.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use super::define_port_error;
use crate::domain::{RowChange, TableId, TransactionId};

define_port_error! {
    /// Errors raised while reading or updating the change log.
    pub enum RowChangeRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "row change connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "row change query failed: {message}",
        /// The change was missing or already carried a transaction id.
        AlreadyAssigned { table_id: i64, row_version: i64 } =>
            "row change {table_id}/{row_version} is missing or already assigned",
    }
}

/// Port for paging, inspecting and classifying row changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowChangeRepository: Send + Sync {
    /// Fetch one page of changes whose transaction id is unset.
    ///
    /// Results are ordered by `(table_id, row_version)` ascending. A page
    /// shorter than the requested limit is the last one.
    async fn query_page(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, RowChangeRepositoryError>;

    /// Return the change of `table_id` with the greatest version strictly
    /// below `row_version`, if any.
    async fn get_max_version_below(
        &self,
        table_id: TableId,
        row_version: i64,
    ) -> Result<Option<RowChange>, RowChangeRepositoryError>;

    /// Record the transaction of one change.
    ///
    /// Only changes whose transaction id is still unset are updated; when no
    /// row matches, implementations return
    /// [`RowChangeRepositoryError::AlreadyAssigned`].
    async fn set_transaction_id(
        &self,
        table_id: TableId,
        row_version: i64,
        transaction_id: TransactionId,
    ) -> Result<(), RowChangeRepositoryError>;

    /// Count the changes still lacking a transaction id.
    async fn count_missing_transactions(&self) -> Result<u64, RowChangeRepositoryError>;
}
