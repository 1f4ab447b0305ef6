//! Driven port binding file handles to the tables that reference them.
//!
//! Bindings are written inside an explicit scope obtained from
//! [`FileAssociationIndex::begin`]. A scope must be finished with
//! [`FileAssociationScope::commit`] or [`FileAssociationScope::rollback`];
//! dropping it unfinished discards its writes.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{FileHandleId, TableId};

/// Object type recorded for table-owned associations.
pub const TABLE_ASSOCIATION_TYPE: &str = "table";

define_port_error! {
    /// Errors raised by the file-association index.
    pub enum FileAssociationIndexError {
        /// Index connection could not be established.
        Connection { message: String } =>
            "file association connection failed: {message}",
        /// Statement failed during execution.
        Query { message: String } =>
            "file association query failed: {message}",
        /// Opening, committing or rolling back the scope failed.
        Scope { message: String } =>
            "file association scope failed: {message}",
    }
}

/// Open write scope on the file-association index.
#[async_trait]
pub trait FileAssociationScope: Send {
    /// Associate every id in `file_handle_ids` with `table_id`.
    ///
    /// Existing associations are left untouched, so repeated binds are
    /// no-ops.
    async fn bind_file_handle_ids(
        &mut self,
        table_id: TableId,
        file_handle_ids: &BTreeSet<FileHandleId>,
    ) -> Result<(), FileAssociationIndexError>;

    /// Make the scope's writes durable.
    async fn commit(self: Box<Self>) -> Result<(), FileAssociationIndexError>;

    /// Discard the scope's writes.
    async fn rollback(self: Box<Self>) -> Result<(), FileAssociationIndexError>;
}

/// Port opening independent write scopes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileAssociationIndex: Send + Sync {
    /// Open a fresh scope, independent of any other open scope.
    async fn begin(&self) -> Result<Box<dyn FileAssociationScope>, FileAssociationIndexError>;
}
