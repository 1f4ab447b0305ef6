//! File-handle association index backed by `file_handle_association`.
//!
//! Each scope owns one pooled connection with an open database transaction.
//! A scope dropped without commit or rollback leaves its connection inside
//! the transaction; the pool treats such connections as broken and closes
//! them, which discards the writes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::debug;

use crate::domain::ports::{
    FileAssociationIndex, FileAssociationIndexError, FileAssociationScope, TABLE_ASSOCIATION_TYPE,
};
use crate::domain::{FileHandleId, TableId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::NewFileHandleAssociation;
use super::pool::DbPool;
use super::schema::file_handle_association;

type Manager = AnsiTransactionManager;

/// Diesel-backed implementation of the file-association port.
#[derive(Clone)]
pub struct DieselFileAssociationIndex {
    pool: DbPool,
}

impl DieselFileAssociationIndex {
    /// Create an index over the primary-store pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn scope_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> FileAssociationIndexError {
    move |error| {
        map_basic_diesel_error(
            error,
            operation,
            FileAssociationIndexError::scope,
            FileAssociationIndexError::connection,
        )
    }
}

#[async_trait]
impl FileAssociationIndex for DieselFileAssociationIndex {
    async fn begin(&self) -> Result<Box<dyn FileAssociationScope>, FileAssociationIndexError> {
        let mut conn = self
            .pool
            .get_owned()
            .await
            .map_err(|err| map_basic_pool_error(err, FileAssociationIndexError::connection))?;
        <Manager as TransactionManager<AsyncPgConnection>>::begin_transaction(&mut *conn)
            .await
            .map_err(scope_error("begin association scope"))?;

        let scope: Box<dyn FileAssociationScope> = Box::new(DieselAssociationScope { conn });
        Ok(scope)
    }
}

/// Open association scope holding its own connection.
struct DieselAssociationScope {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

#[async_trait]
impl FileAssociationScope for DieselAssociationScope {
    async fn bind_file_handle_ids(
        &mut self,
        table_id: TableId,
        file_handle_ids: &BTreeSet<FileHandleId>,
    ) -> Result<(), FileAssociationIndexError> {
        if file_handle_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<NewFileHandleAssociation<'_>> = file_handle_ids
            .iter()
            .map(|id| NewFileHandleAssociation {
                file_handle_id: id.get(),
                associated_object_id: table_id.get(),
                associated_object_type: TABLE_ASSOCIATION_TYPE,
            })
            .collect();

        let inserted = diesel::insert_into(file_handle_association::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(&mut *self.conn)
            .await
            .map_err(|err| {
                map_basic_diesel_error(
                    err,
                    "bind file handles",
                    FileAssociationIndexError::query,
                    FileAssociationIndexError::connection,
                )
            })?;
        debug!(
            table_id = table_id.get(),
            requested = rows.len(),
            inserted,
            "bound file handles"
        );
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        <Manager as TransactionManager<AsyncPgConnection>>::commit_transaction(&mut *self.conn)
            .await
            .map_err(scope_error("commit association scope"))
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        <Manager as TransactionManager<AsyncPgConnection>>::rollback_transaction(&mut *self.conn)
            .await
            .map_err(scope_error("roll back association scope"))
    }
}
