//! PostgreSQL-backed change-log adapter.

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{Page, PageRequest};

use crate::domain::ports::{RowChangeRepository, RowChangeRepositoryError};
use crate::domain::{RowChange, TableId, TransactionId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::RowChangeRow;
use super::pool::{DbPool, PoolError};
use super::schema::table_row_change;

/// Diesel-backed implementation of the change-log port.
#[derive(Clone)]
pub struct DieselRowChangeRepository {
    pool: DbPool,
}

impl DieselRowChangeRepository {
    /// Create a repository over the primary-store pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RowChangeRepositoryError {
    map_basic_pool_error(error, RowChangeRepositoryError::connection)
}

fn map_diesel_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> RowChangeRepositoryError {
    move |error| {
        map_basic_diesel_error(
            error,
            operation,
            RowChangeRepositoryError::query,
            RowChangeRepositoryError::connection,
        )
    }
}

#[async_trait]
impl RowChangeRepository for DieselRowChangeRepository {
    async fn query_page(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, RowChangeRepositoryError> {
        let (offset, limit) = request.sql_bounds();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RowChangeRow> = table_row_change::table
            .filter(table_row_change::transaction_id.is_null())
            .order((
                table_row_change::table_id.asc(),
                table_row_change::row_version.asc(),
            ))
            .offset(offset)
            .limit(limit)
            .select(RowChangeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("load unassigned changes"))?;
        Ok(Page::new(
            rows.into_iter().map(RowChange::from).collect(),
            request,
        ))
    }

    async fn get_max_version_below(
        &self,
        table_id: TableId,
        row_version: i64,
    ) -> Result<Option<RowChange>, RowChangeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = table_row_change::table
            .filter(table_row_change::table_id.eq(table_id.get()))
            .filter(table_row_change::row_version.lt(row_version))
            .order(table_row_change::row_version.desc())
            .select(RowChangeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error("load preceding change"))?;
        Ok(row.map(RowChange::from))
    }

    async fn set_transaction_id(
        &self,
        table_id: TableId,
        row_version: i64,
        transaction_id: TransactionId,
    ) -> Result<(), RowChangeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(table_row_change::table)
            .filter(table_row_change::table_id.eq(table_id.get()))
            .filter(table_row_change::row_version.eq(row_version))
            .filter(table_row_change::transaction_id.is_null())
            .set(table_row_change::transaction_id.eq(Some(transaction_id.get())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error("assign transaction"))?;

        if updated == 0 {
            return Err(RowChangeRepositoryError::already_assigned(
                table_id.get(),
                row_version,
            ));
        }
        Ok(())
    }

    async fn count_missing_transactions(&self) -> Result<u64, RowChangeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = table_row_change::table
            .filter(table_row_change::transaction_id.is_null())
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error("count unassigned changes"))?;
        u64::try_from(count)
            .map_err(|_| RowChangeRepositoryError::query("negative change count"))
    }
}
