//! PostgreSQL-backed column schema lookups.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ColumnModelRepository, ColumnModelRepositoryError};
use crate::domain::{ColumnId, ColumnModel};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::ColumnModelRow;
use super::pool::DbPool;
use super::schema::column_model;

/// Diesel-backed implementation of the column-model port.
#[derive(Clone)]
pub struct DieselColumnModelRepository {
    pool: DbPool,
}

impl DieselColumnModelRepository {
    /// Create a repository over the primary-store pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ColumnModelRepository for DieselColumnModelRepository {
    async fn get_columns(
        &self,
        column_ids: &[ColumnId],
    ) -> Result<Vec<ColumnModel>, ColumnModelRepositoryError> {
        if column_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = column_ids.iter().map(|id| id.get()).collect();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_basic_pool_error(err, ColumnModelRepositoryError::connection))?;
        let rows: Vec<ColumnModelRow> = column_model::table
            .filter(column_model::column_id.eq_any(&ids))
            .select(ColumnModelRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| {
                map_basic_diesel_error(
                    err,
                    "load column models",
                    ColumnModelRepositoryError::query,
                    ColumnModelRepositoryError::connection,
                )
            })?;

        rows.into_iter()
            .map(|row| ColumnModel::try_from(row).map_err(ColumnModelRepositoryError::decode))
            .collect()
    }
}
