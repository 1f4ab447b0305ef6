//! Row scans over the `table_row` payload table.
//!
//! Rows are loaded in one query and decoded lazily, so a malformed payload
//! surfaces at its position in the sequence rather than failing the load.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ChangeRows, RowScanner, RowScannerError};
use crate::domain::{Row, RowChange};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::TableRowRow;
use super::pool::DbPool;
use super::schema::table_row;

/// Diesel-backed implementation of the row-scanner port.
#[derive(Clone)]
pub struct DieselRowScanner {
    pool: DbPool,
}

impl DieselRowScanner {
    /// Create a scanner over the primary-store pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode(row: TableRowRow) -> Result<Row, RowScannerError> {
    Row::try_from(row).map_err(RowScannerError::decode)
}

#[async_trait]
impl RowScanner for DieselRowScanner {
    async fn scan_change(&self, change: &RowChange) -> Result<ChangeRows, RowScannerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_basic_pool_error(err, RowScannerError::connection))?;
        let rows: Vec<TableRowRow> = table_row::table
            .filter(table_row::table_id.eq(change.table_id.get()))
            .filter(table_row::row_version.eq(change.row_version))
            .order(table_row::row_id.asc())
            .select(TableRowRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| {
                map_basic_diesel_error(
                    err,
                    "load change rows",
                    RowScannerError::query,
                    RowScannerError::connection,
                )
            })?;

        Ok(ChangeRows::new(rows.into_iter().map(decode)))
    }
}
