//! Migration ledger backed by `migrated_table_row_change`.
//!
//! A change counts as migrated only while its ledger entry carries the
//! change's current etag, so a rewritten change is listed again.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use mockable::Clock;
use pagination::{Page, PageRequest};

use crate::domain::RowChange;
use crate::domain::ports::{FileMigrationLedger, FileMigrationLedgerError, MigrationState};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewMigratedChange, RowChangeRow};
use super::pool::{DbPool, PoolError};
use super::schema::migrated_table_row_change;

const LIST_UNMIGRATED_SQL: &str = r#"
SELECT c.table_id, c.row_version, c.etag, c.created_by, c.created_on,
       c.transaction_id, c.column_ids, c.row_count
FROM table_row_change c
WHERE NOT EXISTS (
    SELECT 1
    FROM migrated_table_row_change m
    WHERE m.table_id = c.table_id
      AND m.row_version = c.row_version
      AND m.etag = c.etag
)
ORDER BY c.table_id, c.row_version
OFFSET $1
LIMIT $2
"#;

/// Diesel-backed implementation of the migration-ledger port.
#[derive(Clone)]
pub struct DieselFileMigrationLedger {
    pool: DbPool,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl DieselFileMigrationLedger {
    /// Create a ledger; `clock` stamps each recorded outcome.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> FileMigrationLedgerError {
    map_basic_pool_error(error, FileMigrationLedgerError::connection)
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> FileMigrationLedgerError {
    map_basic_diesel_error(
        error,
        operation,
        FileMigrationLedgerError::query,
        FileMigrationLedgerError::connection,
    )
}

#[async_trait]
impl FileMigrationLedger for DieselFileMigrationLedger {
    async fn list_unmigrated(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, FileMigrationLedgerError> {
        let (offset, limit) = request.sql_bounds();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RowChangeRow> = diesel::sql_query(LIST_UNMIGRATED_SQL)
            .bind::<BigInt, _>(offset)
            .bind::<BigInt, _>(limit)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list unmigrated changes"))?;
        Ok(Page::new(
            rows.into_iter().map(RowChange::from).collect(),
            request,
        ))
    }

    async fn record_outcome(
        &self,
        change: &RowChange,
        state: MigrationState,
    ) -> Result<(), FileMigrationLedgerError> {
        let entry = NewMigratedChange {
            table_id: change.table_id.get(),
            row_version: change.row_version,
            etag: &change.etag,
            state: state.as_str(),
            migrated_on: self.clock.utc().timestamp_millis(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(migrated_table_row_change::table)
            .values(&entry)
            .on_conflict((
                migrated_table_row_change::table_id,
                migrated_table_row_change::row_version,
            ))
            .do_update()
            .set((
                migrated_table_row_change::etag.eq(excluded(migrated_table_row_change::etag)),
                migrated_table_row_change::state.eq(excluded(migrated_table_row_change::state)),
                migrated_table_row_change::migrated_on
                    .eq(excluded(migrated_table_row_change::migrated_on)),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "record migration outcome"))?;
        Ok(())
    }
}
