//! Shared fixtures for integration tests.
//!
//! Services are wired to the in-memory adapters from
//! `txn_backfill::test_support`, which share one state per store.

#![allow(dead_code, reason = "each test binary uses a different subset")]

pub mod embedded_postgres;

use std::sync::Arc;

use txn_backfill::domain::{
    BackfillConfig, ColumnId, ColumnModel, ColumnType, FileMigrationSweepService, PrincipalId,
    Row, RowChange, TableFileMigrationService, TableId, TransactionBackfillService,
    TransactionId,
};
use txn_backfill::test_support::{InMemoryTableStore, InMemoryTransactionIdGenerator};

pub type BackfillService = TransactionBackfillService<
    InMemoryTableStore,
    InMemoryTableStore,
    InMemoryTransactionIdGenerator,
>;

pub type MigrationService =
    TableFileMigrationService<InMemoryTableStore, InMemoryTableStore, InMemoryTableStore>;

pub type SweepService = FileMigrationSweepService<MigrationService, InMemoryTableStore>;

/// Column id of the file-handle column registered by [`register_columns`].
pub const FILE_COLUMN: i64 = 10;
/// Column id of the string column registered by [`register_columns`].
pub const NAME_COLUMN: i64 = 11;

/// Unassigned change on `table_id` at `row_version`.
pub fn change(table_id: i64, row_version: i64, author: i64, created_on: i64) -> RowChange {
    RowChange {
        table_id: TableId::new(table_id),
        row_version,
        created_by: PrincipalId::new(author),
        created_on,
        transaction_id: None,
        etag: format!("etag-{table_id}-{row_version}"),
        column_ids: vec![ColumnId::new(NAME_COLUMN), ColumnId::new(FILE_COLUMN)],
        row_count: 1,
    }
}

/// Register one string column and one file-handle column.
pub fn register_columns(store: &InMemoryTableStore) {
    store.insert_column(ColumnModel {
        column_id: ColumnId::new(NAME_COLUMN),
        name: "name".to_owned(),
        column_type: ColumnType::String,
    });
    store.insert_column(ColumnModel {
        column_id: ColumnId::new(FILE_COLUMN),
        name: "attachment".to_owned(),
        column_type: ColumnType::Filehandleid,
    });
}

/// Row holding `name` and an optional file-handle cell.
pub fn row(row_id: i64, name: &str, file_handle: Option<&str>) -> Row {
    Row {
        row_id,
        version_number: 1,
        values: vec![Some(name.to_owned()), file_handle.map(str::to_owned)],
    }
}

/// Backfill service over `store` and `ids` reading `page_size` changes per
/// page.
pub fn backfill_service(
    store: &InMemoryTableStore,
    ids: &Arc<InMemoryTransactionIdGenerator>,
    page_size: u32,
) -> BackfillService {
    let shared = Arc::new(store.clone());
    TransactionBackfillService::new(
        Arc::clone(&shared),
        shared,
        Arc::clone(ids),
        BackfillConfig::new(page_size, 60_000).expect("valid config"),
    )
}

/// Migrator over `store`.
pub fn migration_service(store: &InMemoryTableStore) -> MigrationService {
    let shared = Arc::new(store.clone());
    TableFileMigrationService::new(Arc::clone(&shared), Arc::clone(&shared), shared)
}

/// Sweep over `store` with the given batch size.
pub fn sweep_service(store: &InMemoryTableStore, batch_size: u32) -> SweepService {
    FileMigrationSweepService::new(
        Arc::new(migration_service(store)),
        Arc::new(store.clone()),
        batch_size,
    )
    .expect("valid batch size")
}

/// Transaction assigned to a stored change.
pub fn assigned(store: &InMemoryTableStore, table_id: i64, row_version: i64) -> TransactionId {
    store
        .change(TableId::new(table_id), row_version)
        .and_then(|change| change.transaction_id)
        .expect("change should be assigned")
}
