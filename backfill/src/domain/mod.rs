//! Domain types, ports and services of the backfill engine.
//!
//! Purpose: classify historical table row changes into transactions and
//! re-bind the file handles their rows reference. The domain talks to storage
//! only through the traits in [`ports`]; adapters live under `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: domain failure payload with a stable code.
//! - RowChange, Transaction, ClassifiedChange: change-log aggregates.
//! - ColumnModel, ColumnType, Row: schema and payload of changes.
//! - TransactionBackfillService, TableFileMigrationService,
//!   FileMigrationSweepService: driving-port implementations.

pub mod error;
pub mod ids;
pub mod ports;
pub mod row_change;
pub mod table_schema;

mod change_log_reader;
mod file_migration_sweep;
pub(crate) mod port_error_mapping;
mod table_file_migration;
mod transaction_allocator;
mod transaction_backfill;
mod transaction_matcher;

pub use self::change_log_reader::MissingTransactionReader;
pub use self::error::{Error, ErrorCode};
pub use self::file_migration_sweep::FileMigrationSweepService;
pub use self::ids::{ColumnId, FileHandleId, PrincipalId, TableId, TransactionId};
pub use self::row_change::{ChangeKey, ClassifiedChange, RowChange, Transaction};
pub use self::table_file_migration::{TableFileMigrationService, file_handle_ids_in_rows};
pub use self::table_schema::{ColumnModel, ColumnType, Row, UnknownColumnType};
pub use self::transaction_allocator::{
    BlockTransactionIdGenerator, DEFAULT_ID_BLOCK_SIZE, TransactionAllocator,
};
pub use self::transaction_backfill::{
    Assignment, BackfillConfig, BackfillPreflight, TransactionBackfillService,
};
pub use self::transaction_matcher::{
    DEFAULT_ADJACENCY_WINDOW_MS, TransactionMatcher, changes_are_from_same_transaction,
};
