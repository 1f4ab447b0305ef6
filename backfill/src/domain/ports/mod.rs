//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod column_model_repository;
mod file_association_index;
mod file_migration_ledger;
mod file_migration_sweep;
mod row_change_repository;
mod row_scanner;
mod table_file_migration_command;
mod transaction_backfill_command;
mod transaction_id_generator;
mod transaction_repository;

#[cfg(test)]
pub use column_model_repository::MockColumnModelRepository;
pub use column_model_repository::{ColumnModelRepository, ColumnModelRepositoryError};
#[cfg(test)]
pub use file_association_index::MockFileAssociationIndex;
pub use file_association_index::{
    FileAssociationIndex, FileAssociationIndexError, FileAssociationScope,
    TABLE_ASSOCIATION_TYPE,
};
#[cfg(test)]
pub use file_migration_ledger::MockFileMigrationLedger;
pub use file_migration_ledger::{FileMigrationLedger, FileMigrationLedgerError, MigrationState};
#[cfg(test)]
pub use file_migration_sweep::MockFileMigrationSweep;
pub use file_migration_sweep::{FileMigrationSweep, SweepReport};
#[cfg(test)]
pub use row_change_repository::MockRowChangeRepository;
pub use row_change_repository::{RowChangeRepository, RowChangeRepositoryError};
#[cfg(test)]
pub use row_scanner::MockRowScanner;
pub use row_scanner::{ChangeRows, RowScanner, RowScannerError};
#[cfg(test)]
pub use table_file_migration_command::MockTableFileMigrationCommand;
pub use table_file_migration_command::TableFileMigrationCommand;
#[cfg(test)]
pub use transaction_backfill_command::MockTransactionBackfillCommand;
pub use transaction_backfill_command::{BackfillReport, TransactionBackfillCommand};
#[cfg(test)]
pub use transaction_id_generator::{MockTransactionIdBlockSource, MockTransactionIdGenerator};
pub use transaction_id_generator::{
    TransactionIdBlockSource, TransactionIdGenerator, TransactionIdGeneratorError,
};
#[cfg(test)]
pub use transaction_repository::MockTransactionRepository;
pub use transaction_repository::{TransactionRepository, TransactionRepositoryError};
