//! PostgreSQL adapters for the backfill's driven ports.
//!
//! Adapters are thin: they translate between Diesel row structs and domain
//! values and map database failures onto port errors. Row structs
//! (`models.rs`) and table definitions (`schema.rs`) stay private to this
//! module.
//!
//! Two pools are expected: one for the primary store and one for the
//! transaction-id store.
//!
//! ```ignore
//! use txn_backfill::outbound::persistence::{DbPool, DieselRowChangeRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/tables")).await?;
//! let changes = DieselRowChangeRepository::new(pool);
//! ```

mod diesel_column_model_repository;
mod diesel_error_mapping;
mod diesel_file_association_index;
mod diesel_file_migration_ledger;
mod diesel_row_change_repository;
mod diesel_row_scanner;
mod diesel_transaction_id_generator;
mod diesel_transaction_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_column_model_repository::DieselColumnModelRepository;
pub use diesel_file_association_index::DieselFileAssociationIndex;
pub use diesel_file_migration_ledger::DieselFileMigrationLedger;
pub use diesel_row_change_repository::DieselRowChangeRepository;
pub use diesel_row_scanner::DieselRowScanner;
pub use diesel_transaction_id_generator::DieselTransactionIdGenerator;
pub use diesel_transaction_repository::DieselTransactionRepository;
pub use migrations::{MigrationError, MigrationTarget, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
