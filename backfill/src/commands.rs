//! Composition root: wires the PostgreSQL adapters into the domain services.
//!
//! Each entry point builds its own pools from [`ResolvedSettings`], runs one
//! service to completion and returns the service's report.

use std::sync::Arc;

use mockable::DefaultClock;
use thiserror::Error;

use crate::domain::ports::{
    BackfillReport, FileMigrationSweep, SweepReport, TransactionBackfillCommand,
    TransactionIdGenerator,
};
use crate::domain::{
    BackfillConfig, BlockTransactionIdGenerator, Error, FileMigrationSweepService,
    TableFileMigrationService, TransactionBackfillService,
};
use crate::inbound::cli::{ResolvedSettings, SettingsError};
use crate::outbound::persistence::{
    DbPool, DieselColumnModelRepository, DieselFileAssociationIndex, DieselFileMigrationLedger,
    DieselRowChangeRepository, DieselRowScanner, DieselTransactionIdGenerator,
    DieselTransactionRepository, MigrationError, MigrationTarget, PoolConfig, PoolError,
    run_pending_migrations,
};

/// Errors surfaced by the command entry points.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Settings were missing or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A store pool could not be built.
    #[error("failed to connect to the {store} store: {source}")]
    Pool {
        /// Store name.
        store: &'static str,
        /// Underlying failure.
        #[source]
        source: PoolError,
    },
    /// Schema migrations failed.
    #[error("failed to migrate the {store} store: {source}")]
    Migration {
        /// Store name.
        store: &'static str,
        /// Underlying failure.
        #[source]
        source: MigrationError,
    },
    /// The service aborted.
    #[error(transparent)]
    Domain(#[from] Error),
}

/// Pools for the primary and id-generation stores.
struct Stores {
    primary: DbPool,
    ids: DbPool,
}

impl Stores {
    async fn connect(settings: &ResolvedSettings) -> Result<Self, CommandError> {
        let max_size = settings.pool_max_size;
        let primary = pool_for("primary", &settings.database_url, max_size).await?;
        let ids = pool_for("id_generator", &settings.id_generator_url, max_size).await?;
        Ok(Self { primary, ids })
    }
}

async fn pool_for(
    store: &'static str,
    database_url: &str,
    max_size: u32,
) -> Result<DbPool, CommandError> {
    DbPool::new(PoolConfig::new(database_url).with_max_size(max_size))
        .await
        .map_err(|source| CommandError::Pool { store, source })
}

/// Assign a transaction to every change still missing one.
///
/// # Errors
///
/// Returns [`CommandError::Domain`] when the backfill aborts; changes
/// assigned before the failure stay assigned.
pub async fn run_transaction_backfill(
    settings: &ResolvedSettings,
) -> Result<BackfillReport, CommandError> {
    let stores = Stores::connect(settings).await?;
    let config = BackfillConfig::new(settings.page_size, settings.adjacency_window_ms)?;
    let generator = Arc::new(DieselTransactionIdGenerator::new(
        stores.ids.clone(),
        Arc::new(DefaultClock),
    ));

    let report = if settings.id_block_size <= 1 {
        backfill_with(&stores, generator, config).await?
    } else {
        let blocks = Arc::new(BlockTransactionIdGenerator::new(
            generator,
            settings.id_block_size,
        ));
        backfill_with(&stores, blocks, config).await?
    };
    Ok(report)
}

async fn backfill_with<G>(
    stores: &Stores,
    ids: Arc<G>,
    config: BackfillConfig,
) -> Result<BackfillReport, Error>
where
    G: TransactionIdGenerator,
{
    let service = TransactionBackfillService::new(
        Arc::new(DieselRowChangeRepository::new(stores.primary.clone())),
        Arc::new(DieselTransactionRepository::new(stores.primary.clone())),
        ids,
        config,
    );
    service.start_backfill().await
}

/// Bind file handles for every change not yet migrated.
///
/// # Errors
///
/// Returns [`CommandError::Domain`] when listing or ledger writes fail;
/// per-change migration failures are recorded and do not abort.
pub async fn run_file_association_sweep(
    settings: &ResolvedSettings,
) -> Result<SweepReport, CommandError> {
    let primary = pool_for("primary", &settings.database_url, settings.pool_max_size).await?;
    let migrator = TableFileMigrationService::new(
        Arc::new(DieselColumnModelRepository::new(primary.clone())),
        Arc::new(DieselRowScanner::new(primary.clone())),
        Arc::new(DieselFileAssociationIndex::new(primary.clone())),
    );
    let ledger = DieselFileMigrationLedger::new(primary, Arc::new(DefaultClock));
    let sweep = FileMigrationSweepService::new(
        Arc::new(migrator),
        Arc::new(ledger),
        settings.sweep_batch_size,
    )?;
    Ok(sweep.run().await?)
}

/// Apply pending schema migrations to both stores.
///
/// Blocking; call before starting the async runtime.
///
/// # Errors
///
/// Returns [`CommandError::Migration`] naming the store that failed.
pub fn run_migrations(settings: &ResolvedSettings) -> Result<(), CommandError> {
    for (url, target) in [
        (&settings.database_url, MigrationTarget::Primary),
        (&settings.id_generator_url, MigrationTarget::IdGenerator),
    ] {
        run_pending_migrations(url, target).map_err(|source| CommandError::Migration {
            store: target.as_str(),
            source,
        })?;
    }
    Ok(())
}
