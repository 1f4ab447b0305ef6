//! Entry point for the transaction and file-association backfill tools.

use std::ffi::OsString;

use clap::Parser;
use color_eyre::eyre::{WrapErr, eyre};
use ortho_config::OrthoConfig;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use txn_backfill::commands::{
    run_file_association_sweep, run_migrations, run_transaction_backfill,
};
use txn_backfill::inbound::cli::{BackfillSettings, Cli, Command};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = BackfillSettings::load_from_iter([OsString::from("txn-backfill")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?
        .resolve(cli.overrides())
        .wrap_err("invalid settings")?;

    match cli.command {
        Command::Migrate => {
            run_migrations(&settings).wrap_err("migration failed")?;
            info!("stores migrated");
        }
        Command::Transactions => {
            let report = runtime()?
                .block_on(run_transaction_backfill(&settings))
                .wrap_err("transaction backfill aborted")?;
            info!(
                changes_classified = report.changes_classified,
                transactions_created = report.transactions_created,
                transactions_reused = report.transactions_reused,
                "transaction backfill finished"
            );
        }
        Command::FileAssociations => {
            let report = runtime()?
                .block_on(run_file_association_sweep(&settings))
                .wrap_err("file association sweep aborted")?;
            info!(
                attempted = report.attempted(),
                succeeded = report.succeeded,
                failed = report.failed,
                "file association sweep finished"
            );
        }
    }
    Ok(())
}

fn runtime() -> color_eyre::Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start the async runtime")
}
