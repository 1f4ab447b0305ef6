//! Embedded schema migrations for both stores.
//!
//! Migrations run over a blocking [`PgConnection`]; callers run them before
//! any async work starts.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

const PRIMARY_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/primary");
const ID_GENERATOR_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/id_generator");

/// Errors raised while migrating a store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migration: {message}")]
    Connect {
        /// Underlying failure.
        message: String,
    },
    /// A pending migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply {
        /// Underlying failure.
        message: String,
    },
}

/// Store a migration set targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Change log, transactions, rows, columns, associations and ledger.
    Primary,
    /// Transaction-id sequence.
    IdGenerator,
}

impl MigrationTarget {
    fn migrations(self) -> EmbeddedMigrations {
        match self {
            Self::Primary => PRIMARY_MIGRATIONS,
            Self::IdGenerator => ID_GENERATOR_MIGRATIONS,
        }
    }

    /// Short name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::IdGenerator => "id_generator",
        }
    }
}

/// Apply every pending migration of `target` to `database_url`.
///
/// Returns the versions applied by this call, oldest first.
///
/// # Errors
///
/// Returns [`MigrationError::Connect`] when the database is unreachable and
/// [`MigrationError::Apply`] when a migration fails.
pub fn run_pending_migrations(
    database_url: &str,
    target: MigrationTarget,
) -> Result<Vec<String>, MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| MigrationError::Connect {
        message: err.to_string(),
    })?;
    let applied = conn
        .run_pending_migrations(target.migrations())
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    let versions: Vec<String> = applied.iter().map(ToString::to_string).collect();
    info!(
        target_store = target.as_str(),
        applied = versions.len(),
        "migrations applied"
    );
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use diesel::migration::MigrationSource;
    use diesel::pg::Pg;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(MigrationTarget::Primary, 2)]
    #[case(MigrationTarget::IdGenerator, 1)]
    fn embedded_sets_contain_every_migration(
        #[case] target: MigrationTarget,
        #[case] expected: usize,
    ) {
        let migrations =
            MigrationSource::<Pg>::migrations(&target.migrations()).expect("embedded migrations");
        assert_eq!(migrations.len(), expected);
    }

    #[rstest]
    fn unreachable_databases_fail_to_connect() {
        let error = run_pending_migrations("postgres://invalid host/none", MigrationTarget::Primary)
            .expect_err("connection must fail");
        assert!(matches!(error, MigrationError::Connect { .. }));
    }
}
