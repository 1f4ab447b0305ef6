//! Embedded PostgreSQL stores for adapter integration tests.
//!
//! Each test gets two temporary databases on the shared embedded cluster,
//! one per store, migrated with the crate's own embedded migrations. Seeding
//! and inspection go through a plain `postgres` client so test setup never
//! shares Diesel's connection or transaction state.

use std::collections::BTreeSet;

use pg_embedded_setup_unpriv::TemporaryDatabase;
use pg_embedded_setup_unpriv::test_support::shared_cluster_handle;
use postgres::{Client, NoTls};
use serde_json::Value;
use txn_backfill::domain::RowChange;
use txn_backfill::inbound::cli::ResolvedSettings;
use txn_backfill::outbound::persistence::{MigrationTarget, run_pending_migrations};

/// Returns true when `SKIP_TEST_CLUSTER` is set to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when `SKIP_TEST_CLUSTER` is set; otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Render a `postgres` error with its SQLSTATE and detail when present.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

/// Migrated primary and id-generation databases.
///
/// Dropping the value drops both databases.
pub struct EmbeddedStores {
    primary: TemporaryDatabase,
    ids: TemporaryDatabase,
}

impl EmbeddedStores {
    /// Provision and migrate both stores.
    ///
    /// Blocking; call outside any Tokio runtime.
    pub fn provision() -> Result<Self, String> {
        let cluster = shared_cluster_handle().map_err(|err| format!("cluster: {err:?}"))?;
        let primary = cluster
            .create_temporary_database()
            .map_err(|err| format!("create primary database: {err:?}"))?;
        let ids = cluster
            .create_temporary_database()
            .map_err(|err| format!("create id database: {err:?}"))?;

        run_pending_migrations(primary.url(), MigrationTarget::Primary)
            .map_err(|err| err.to_string())?;
        run_pending_migrations(ids.url(), MigrationTarget::IdGenerator)
            .map_err(|err| err.to_string())?;
        Ok(Self { primary, ids })
    }

    /// Primary store URL.
    pub fn primary_url(&self) -> &str {
        self.primary.url()
    }

    /// Id-generation store URL.
    pub fn ids_url(&self) -> &str {
        self.ids.url()
    }

    /// Settings pointing the command entry points at these stores.
    pub fn settings(&self, page_size: u32, id_block_size: u32) -> ResolvedSettings {
        ResolvedSettings {
            database_url: self.primary_url().to_owned(),
            id_generator_url: self.ids_url().to_owned(),
            page_size,
            adjacency_window_ms: 60_000,
            id_block_size,
            sweep_batch_size: 2,
            pool_max_size: 2,
        }
    }

    fn primary_client(&self) -> Client {
        connect(self.primary_url())
    }

    fn ids_client(&self) -> Client {
        connect(self.ids_url())
    }

    /// Insert `change` into the change log.
    pub fn seed_change(&self, change: &RowChange) {
        let column_ids: Vec<i64> = change.column_ids.iter().map(|id| id.get()).collect();
        let transaction_id = change.transaction_id.map(|id| id.get());
        self.primary_client()
            .execute(
                "INSERT INTO table_row_change \
                 (table_id, row_version, etag, created_by, created_on, transaction_id, \
                  column_ids, row_count) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &change.table_id.get(),
                    &change.row_version,
                    &change.etag,
                    &change.created_by.get(),
                    &change.created_on,
                    &transaction_id,
                    &column_ids,
                    &change.row_count,
                ],
            )
            .unwrap_or_else(|err| panic!("seed change: {}", format_postgres_error(&err)));
    }

    /// Rewrite the etag of a stored change.
    pub fn set_etag(&self, table_id: i64, row_version: i64, etag: &str) {
        self.primary_client()
            .execute(
                "UPDATE table_row_change SET etag = $3 \
                 WHERE table_id = $1 AND row_version = $2",
                &[&table_id, &row_version, &etag],
            )
            .unwrap_or_else(|err| panic!("rewrite etag: {}", format_postgres_error(&err)));
    }

    /// Register a column model.
    pub fn seed_column(&self, column_id: i64, name: &str, column_type: &str) {
        self.primary_client()
            .execute(
                "INSERT INTO column_model (column_id, name, column_type) VALUES ($1, $2, $3)",
                &[&column_id, &name, &column_type],
            )
            .unwrap_or_else(|err| panic!("seed column: {}", format_postgres_error(&err)));
    }

    /// Store one row of a change with raw JSON `cells`.
    pub fn seed_row(&self, table_id: i64, row_version: i64, row_id: i64, cells: Value) {
        self.primary_client()
            .execute(
                "INSERT INTO table_row (table_id, row_version, row_id, version_number, cells) \
                 VALUES ($1, $2, $3, 1, $4)",
                &[&table_id, &row_version, &row_id, &cells],
            )
            .unwrap_or_else(|err| panic!("seed row: {}", format_postgres_error(&err)));
    }

    /// Record `id` as already allocated in the id store.
    pub fn seed_transaction_id(&self, id: i64) {
        self.ids_client()
            .execute(
                "INSERT INTO table_transaction_id (id, created_on) VALUES ($1, 0)",
                &[&id],
            )
            .unwrap_or_else(|err| panic!("seed id: {}", format_postgres_error(&err)));
    }

    /// Transaction recorded on a change, if any.
    pub fn transaction_of(&self, table_id: i64, row_version: i64) -> Option<i64> {
        self.primary_client()
            .query_one(
                "SELECT transaction_id FROM table_row_change \
                 WHERE table_id = $1 AND row_version = $2",
                &[&table_id, &row_version],
            )
            .unwrap_or_else(|err| panic!("load change: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Table owning a registered transaction.
    pub fn transaction_table(&self, transaction_id: i64) -> Option<i64> {
        self.primary_client()
            .query_opt(
                "SELECT table_id FROM table_transaction WHERE transaction_id = $1",
                &[&transaction_id],
            )
            .unwrap_or_else(|err| panic!("load transaction: {}", format_postgres_error(&err)))
            .map(|row| row.get(0))
    }

    /// File handles bound to `table_id`.
    pub fn associations(&self, table_id: i64) -> BTreeSet<i64> {
        self.primary_client()
            .query(
                "SELECT file_handle_id FROM file_handle_association \
                 WHERE associated_object_id = $1 AND associated_object_type = 'table'",
                &[&table_id],
            )
            .unwrap_or_else(|err| panic!("load associations: {}", format_postgres_error(&err)))
            .iter()
            .map(|row| row.get(0))
            .collect()
    }

    /// Ledger state and etag recorded for a change.
    pub fn ledger_entry(&self, table_id: i64, row_version: i64) -> Option<(String, String)> {
        self.primary_client()
            .query_opt(
                "SELECT state, etag FROM migrated_table_row_change \
                 WHERE table_id = $1 AND row_version = $2",
                &[&table_id, &row_version],
            )
            .unwrap_or_else(|err| panic!("load ledger: {}", format_postgres_error(&err)))
            .map(|row| (row.get(0), row.get(1)))
    }
}

fn connect(url: &str) -> Client {
    Client::connect(url, NoTls)
        .unwrap_or_else(|err| panic!("connect {url}: {}", format_postgres_error(&err)))
}
