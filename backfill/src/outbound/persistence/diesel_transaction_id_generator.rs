//! Transaction-id allocation backed by the id-generation database.
//!
//! Every id is a row in `table_transaction_id`. New ids continue from the
//! stored maximum while the table is locked, so ids stay monotonic across
//! processes and restarts and above any row seeded by hand or by a restore.
//! Single ids are one-element blocks.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use mockable::Clock;

use crate::domain::TransactionId;
use crate::domain::ports::{
    TransactionIdBlockSource, TransactionIdGenerator, TransactionIdGeneratorError,
};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::pool::{DbPool, PoolError};
use super::schema::table_transaction_id;

const LOCK_IDS_SQL: &str = "LOCK TABLE table_transaction_id IN SHARE ROW EXCLUSIVE MODE";

const ALLOCATE_IDS_SQL: &str = r#"
INSERT INTO table_transaction_id (id, created_on)
SELECT stored.max_id + step, $1::bigint
FROM (SELECT COALESCE(MAX(id), 0) AS max_id FROM table_transaction_id) stored,
     generate_series(1, $2) AS step
RETURNING id
"#;

#[derive(QueryableByName)]
struct IdRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

/// Diesel-backed id generator over the id-generation pool.
#[derive(Clone)]
pub struct DieselTransactionIdGenerator {
    pool: DbPool,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl DieselTransactionIdGenerator {
    /// Create a generator; `clock` stamps each allocation.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { pool, clock }
    }

    fn now_millis(&self) -> i64 {
        self.clock.utc().timestamp_millis()
    }

    async fn max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let max: Option<i64> = table_transaction_id::table
            .select(diesel::dsl::max(table_transaction_id::id))
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "load max transaction id"))?;
        Ok(max.map(TransactionId::new))
    }

    /// Insert `count` consecutive ids above the stored maximum.
    ///
    /// The table lock serialises concurrent allocators; it is released when
    /// the surrounding transaction commits.
    async fn allocate(
        &self,
        count: u32,
    ) -> Result<Vec<TransactionId>, TransactionIdGeneratorError> {
        let count = i32::try_from(count).map_err(|_| {
            TransactionIdGeneratorError::query(format!("block size {count} is too large"))
        })?;
        let created_on = self.now_millis();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<IdRow> = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    diesel::sql_query(LOCK_IDS_SQL).execute(conn).await?;
                    diesel::sql_query(ALLOCATE_IDS_SQL)
                        .bind::<BigInt, _>(created_on)
                        .bind::<Integer, _>(count)
                        .load::<IdRow>(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "allocate transaction ids"))?;

        let mut ids: Vec<TransactionId> = rows
            .into_iter()
            .map(|row| TransactionId::new(row.id))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

fn map_pool_error(error: PoolError) -> TransactionIdGeneratorError {
    map_basic_pool_error(error, TransactionIdGeneratorError::connection)
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> TransactionIdGeneratorError {
    map_basic_diesel_error(
        error,
        operation,
        TransactionIdGeneratorError::query,
        TransactionIdGeneratorError::connection,
    )
}

#[async_trait]
impl TransactionIdGenerator for DieselTransactionIdGenerator {
    async fn next_transaction_id(&self) -> Result<TransactionId, TransactionIdGeneratorError> {
        self.allocate(1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransactionIdGeneratorError::query("allocation returned no id"))
    }

    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        self.max_id().await
    }
}

#[async_trait]
impl TransactionIdBlockSource for DieselTransactionIdGenerator {
    async fn reserve_block(
        &self,
        size: u32,
    ) -> Result<Vec<TransactionId>, TransactionIdGeneratorError> {
        self.allocate(size.max(1)).await
    }

    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        self.max_id().await
    }
}
