//! PostgreSQL-backed transaction registrations.

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TransactionRepository, TransactionRepositoryError};
use crate::domain::{Transaction, TransactionId};

use super::diesel_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::TransactionRow;
use super::pool::{DbPool, PoolError};
use super::schema::table_transaction;

/// Diesel-backed implementation of the transaction port.
#[derive(Clone)]
pub struct DieselTransactionRepository {
    pool: DbPool,
}

impl DieselTransactionRepository {
    /// Create a repository over the primary-store pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> TransactionRepositoryError {
    map_basic_pool_error(error, TransactionRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> TransactionRepositoryError {
    map_basic_diesel_error(
        error,
        operation,
        TransactionRepositoryError::query,
        TransactionRepositoryError::connection,
    )
}

#[async_trait]
impl TransactionRepository for DieselTransactionRepository {
    async fn insert(&self, transaction: &Transaction) -> Result<(), TransactionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = TransactionRow::from(transaction);

        match diesel::insert_into(table_transaction::table)
            .values(&row)
            .execute(&mut conn)
            .await
        {
            Ok(_) => Ok(()),
            Err(error) if is_unique_violation(&error) => Err(
                TransactionRepositoryError::duplicate(transaction.transaction_id.get()),
            ),
            Err(error) => Err(map_diesel_error(error, "register transaction")),
        }
    }

    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, TransactionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = table_transaction::table
            .find(transaction_id.get())
            .select(TransactionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "load transaction"))?;
        Ok(row.map(Transaction::from))
    }
}
