//! Driven port for transaction registrations in the primary store.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Transaction, TransactionId};

define_port_error! {
    /// Errors raised while reading or registering transactions.
    pub enum TransactionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "transaction repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "transaction repository query failed: {message}",
        /// A transaction with the same id is already registered.
        Duplicate { transaction_id: i64 } =>
            "transaction {transaction_id} is already registered",
    }
}

/// Port for registering and looking up transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Register a new transaction. Registrations are immutable.
    async fn insert(&self, transaction: &Transaction) -> Result<(), TransactionRepositoryError>;

    /// Look up a registered transaction by id.
    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, TransactionRepositoryError>;
}
