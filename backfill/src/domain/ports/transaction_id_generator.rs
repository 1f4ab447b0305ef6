//! Driven ports for the dedicated transaction-id generation store.
//!
//! Ids handed out by either port are globally unique and strictly increasing
//! in allocation order, including across process restarts. Allocated ids are
//! never reused, so an id that is never registered is merely a gap.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::TransactionId;

define_port_error! {
    /// Errors raised by the id-generation store.
    pub enum TransactionIdGeneratorError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "transaction id store connection failed: {message}",
        /// Allocation or lookup failed during execution.
        Query { message: String } =>
            "transaction id store query failed: {message}",
        /// The store returned ids that were not strictly increasing.
        NonMonotonic { previous: i64, next: i64 } =>
            "transaction id {next} does not follow {previous}",
    }
}

/// Port allocating one transaction id per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionIdGenerator: Send + Sync {
    /// Durably allocate the next transaction id.
    async fn next_transaction_id(&self) -> Result<TransactionId, TransactionIdGeneratorError>;

    /// Greatest id allocated so far, or `None` when the store is empty.
    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError>;
}

/// Port reserving contiguous runs of ids in one round-trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionIdBlockSource: Send + Sync {
    /// Durably reserve `size` new ids.
    ///
    /// Every returned id is greater than any id returned by earlier calls.
    async fn reserve_block(
        &self,
        size: u32,
    ) -> Result<Vec<TransactionId>, TransactionIdGeneratorError>;

    /// Greatest id reserved so far, or `None` when the store is empty.
    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError>;
}
