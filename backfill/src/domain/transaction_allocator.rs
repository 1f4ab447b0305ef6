//! Allocation and registration of new transactions.
//!
//! A new transaction takes two steps against two stores. First an id is
//! allocated from the id-generation store, then the transaction is
//! registered in the primary store. The steps are not atomic. A crash
//! between them leaves an allocated id that nothing references, which is
//! only a gap. Registration never happens without a durable id.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::port_error_mapping::{map_id_generator_error, map_transaction_error};
use crate::domain::ports::{
    TransactionIdBlockSource, TransactionIdGenerator, TransactionIdGeneratorError,
    TransactionRepository,
};
use crate::domain::{Error, RowChange, Transaction, TransactionId};

/// Default number of ids reserved per round-trip.
pub const DEFAULT_ID_BLOCK_SIZE: u32 = 1_000;

/// Starts new transactions for changes that matched none.
pub struct TransactionAllocator<G, T> {
    ids: Arc<G>,
    transactions: Arc<T>,
}

impl<G, T> TransactionAllocator<G, T> {
    /// Create an allocator over an id generator and the transaction store.
    pub fn new(ids: Arc<G>, transactions: Arc<T>) -> Self {
        Self { ids, transactions }
    }
}

impl<G, T> TransactionAllocator<G, T>
where
    G: TransactionIdGenerator,
    T: TransactionRepository,
{
    /// Allocate an id and register a transaction opened by `change`.
    pub async fn start_transaction_for_change(
        &self,
        change: &RowChange,
    ) -> Result<Transaction, Error> {
        let transaction_id = self
            .ids
            .next_transaction_id()
            .await
            .map_err(map_id_generator_error)?;
        let transaction = Transaction::started_by_change(transaction_id, change);
        self.transactions
            .insert(&transaction)
            .await
            .map_err(map_transaction_error)?;
        debug!(
            table_id = %transaction.table_id,
            %transaction_id,
            started_on = transaction.started_on,
            "registered new transaction"
        );
        Ok(transaction)
    }

    /// Greatest id allocated so far.
    pub async fn current_max_id(&self) -> Result<Option<TransactionId>, Error> {
        self.ids
            .current_max_id()
            .await
            .map_err(map_id_generator_error)
    }
}

#[derive(Debug, Default)]
struct ReservedIds {
    pending: VecDeque<TransactionId>,
    last_issued: Option<TransactionId>,
}

/// Id generator handing out ids from blocks reserved in advance.
///
/// Ids left in a block when the process exits are never issued; they remain
/// gaps because the store never hands them out again.
pub struct BlockTransactionIdGenerator<S> {
    source: Arc<S>,
    block_size: u32,
    reserved: Mutex<ReservedIds>,
}

impl<S> BlockTransactionIdGenerator<S> {
    /// Create a generator reserving `block_size` ids at a time. A size of
    /// zero is treated as one.
    pub fn new(source: Arc<S>, block_size: u32) -> Self {
        Self {
            source,
            block_size: block_size.max(1),
            reserved: Mutex::new(ReservedIds::default()),
        }
    }
}

impl<S> BlockTransactionIdGenerator<S>
where
    S: TransactionIdBlockSource,
{
    async fn reserve_into(
        &self,
        reserved: &mut ReservedIds,
    ) -> Result<(), TransactionIdGeneratorError> {
        let mut block = self.source.reserve_block(self.block_size).await?;
        block.sort_unstable();
        block.dedup();

        if let (Some(first), Some(previous)) = (block.first(), reserved.last_issued) {
            if *first <= previous {
                return Err(TransactionIdGeneratorError::non_monotonic(
                    previous.get(),
                    first.get(),
                ));
            }
        }
        debug!(
            reserved = block.len(),
            first = ?block.first(),
            "reserved transaction id block"
        );
        reserved.pending.extend(block);
        Ok(())
    }
}

#[async_trait]
impl<S> TransactionIdGenerator for BlockTransactionIdGenerator<S>
where
    S: TransactionIdBlockSource,
{
    async fn next_transaction_id(&self) -> Result<TransactionId, TransactionIdGeneratorError> {
        let mut reserved = self.reserved.lock().await;
        if reserved.pending.is_empty() {
            self.reserve_into(&mut reserved).await?;
        }

        let id = reserved
            .pending
            .pop_front()
            .ok_or_else(|| TransactionIdGeneratorError::query("id store reserved an empty block"))?;
        reserved.last_issued = Some(id);
        Ok(id)
    }

    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        self.source.current_max_id().await
    }
}
