//! Driving port for the transaction backfill run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Error;

/// Counters describing one completed backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// Changes that received a transaction id in this run.
    pub changes_classified: u64,
    /// Transactions allocated and registered in this run.
    pub transactions_created: u64,
    /// Classifications that joined an existing transaction.
    pub transactions_reused: u64,
}

/// Driving port classifying every change that lacks a transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionBackfillCommand: Send + Sync {
    /// Run the backfill to completion, aborting on the first error.
    ///
    /// Changes committed before an error keep their assignment, so a rerun
    /// resumes where the failed run stopped.
    async fn start_backfill(&self) -> Result<BackfillReport, Error>;
}
