//! Driving port for the resumable file-association sweep.

use std::ops::AddAssign;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, RowChange};

/// Outcome counters of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Changes migrated and committed.
    pub succeeded: u64,
    /// Changes whose migration failed and was recorded as such.
    pub failed: u64,
}

impl SweepReport {
    /// Total number of changes attempted.
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }
}

impl AddAssign for SweepReport {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Driving port migrating changes with per-change failure isolation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileMigrationSweep: Send + Sync {
    /// Attempt every change in `changes`, recording each outcome.
    ///
    /// Migration failures are logged and recorded; only ledger failures
    /// abort.
    async fn migrate_changes(&self, changes: Vec<RowChange>) -> Result<SweepReport, Error>;

    /// Sweep batches of unvisited changes until none remain.
    async fn run(&self) -> Result<SweepReport, Error>;
}
