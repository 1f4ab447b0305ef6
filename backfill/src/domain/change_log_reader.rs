//! Lazy reader over the changes that still lack a transaction.
//!
//! The reader holds no persisted cursor. Each refill asks the repository for
//! the head of the filtered change log; because the backfill commits every
//! classification before pulling the next change, classified rows have
//! already dropped out of that set and the head is always the next unseen
//! change.
//!
//! A refill only happens once the previous page has been fully yielded, so
//! any key of that page showing up again means its classification was not
//! persisted. A change that becomes unassigned at a lower key during a run
//! (another writer clearing its transaction) is not a stall and is yielded
//! like any other.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use pagination::{Page, PageRequest};
use serde_json::json;
use tracing::debug;

use crate::domain::port_error_mapping::map_row_change_error;
use crate::domain::ports::RowChangeRepository;
use crate::domain::{ChangeKey, Error, RowChange};

/// Sequential reader yielding unassigned changes in `(table_id, row_version)`
/// order.
pub struct MissingTransactionReader<R> {
    repo: Arc<R>,
    page_request: PageRequest,
    buffered: VecDeque<RowChange>,
    previous_page: HashSet<ChangeKey>,
    exhausted: bool,
}

impl<R> MissingTransactionReader<R> {
    /// Create a reader fetching `page_size` changes per refill.
    pub fn new(repo: Arc<R>, page_size: u32) -> Result<Self, Error> {
        let page_request = PageRequest::first(page_size)
            .map_err(|err| Error::invalid_request(format!("invalid page size: {err}")))?;
        Ok(Self {
            repo,
            page_request,
            buffered: VecDeque::new(),
            previous_page: HashSet::new(),
            exhausted: false,
        })
    }
}

impl<R> MissingTransactionReader<R>
where
    R: RowChangeRepository,
{
    /// Fetch one page of unassigned changes.
    pub async fn next_page(&self, request: PageRequest) -> Result<Page<RowChange>, Error> {
        self.repo
            .query_page(request)
            .await
            .map_err(map_row_change_error)
    }

    /// Pull the next unassigned change, or `None` once the log is drained.
    ///
    /// Returns a conflict error when a refill returns a change the previous
    /// page already yielded, which means a classification was not persisted.
    pub async fn next_change(&mut self) -> Result<Option<RowChange>, Error> {
        if self.buffered.is_empty() && !self.exhausted {
            self.refill().await?;
        }

        Ok(self.buffered.pop_front())
    }

    async fn refill(&mut self) -> Result<(), Error> {
        let page = self.next_page(self.page_request).await?;
        self.exhausted = page.is_last();
        debug!(
            changes = page.len(),
            last_page = self.exhausted,
            "fetched unassigned row changes"
        );

        if let Some(repeated) = page
            .items()
            .iter()
            .map(RowChange::key)
            .find(|key| self.previous_page.contains(key))
        {
            return Err(Error::conflict(format!(
                "change log returned table {} version {} again after it was classified",
                repeated.table_id, repeated.row_version
            ))
            .with_details(json!({
                "tableId": repeated.table_id,
                "rowVersion": repeated.row_version,
            })));
        }

        self.previous_page = page.items().iter().map(RowChange::key).collect();
        self.buffered.extend(page);
        Ok(())
    }
}
