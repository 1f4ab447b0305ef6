//! Driven port streaming the rows carried by one change.

use std::fmt;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Row, RowChange};

define_port_error! {
    /// Errors raised while scanning change rows.
    pub enum RowScannerError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "row scanner connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "row scanner query failed: {message}",
        /// A stored row payload could not be decoded.
        Decode { message: String } =>
            "row payload could not be decoded: {message}",
    }
}

type RowIter = Box<dyn Iterator<Item = Result<Row, RowScannerError>> + Send>;

/// Finite, single-pass sequence of the rows of one change.
///
/// Rows are pulled one at a time; a decode failure surfaces as an `Err` item
/// at the position of the offending row.
pub struct ChangeRows {
    rows: RowIter,
}

impl ChangeRows {
    /// Wrap any iterator of row results.
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Result<Row, RowScannerError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            rows: Box::new(rows.into_iter()),
        }
    }

    /// Sequence over already decoded rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(rows.into_iter().map(Ok))
    }

    /// Sequence yielding nothing.
    pub fn empty() -> Self {
        Self::from_rows(Vec::new())
    }
}

impl Iterator for ChangeRows {
    type Item = Result<Row, RowScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for ChangeRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRows").finish_non_exhaustive()
    }
}

/// Port opening a row scan for a change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowScanner: Send + Sync {
    /// Start scanning every row of `change`, in row order.
    async fn scan_change(&self, change: &RowChange) -> Result<ChangeRows, RowScannerError>;
}
