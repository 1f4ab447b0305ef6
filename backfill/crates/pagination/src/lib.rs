//! Offset/limit pagination primitives for scanning append-only logs.
//!
//! Readers that walk a filtered, ordered relation page by page share two
//! types from this crate:
//!
//! - [`PageRequest`]: a validated `(offset, limit)` window. Limits are bounded
//!   by [`MAX_PAGE_LIMIT`] so a single page can never pull an unbounded result
//!   set into memory.
//! - [`Page`]: the items returned for one request, together with the request
//!   that produced them, so callers can tell whether the relation is
//!   exhausted.
//!
//! # Examples
//!
//! ```
//! use pagination::{Page, PageRequest};
//!
//! let request = PageRequest::first(2)?;
//! let page = Page::new(vec!["a", "b"], request);
//! assert!(!page.is_last());
//! assert_eq!(request.sql_bounds(), (0, 2));
//! # Ok::<(), pagination::PageRequestError>(())
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest limit a single page request may carry.
pub const MAX_PAGE_LIMIT: u32 = 10_000;

/// Page size used by log readers unless configured otherwise.
pub const DEFAULT_PAGE_LIMIT: u32 = 10_000;

/// Validation failures raised while building a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// A limit of zero would never make progress.
    #[error("page limit must be greater than zero")]
    ZeroLimit,
    /// The limit exceeded [`MAX_PAGE_LIMIT`].
    #[error("page limit {requested} exceeds the maximum of {max}")]
    LimitTooLarge {
        /// Limit supplied by the caller.
        requested: u32,
        /// Maximum accepted limit.
        max: u32,
    },
    /// The offset cannot be represented as a signed 64-bit SQL parameter.
    #[error("page offset {offset} exceeds the signed 64-bit range")]
    OffsetOutOfRange {
        /// Offset supplied by the caller.
        offset: u64,
    },
}

/// A validated `(offset, limit)` window over an ordered relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest", into = "RawPageRequest")]
pub struct PageRequest {
    offset: u64,
    limit: u32,
}

impl PageRequest {
    /// Build a request, validating the limit and offset bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when `limit` is zero or above
    /// [`MAX_PAGE_LIMIT`], or when `offset` does not fit in an `i64`.
    pub fn new(offset: u64, limit: u32) -> Result<Self, PageRequestError> {
        if limit == 0 {
            return Err(PageRequestError::ZeroLimit);
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(PageRequestError::LimitTooLarge {
                requested: limit,
                max: MAX_PAGE_LIMIT,
            });
        }
        if i64::try_from(offset).is_err() {
            return Err(PageRequestError::OffsetOutOfRange { offset });
        }
        Ok(Self { offset, limit })
    }

    /// Request the first window of `limit` items.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when `limit` is out of bounds.
    pub fn first(limit: u32) -> Result<Self, PageRequestError> {
        Self::new(0, limit)
    }

    /// Number of items skipped before this window.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of items in this window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// `(offset, limit)` as signed integers for SQL `OFFSET`/`LIMIT` binds.
    #[must_use]
    pub fn sql_bounds(&self) -> (i64, i64) {
        // Construction guarantees the offset fits; the fallback is unreachable
        // in practice but keeps the conversion total.
        let offset = i64::try_from(self.offset).unwrap_or(i64::MAX);
        (offset, i64::from(self.limit))
    }
}

#[derive(Serialize, Deserialize)]
struct RawPageRequest {
    offset: u64,
    limit: u32,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = PageRequestError;

    fn try_from(value: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(value.offset, value.limit)
    }
}

impl From<PageRequest> for RawPageRequest {
    fn from(value: PageRequest) -> Self {
        Self {
            offset: value.offset,
            limit: value.limit,
        }
    }
}

/// Items returned for one [`PageRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    request: PageRequest,
}

impl<T> Page<T> {
    /// Wrap the items fetched for `request`.
    #[must_use]
    pub const fn new(items: Vec<T>, request: PageRequest) -> Self {
        Self { items, request }
    }

    /// Items in storage order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the page carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when fewer items than the limit came back, so no further page
    /// exists at the time of the query.
    #[must_use]
    pub fn is_last(&self) -> bool {
        u32::try_from(self.items.len()).is_ok_and(|count| count < self.request.limit())
    }

    /// Consume the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for page request validation and page envelopes.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, PageRequestError::ZeroLimit)]
    #[case(MAX_PAGE_LIMIT + 1, PageRequestError::LimitTooLarge { requested: MAX_PAGE_LIMIT + 1, max: MAX_PAGE_LIMIT })]
    fn rejects_out_of_bounds_limits(#[case] limit: u32, #[case] expected: PageRequestError) {
        assert_eq!(PageRequest::first(limit), Err(expected));
    }

    #[rstest]
    fn rejects_offsets_beyond_signed_range() {
        let offset = u64::MAX;
        assert_eq!(
            PageRequest::new(offset, 10),
            Err(PageRequestError::OffsetOutOfRange { offset })
        );
    }

    #[rstest]
    fn sql_bounds_carry_offset_and_limit() {
        let max = u64::try_from(i64::MAX).expect("i64::MAX fits in u64");
        assert_eq!(
            PageRequest::new(20, 10).expect("valid request").sql_bounds(),
            (20, 10)
        );
        assert_eq!(
            PageRequest::new(max, 1).expect("valid request").sql_bounds(),
            (i64::MAX, 1)
        );
    }

    #[rstest]
    #[case(vec![1, 2, 3], false)]
    #[case(vec![1, 2], true)]
    #[case(vec![], true)]
    fn short_pages_are_last(#[case] items: Vec<u8>, #[case] expected: bool) {
        let page = Page::new(items, PageRequest::first(3).expect("valid request"));
        assert_eq!(page.is_last(), expected);
    }

    #[rstest]
    fn page_iterates_in_storage_order() {
        let page = Page::new(vec!["a", "b"], PageRequest::first(5).expect("valid request"));
        assert_eq!(page.len(), 2);
        let collected: Vec<_> = page.into_iter().collect();
        assert_eq!(collected, vec!["a", "b"]);
    }

    #[rstest]
    fn deserialisation_revalidates_requests() {
        let rejected = serde_json::from_str::<PageRequest>(r#"{"offset":0,"limit":0}"#);
        assert!(rejected.is_err());

        let accepted: PageRequest =
            serde_json::from_str(r#"{"offset":5,"limit":7}"#).expect("valid payload");
        assert_eq!(accepted, PageRequest::new(5, 7).expect("valid request"));
    }
}
