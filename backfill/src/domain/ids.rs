//! Strongly typed identifiers shared across the domain.
//!
//! All identifiers are persisted as `BIGINT` columns, so each wraps an `i64`
//! and serialises transparently.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Raw identifier value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id! {
    /// Identifier of a table entity.
    TableId
}

define_id! {
    /// Identifier of the principal (user) that authored a change.
    PrincipalId
}

define_id! {
    /// Allocator-assigned identifier of a transaction grouping.
    TransactionId
}

define_id! {
    /// Identifier of a column model.
    ColumnId
}

define_id! {
    /// Opaque identifier of a stored file referenced from table cells.
    FileHandleId
}
