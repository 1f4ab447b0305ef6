//! Column models and row payloads of table changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ColumnId;

/// Column data types a table may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    /// Short text.
    String,
    /// Floating point number.
    Double,
    /// 64-bit integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Epoch-millisecond timestamp.
    Date,
    /// Reference to a stored file.
    Filehandleid,
    /// Reference to an entity.
    Entityid,
    /// Reference to an evaluation submission.
    Submissionid,
    /// Reference to an evaluation.
    Evaluationid,
    /// URL.
    Link,
    /// Medium-length text.
    Mediumtext,
    /// Large text.
    Largetext,
    /// Reference to a principal.
    Userid,
    /// List of short texts.
    StringList,
    /// List of integers.
    IntegerList,
    /// List of booleans.
    BooleanList,
    /// List of timestamps.
    DateList,
    /// List of entity references.
    EntityidList,
    /// List of principal references.
    UseridList,
    /// Arbitrary JSON document.
    Json,
}

impl ColumnType {
    const ALL: [Self; 20] = [
        Self::String,
        Self::Double,
        Self::Integer,
        Self::Boolean,
        Self::Date,
        Self::Filehandleid,
        Self::Entityid,
        Self::Submissionid,
        Self::Evaluationid,
        Self::Link,
        Self::Mediumtext,
        Self::Largetext,
        Self::Userid,
        Self::StringList,
        Self::IntegerList,
        Self::BooleanList,
        Self::DateList,
        Self::EntityidList,
        Self::UseridList,
        Self::Json,
    ];

    /// Persisted name of the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Double => "DOUBLE",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Filehandleid => "FILEHANDLEID",
            Self::Entityid => "ENTITYID",
            Self::Submissionid => "SUBMISSIONID",
            Self::Evaluationid => "EVALUATIONID",
            Self::Link => "LINK",
            Self::Mediumtext => "MEDIUMTEXT",
            Self::Largetext => "LARGETEXT",
            Self::Userid => "USERID",
            Self::StringList => "STRING_LIST",
            Self::IntegerList => "INTEGER_LIST",
            Self::BooleanList => "BOOLEAN_LIST",
            Self::DateList => "DATE_LIST",
            Self::EntityidList => "ENTITYID_LIST",
            Self::UseridList => "USERID_LIST",
            Self::Json => "JSON",
        }
    }

    /// True when cells of this type hold file handle ids.
    pub const fn carries_file_handles(self) -> bool {
        matches!(self, Self::Filehandleid)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted column type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column type: {0}")]
pub struct UnknownColumnType(pub String);

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownColumnType(value.to_owned()))
    }
}

/// Schema of one column referenced by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnModel {
    /// Column identifier.
    pub column_id: ColumnId,
    /// Display name.
    pub name: String,
    /// Declared data type.
    pub column_type: ColumnType,
}

/// One row carried by a change.
///
/// `values` holds one cell per column id of the owning change, in the same
/// order; `None` marks an absent cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Row identifier within the table.
    pub row_id: i64,
    /// Row version written by the change.
    pub version_number: i64,
    /// Cell values in column order.
    pub values: Vec<Option<String>>,
}
