//! Diesel row structs and their conversions to domain types.
//!
//! These are internal to the persistence layer; adapters convert them into
//! domain values before returning.

use diesel::prelude::*;
use serde_json::Value;

use crate::domain::{
    ColumnId, ColumnModel, ColumnType, PrincipalId, Row, RowChange, TableId, Transaction,
    TransactionId,
};

use super::schema::{
    column_model, file_handle_association, migrated_table_row_change, table_row,
    table_row_change, table_transaction,
};

#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = table_row_change)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct RowChangeRow {
    pub table_id: i64,
    pub row_version: i64,
    pub etag: String,
    pub created_by: i64,
    pub created_on: i64,
    pub transaction_id: Option<i64>,
    pub column_ids: Vec<i64>,
    pub row_count: i64,
}

impl From<RowChangeRow> for RowChange {
    fn from(row: RowChangeRow) -> Self {
        Self {
            table_id: TableId::new(row.table_id),
            row_version: row.row_version,
            created_by: PrincipalId::new(row.created_by),
            created_on: row.created_on,
            transaction_id: row.transaction_id.map(TransactionId::new),
            etag: row.etag,
            column_ids: row.column_ids.into_iter().map(ColumnId::new).collect(),
            row_count: row.row_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Queryable, Selectable, Insertable)]
#[diesel(table_name = table_transaction)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct TransactionRow {
    pub transaction_id: i64,
    pub table_id: i64,
    pub started_by: i64,
    pub started_on: i64,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            transaction_id: TransactionId::new(row.transaction_id),
            table_id: TableId::new(row.table_id),
            started_by: PrincipalId::new(row.started_by),
            started_on: row.started_on,
        }
    }
}

impl From<&Transaction> for TransactionRow {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.transaction_id.get(),
            table_id: transaction.table_id.get(),
            started_by: transaction.started_by.get(),
            started_on: transaction.started_on,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = column_model)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct ColumnModelRow {
    pub column_id: i64,
    pub name: String,
    pub column_type: String,
}

impl TryFrom<ColumnModelRow> for ColumnModel {
    type Error = String;

    fn try_from(row: ColumnModelRow) -> Result<Self, Self::Error> {
        let column_type = row
            .column_type
            .parse::<ColumnType>()
            .map_err(|err| format!("column {}: {err}", row.column_id))?;
        Ok(Self {
            column_id: ColumnId::new(row.column_id),
            name: row.name,
            column_type,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = table_row)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct TableRowRow {
    pub row_id: i64,
    pub version_number: i64,
    pub cells: Value,
}

impl TryFrom<TableRowRow> for Row {
    type Error = String;

    /// Cells are a JSON array of strings, numbers or nulls; numbers are kept
    /// as their decimal text.
    fn try_from(row: TableRowRow) -> Result<Self, Self::Error> {
        let Value::Array(cells) = row.cells else {
            return Err(format!("row {} cells are not a JSON array", row.row_id));
        };
        let values = cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| match cell {
                Value::Null => Ok(None),
                Value::String(text) => Ok(Some(text)),
                Value::Number(number) => Ok(Some(number.to_string())),
                other => Err(format!(
                    "row {} cell {index} holds unsupported value {other}",
                    row.row_id
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            row_id: row.row_id,
            version_number: row.version_number,
            values,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = file_handle_association)]
pub(super) struct NewFileHandleAssociation<'a> {
    pub file_handle_id: i64,
    pub associated_object_id: i64,
    pub associated_object_type: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = migrated_table_row_change)]
pub(super) struct NewMigratedChange<'a> {
    pub table_id: i64,
    pub row_version: i64,
    pub etag: &'a str,
    pub state: &'a str,
    pub migrated_on: i64,
}
