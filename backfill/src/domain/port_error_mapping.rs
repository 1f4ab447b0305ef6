//! Translation of port errors into domain errors.
//!
//! Connectivity and execution failures become `ServiceUnavailable`; the
//! port-specific variants keep their meaning.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::{
    ColumnModelRepositoryError, FileAssociationIndexError, FileMigrationLedgerError,
    RowChangeRepositoryError, RowScannerError, TransactionIdGeneratorError,
    TransactionRepositoryError,
};

pub(crate) fn map_row_change_error(error: RowChangeRepositoryError) -> Error {
    match error {
        RowChangeRepositoryError::Connection { message }
        | RowChangeRepositoryError::Query { message } => {
            Error::service_unavailable(format!("row change store failed: {message}"))
        }
        RowChangeRepositoryError::AlreadyAssigned {
            table_id,
            row_version,
        } => Error::conflict(format!(
            "row change {table_id}/{row_version} could not be assigned a transaction"
        ))
        .with_details(json!({ "tableId": table_id, "rowVersion": row_version })),
    }
}

pub(crate) fn map_transaction_error(error: TransactionRepositoryError) -> Error {
    match error {
        TransactionRepositoryError::Connection { message }
        | TransactionRepositoryError::Query { message } => {
            Error::service_unavailable(format!("transaction store failed: {message}"))
        }
        TransactionRepositoryError::Duplicate { transaction_id } => Error::conflict(format!(
            "transaction {transaction_id} is already registered"
        ))
        .with_details(json!({ "transactionId": transaction_id })),
    }
}

pub(crate) fn map_id_generator_error(error: TransactionIdGeneratorError) -> Error {
    match error {
        TransactionIdGeneratorError::Connection { message }
        | TransactionIdGeneratorError::Query { message } => {
            Error::service_unavailable(format!("transaction id store failed: {message}"))
        }
        TransactionIdGeneratorError::NonMonotonic { previous, next } => Error::internal(format!(
            "transaction id store returned {next} after {previous}"
        )),
    }
}

pub(crate) fn map_column_model_error(error: ColumnModelRepositoryError) -> Error {
    match error {
        ColumnModelRepositoryError::Connection { message }
        | ColumnModelRepositoryError::Query { message } => {
            Error::service_unavailable(format!("column model store failed: {message}"))
        }
        ColumnModelRepositoryError::Decode { message } => {
            Error::internal(format!("column model could not be decoded: {message}"))
        }
    }
}

pub(crate) fn map_row_scanner_error(error: RowScannerError) -> Error {
    match error {
        RowScannerError::Connection { message } | RowScannerError::Query { message } => {
            Error::service_unavailable(format!("row store failed: {message}"))
        }
        RowScannerError::Decode { message } => {
            Error::malformed_row_data(format!("row payload could not be decoded: {message}"))
        }
    }
}

pub(crate) fn map_file_association_error(error: FileAssociationIndexError) -> Error {
    match error {
        FileAssociationIndexError::Connection { message }
        | FileAssociationIndexError::Query { message }
        | FileAssociationIndexError::Scope { message } => {
            Error::service_unavailable(format!("file association index failed: {message}"))
        }
    }
}

pub(crate) fn map_ledger_error(error: FileMigrationLedgerError) -> Error {
    match error {
        FileMigrationLedgerError::Connection { message }
        | FileMigrationLedgerError::Query { message } => {
            Error::service_unavailable(format!("migration ledger failed: {message}"))
        }
    }
}
