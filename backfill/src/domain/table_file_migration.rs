//! Re-binding of the file handles referenced by one table change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::port_error_mapping::{
    map_column_model_error, map_file_association_error, map_row_scanner_error,
};
use crate::domain::ports::{
    ColumnModelRepository, FileAssociationIndex, FileAssociationScope, RowScanner,
    RowScannerError, TableFileMigrationCommand,
};
use crate::domain::{ColumnModel, Error, FileHandleId, Row, RowChange};

/// Domain service implementing the per-change migration command.
pub struct TableFileMigrationService<C, S, F> {
    columns: Arc<C>,
    scanner: Arc<S>,
    index: Arc<F>,
}

impl<C, S, F> TableFileMigrationService<C, S, F> {
    /// Wire the service to its stores.
    pub fn new(columns: Arc<C>, scanner: Arc<S>, index: Arc<F>) -> Self {
        Self {
            columns,
            scanner,
            index,
        }
    }
}

impl<C, S, F> TableFileMigrationService<C, S, F>
where
    C: ColumnModelRepository,
    S: RowScanner,
    F: FileAssociationIndex,
{
    async fn load_columns(&self, change: &RowChange) -> Result<Vec<ColumnModel>, Error> {
        let models = self
            .columns
            .get_columns(&change.column_ids)
            .await
            .map_err(map_column_model_error)?;
        let by_id: HashMap<_, _> = models
            .into_iter()
            .map(|model| (model.column_id, model))
            .collect();

        change
            .column_ids
            .iter()
            .map(|column_id| {
                by_id.get(column_id).cloned().ok_or_else(|| {
                    Error::not_found(format!(
                        "column {column_id} referenced by table {} version {} does not exist",
                        change.table_id, change.row_version
                    ))
                    .with_details(json!({
                        "tableId": change.table_id,
                        "rowVersion": change.row_version,
                        "columnId": column_id,
                    }))
                })
            })
            .collect()
    }

    async fn bind_change(
        &self,
        scope: &mut dyn FileAssociationScope,
        change: &RowChange,
    ) -> Result<BTreeSet<FileHandleId>, Error> {
        let columns = self.load_columns(change).await?;
        let rows = self
            .scanner
            .scan_change(change)
            .await
            .map_err(map_row_scanner_error)?;
        let file_handle_ids = file_handle_ids_in_rows(change, &columns, rows)?;

        if !file_handle_ids.is_empty() {
            scope
                .bind_file_handle_ids(change.table_id, &file_handle_ids)
                .await
                .map_err(map_file_association_error)?;
        }
        Ok(file_handle_ids)
    }
}

#[async_trait]
impl<C, S, F> TableFileMigrationCommand for TableFileMigrationService<C, S, F>
where
    C: ColumnModelRepository,
    S: RowScanner,
    F: FileAssociationIndex,
{
    async fn attempt_table_file_migration(
        &self,
        change: &RowChange,
    ) -> Result<BTreeSet<FileHandleId>, Error> {
        let mut scope = self
            .index
            .begin()
            .await
            .map_err(map_file_association_error)?;

        match self.bind_change(scope.as_mut(), change).await {
            Ok(file_handle_ids) => {
                scope.commit().await.map_err(map_file_association_error)?;
                debug!(
                    table_id = %change.table_id,
                    row_version = change.row_version,
                    file_handles = file_handle_ids.len(),
                    "bound file handles to table"
                );
                Ok(file_handle_ids)
            }
            Err(error) => {
                if let Err(rollback_error) = scope.rollback().await {
                    warn!(
                        table_id = %change.table_id,
                        row_version = change.row_version,
                        error = %rollback_error,
                        "failed to roll back file association scope"
                    );
                }
                Err(error)
            }
        }
    }
}

/// Collect the distinct file handle ids referenced by `rows`.
///
/// Only cells of `FILEHANDLEID` columns are read. Absent and blank cells are
/// skipped. A cell that is not an integer, or a row whose cell count differs
/// from the column count, fails with `MalformedRowData`. A scanned row
/// count that differs from the change's declared `row_count` is logged and
/// tolerated.
pub fn file_handle_ids_in_rows<I>(
    change: &RowChange,
    columns: &[ColumnModel],
    rows: I,
) -> Result<BTreeSet<FileHandleId>, Error>
where
    I: IntoIterator<Item = Result<Row, RowScannerError>>,
{
    let file_columns: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.column_type.carries_file_handles())
        .map(|(index, _)| index)
        .collect();

    let mut file_handle_ids = BTreeSet::new();
    let mut scanned: i64 = 0;
    for row in rows {
        let row = row.map_err(map_row_scanner_error)?;
        scanned += 1;
        if row.values.len() != columns.len() {
            return Err(malformed(
                change,
                &row,
                format!(
                    "row {} has {} cells but the change declares {} columns",
                    row.row_id,
                    row.values.len(),
                    columns.len()
                ),
            ));
        }

        for index in &file_columns {
            let Some(cell) = row.values.get(*index).and_then(Option::as_deref) else {
                continue;
            };
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let id = cell.parse::<i64>().map_err(|_| {
                malformed(
                    change,
                    &row,
                    format!("row {} holds non-numeric file handle id {cell:?}", row.row_id),
                )
            })?;
            file_handle_ids.insert(FileHandleId::new(id));
        }
    }

    if scanned != change.row_count {
        warn!(
            table_id = %change.table_id,
            row_version = change.row_version,
            declared = change.row_count,
            scanned,
            "scanned row count differs from the change's declared row count"
        );
    }
    Ok(file_handle_ids)
}

fn malformed(change: &RowChange, row: &Row, message: String) -> Error {
    Error::malformed_row_data(message).with_details(json!({
        "tableId": change.table_id,
        "rowVersion": change.row_version,
        "rowId": row.row_id,
    }))
}

#[cfg(test)]
#[path = "table_file_migration_tests.rs"]
mod tests;
