//! Unit coverage for the file-association migrator.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    ChangeRows, ColumnModelRepositoryError, FileAssociationIndexError, MockColumnModelRepository,
    MockFileAssociationIndex, MockRowScanner,
};
use crate::domain::{ColumnId, ColumnType, ErrorCode, PrincipalId, TableId};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ScopeLog {
    bound: Vec<(TableId, BTreeSet<FileHandleId>)>,
    committed: bool,
    rolled_back: bool,
}

struct RecordingScope {
    log: Arc<Mutex<ScopeLog>>,
    fail_bind: bool,
}

#[async_trait]
impl FileAssociationScope for RecordingScope {
    async fn bind_file_handle_ids(
        &mut self,
        table_id: TableId,
        file_handle_ids: &BTreeSet<FileHandleId>,
    ) -> Result<(), FileAssociationIndexError> {
        if self.fail_bind {
            return Err(FileAssociationIndexError::query("bind rejected"));
        }
        self.log
            .lock()
            .expect("scope log")
            .bound
            .push((table_id, file_handle_ids.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        self.log.lock().expect("scope log").committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        self.log.lock().expect("scope log").rolled_back = true;
        Ok(())
    }
}

fn index_with_scope(log: &Arc<Mutex<ScopeLog>>, fail_bind: bool) -> MockFileAssociationIndex {
    let log = Arc::clone(log);
    let mut index = MockFileAssociationIndex::new();
    index.expect_begin().times(1).returning(move || {
        let scope: Box<dyn FileAssociationScope> = Box::new(RecordingScope {
            log: Arc::clone(&log),
            fail_bind,
        });
        Ok(scope)
    });
    index
}

fn change() -> RowChange {
    RowChange {
        table_id: TableId::new(42),
        row_version: 3,
        created_by: PrincipalId::new(7),
        created_on: 0,
        transaction_id: None,
        etag: "etag-3".to_owned(),
        column_ids: vec![ColumnId::new(1), ColumnId::new(2)],
        row_count: 2,
    }
}

fn model(id: i64, column_type: ColumnType) -> ColumnModel {
    ColumnModel {
        column_id: ColumnId::new(id),
        name: format!("col{id}"),
        column_type,
    }
}

fn row(row_id: i64, cells: [Option<&str>; 2]) -> Row {
    Row {
        row_id,
        version_number: 3,
        values: cells.iter().map(|cell| cell.map(str::to_owned)).collect(),
    }
}

#[fixture]
fn columns() -> MockColumnModelRepository {
    let mut columns = MockColumnModelRepository::new();
    columns
        .expect_get_columns()
        .returning(|_| Ok(vec![model(2, ColumnType::Filehandleid), model(1, ColumnType::String)]));
    columns
}

fn scanner(rows: Vec<Row>) -> MockRowScanner {
    let mut scanner = MockRowScanner::new();
    scanner
        .expect_scan_change()
        .times(1)
        .return_once(move |_| Ok(ChangeRows::from_rows(rows)));
    scanner
}

fn service(
    columns: MockColumnModelRepository,
    scanner: MockRowScanner,
    index: MockFileAssociationIndex,
) -> TableFileMigrationService<MockColumnModelRepository, MockRowScanner, MockFileAssociationIndex>
{
    TableFileMigrationService::new(Arc::new(columns), Arc::new(scanner), Arc::new(index))
}

#[rstest]
#[tokio::test]
async fn binds_distinct_ids_and_commits(columns: MockColumnModelRepository) {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let rows = vec![
        row(1, [Some("a"), Some("100")]),
        row(2, [Some("b"), Some(" 200 ")]),
        row(3, [Some("c"), Some("100")]),
        row(4, [Some("d"), None]),
        row(5, [Some("e"), Some("")]),
    ];

    let bound = service(columns, scanner(rows), index_with_scope(&log, false))
        .attempt_table_file_migration(&change())
        .await
        .expect("migration");

    let expected: BTreeSet<_> = [100, 200].into_iter().map(FileHandleId::new).collect();
    assert_eq!(bound, expected);
    let log = log.lock().expect("scope log").clone();
    assert_eq!(log.bound, vec![(TableId::new(42), expected)]);
    assert!(log.committed);
    assert!(!log.rolled_back);
}

#[rstest]
#[tokio::test]
async fn changes_without_file_handles_commit_without_binding(columns: MockColumnModelRepository) {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let rows = vec![row(1, [Some("a"), None])];

    let bound = service(columns, scanner(rows), index_with_scope(&log, false))
        .attempt_table_file_migration(&change())
        .await
        .expect("migration");

    assert!(bound.is_empty());
    let log = log.lock().expect("scope log").clone();
    assert!(log.bound.is_empty());
    assert!(log.committed);
}

#[rstest]
#[tokio::test]
async fn unparseable_cell_rolls_back(columns: MockColumnModelRepository) {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let rows = vec![row(1, [Some("a"), Some("7")]), row(2, [Some("b"), Some("abc")])];

    let err = service(columns, scanner(rows), index_with_scope(&log, false))
        .attempt_table_file_migration(&change())
        .await
        .expect_err("malformed cell");

    assert_eq!(err.code(), ErrorCode::MalformedRowData);
    let log = log.lock().expect("scope log").clone();
    assert!(log.bound.is_empty());
    assert!(log.rolled_back);
    assert!(!log.committed);
}

#[rstest]
#[tokio::test]
async fn missing_column_model_is_not_found() {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let mut columns = MockColumnModelRepository::new();
    columns
        .expect_get_columns()
        .withf(|ids| ids.to_vec() == vec![ColumnId::new(1), ColumnId::new(2)])
        .returning(|_| Ok(vec![model(1, ColumnType::String)]));
    let mut scanner = MockRowScanner::new();
    scanner.expect_scan_change().never();

    let err = service(columns, scanner, index_with_scope(&log, false))
        .attempt_table_file_migration(&change())
        .await
        .expect_err("missing column");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(log.lock().expect("scope log").rolled_back);
}

#[rstest]
#[tokio::test]
async fn column_store_failure_rolls_back() {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let mut columns = MockColumnModelRepository::new();
    columns
        .expect_get_columns()
        .returning(|_| Err(ColumnModelRepositoryError::connection("down")));

    let err = service(columns, MockRowScanner::new(), index_with_scope(&log, false))
        .attempt_table_file_migration(&change())
        .await
        .expect_err("column store failure");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(log.lock().expect("scope log").rolled_back);
}

#[rstest]
#[tokio::test]
async fn bind_failure_rolls_back(columns: MockColumnModelRepository) {
    let log = Arc::new(Mutex::new(ScopeLog::default()));
    let rows = vec![row(1, [Some("a"), Some("5")])];

    let err = service(columns, scanner(rows), index_with_scope(&log, true))
        .attempt_table_file_migration(&change())
        .await
        .expect_err("bind failure");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    let log = log.lock().expect("scope log").clone();
    assert!(log.rolled_back);
    assert!(!log.committed);
}

#[rstest]
fn short_rows_are_malformed() {
    let columns = vec![model(1, ColumnType::String), model(2, ColumnType::Filehandleid)];
    let short = Row {
        row_id: 9,
        version_number: 3,
        values: vec![Some("only".to_owned())],
    };

    let err = file_handle_ids_in_rows(&change(), &columns, vec![Ok(short)])
        .expect_err("cell count mismatch");
    assert_eq!(err.code(), ErrorCode::MalformedRowData);
}

#[rstest]
fn row_count_mismatches_do_not_block_binding() {
    let columns = vec![model(1, ColumnType::String), model(2, ColumnType::Filehandleid)];
    let declared_two = change();
    let rows = vec![Ok(row(1, [Some("a"), Some("100")]))];

    let ids = file_handle_ids_in_rows(&declared_two, &columns, rows).expect("ids");
    assert_eq!(ids, BTreeSet::from([FileHandleId::new(100)]));
}

#[rstest]
fn row_decode_failures_are_malformed() {
    let columns = vec![model(1, ColumnType::String), model(2, ColumnType::Filehandleid)];

    let err = file_handle_ids_in_rows(
        &change(),
        &columns,
        vec![Err(RowScannerError::decode("cells is not an array"))],
    )
    .expect_err("decode failure");
    assert_eq!(err.code(), ErrorCode::MalformedRowData);
}

#[rstest]
#[case(ColumnType::String)]
#[case(ColumnType::Entityid)]
#[case(ColumnType::Json)]
fn non_file_columns_are_ignored(#[case] column_type: ColumnType) {
    let columns = vec![model(1, column_type), model(2, column_type)];
    let rows = vec![Ok(row(1, [Some("not a number"), Some("17")]))];

    let ids = file_handle_ids_in_rows(&change(), &columns, rows).expect("ids");
    assert!(ids.is_empty());
}
