//! File-association migration and sweep against the in-memory stores.

mod support;

use std::collections::BTreeSet;

use rstest::{fixture, rstest};
use support::{change, migration_service, register_columns, row, sweep_service};
use txn_backfill::domain::ports::{FileMigrationSweep, MigrationState, TableFileMigrationCommand};
use txn_backfill::domain::{ErrorCode, FileHandleId, TableId};
use txn_backfill::test_support::InMemoryTableStore;

fn handles(ids: &[i64]) -> BTreeSet<FileHandleId> {
    ids.iter().copied().map(FileHandleId::new).collect()
}

fn bound(table_id: i64, ids: &[i64]) -> BTreeSet<(TableId, FileHandleId)> {
    ids.iter()
        .map(|id| (TableId::new(table_id), FileHandleId::new(*id)))
        .collect()
}

#[fixture]
fn store() -> InMemoryTableStore {
    let store = InMemoryTableStore::new();
    register_columns(&store);
    store
}

#[rstest]
#[tokio::test]
async fn binds_every_referenced_handle(store: InMemoryTableStore) {
    let target = change(42, 1, 7, 0);
    store.insert_change(target.clone());
    store.insert_rows(
        TableId::new(42),
        1,
        vec![
            row(1, "a", Some("100")),
            row(2, "b", None),
            row(3, "c", Some(" 101 ")),
            row(4, "d", Some("")),
        ],
    );

    let ids = migration_service(&store)
        .attempt_table_file_migration(&target)
        .await
        .expect("migration succeeds");

    assert_eq!(ids, handles(&[100, 101]));
    assert_eq!(store.associations(), bound(42, &[100, 101]));
}

#[rstest]
#[tokio::test]
async fn repeated_attempts_change_nothing(store: InMemoryTableStore) {
    let target = change(42, 1, 7, 0);
    store.insert_change(target.clone());
    store.insert_rows(TableId::new(42), 1, vec![row(1, "a", Some("100"))]);
    let migrator = migration_service(&store);

    let first = migrator
        .attempt_table_file_migration(&target)
        .await
        .expect("first attempt");
    let second = migrator
        .attempt_table_file_migration(&target)
        .await
        .expect("second attempt");

    assert_eq!(first, second);
    assert_eq!(store.associations(), bound(42, &[100]));
}

#[rstest]
#[tokio::test]
async fn malformed_rows_bind_nothing(store: InMemoryTableStore) {
    let target = change(42, 1, 7, 0);
    store.insert_change(target.clone());
    store.insert_rows(
        TableId::new(42),
        1,
        vec![row(1, "a", Some("100")), row(2, "b", Some("not-a-handle"))],
    );

    let error = migration_service(&store)
        .attempt_table_file_migration(&target)
        .await
        .expect_err("malformed cell fails the change");

    assert_eq!(error.code(), ErrorCode::MalformedRowData);
    assert!(store.associations().is_empty());
}

#[rstest]
#[tokio::test]
async fn sweep_isolates_failing_changes(store: InMemoryTableStore) {
    for version in 1..=3 {
        store.insert_change(change(42, version, 7, 0));
    }
    store.insert_rows(TableId::new(42), 1, vec![row(1, "a", Some("100"))]);
    store.insert_rows(TableId::new(42), 2, vec![row(1, "a", Some("oops"))]);
    store.insert_rows(TableId::new(42), 3, vec![row(1, "a", Some("300"))]);

    let report = sweep_service(&store, 10_000).run().await.expect("sweep");

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(store.associations(), bound(42, &[100, 300]));
    let states: Vec<Option<MigrationState>> = (1..=3)
        .map(|version| {
            store
                .ledger_entry(TableId::new(42), version)
                .map(|entry| entry.state)
        })
        .collect();
    assert_eq!(
        states,
        vec![
            Some(MigrationState::Success),
            Some(MigrationState::Failure),
            Some(MigrationState::Success)
        ]
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(10_000)]
#[tokio::test]
async fn sweep_visits_each_change_once_and_terminates(
    store: InMemoryTableStore,
    #[case] batch_size: u32,
) {
    for version in 1..=5 {
        store.insert_change(change(42, version, 7, 0));
        store.insert_rows(
            TableId::new(42),
            version,
            vec![row(1, "a", Some(&(version * 10).to_string()))],
        );
    }
    let sweep = sweep_service(&store, batch_size);

    let first = sweep.run().await.expect("first sweep");
    let second = sweep.run().await.expect("second sweep");

    assert_eq!(first.attempted(), 5);
    assert_eq!(second.attempted(), 0);
    assert_eq!(store.associations(), bound(42, &[10, 20, 30, 40, 50]));
}

#[rstest]
#[tokio::test]
async fn rewritten_changes_are_migrated_again(store: InMemoryTableStore) {
    store.insert_change(change(42, 1, 7, 0));
    store.insert_rows(TableId::new(42), 1, vec![row(1, "a", Some("100"))]);
    let sweep = sweep_service(&store, 10_000);
    sweep.run().await.expect("first sweep");

    let mut rewritten = change(42, 1, 7, 0);
    rewritten.etag = "etag-rewritten".to_owned();
    store.insert_change(rewritten);
    store.insert_rows(TableId::new(42), 1, vec![row(1, "a", Some("200"))]);
    let report = sweep.run().await.expect("second sweep");

    assert_eq!(report.succeeded, 1);
    assert_eq!(store.associations(), bound(42, &[100, 200]));
    assert_eq!(
        store
            .ledger_entry(TableId::new(42), 1)
            .map(|entry| entry.etag),
        Some("etag-rewritten".to_owned())
    );
}

#[rstest]
#[tokio::test]
async fn missing_schema_and_rejected_binds_are_recorded_as_failures(store: InMemoryTableStore) {
    let mut unknown_column = change(41, 1, 7, 0);
    unknown_column.column_ids.push(txn_backfill::domain::ColumnId::new(999));
    store.insert_change(unknown_column);
    store.insert_change(change(43, 1, 7, 0));
    store.insert_rows(TableId::new(43), 1, vec![row(1, "a", Some("100"))]);
    store.fail_binds_for_table(TableId::new(43));
    store.insert_change(change(44, 1, 7, 0));
    store.insert_rows(TableId::new(44), 1, vec![row(1, "a", Some("400"))]);

    let report = sweep_service(&store, 10_000).run().await.expect("sweep");

    assert_eq!(report.failed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(store.associations(), bound(44, &[400]));
}
