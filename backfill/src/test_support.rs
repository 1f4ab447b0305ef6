//! In-memory adapters shared by unit and integration tests.
//!
//! [`InMemoryTableStore`] implements every primary-store port over one shared
//! state so services wired to it observe each other's writes, the way they
//! would against a single database. [`InMemoryTransactionIdGenerator`] stands
//! in for the id-generation store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::ports::{
    ChangeRows, ColumnModelRepository, ColumnModelRepositoryError, FileAssociationIndex,
    FileAssociationIndexError, FileAssociationScope, FileMigrationLedger,
    FileMigrationLedgerError, MigrationState, RowChangeRepository, RowChangeRepositoryError,
    RowScanner, RowScannerError, TransactionIdBlockSource, TransactionIdGenerator,
    TransactionIdGeneratorError, TransactionRepository, TransactionRepositoryError,
};
use crate::domain::{
    ChangeKey, ColumnId, ColumnModel, FileHandleId, Row, RowChange, TableId, Transaction,
    TransactionId,
};

/// Ledger entry recorded by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Outcome of the last attempt.
    pub state: MigrationState,
    /// Etag of the change when it was attempted.
    pub etag: String,
}

#[derive(Debug, Default)]
struct StoreState {
    changes: BTreeMap<ChangeKey, RowChange>,
    rows: HashMap<ChangeKey, Vec<Row>>,
    transactions: BTreeMap<TransactionId, Transaction>,
    columns: HashMap<ColumnId, ColumnModel>,
    associations: BTreeSet<(TableId, FileHandleId)>,
    ledger: BTreeMap<ChangeKey, LedgerEntry>,
    failing_bind_tables: HashSet<TableId>,
}

fn lock_state(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn window<T>(items: impl Iterator<Item = T>, request: PageRequest) -> Page<T> {
    let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    Page::new(items.skip(skip).take(take).collect(), request)
}

/// Primary store held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTableStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        lock_state(&self.state)
    }

    /// Append a change to the log, replacing any change with the same key.
    pub fn insert_change(&self, change: RowChange) {
        self.state().changes.insert(change.key(), change);
    }

    /// Store the rows carried by a change.
    pub fn insert_rows(&self, table_id: TableId, row_version: i64, rows: Vec<Row>) {
        self.state()
            .rows
            .insert(ChangeKey::new(table_id, row_version), rows);
    }

    /// Register a column model.
    pub fn insert_column(&self, column: ColumnModel) {
        self.state().columns.insert(column.column_id, column);
    }

    /// Make every bind for `table_id` fail.
    pub fn fail_binds_for_table(&self, table_id: TableId) {
        self.state().failing_bind_tables.insert(table_id);
    }

    /// Look up one change.
    pub fn change(&self, table_id: TableId, row_version: i64) -> Option<RowChange> {
        self.state()
            .changes
            .get(&ChangeKey::new(table_id, row_version))
            .cloned()
    }

    /// All changes in key order.
    pub fn changes(&self) -> Vec<RowChange> {
        self.state().changes.values().cloned().collect()
    }

    /// All registered transactions in id order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().transactions.values().copied().collect()
    }

    /// All committed file associations.
    pub fn associations(&self) -> BTreeSet<(TableId, FileHandleId)> {
        self.state().associations.clone()
    }

    /// Ledger entry of one change.
    pub fn ledger_entry(&self, table_id: TableId, row_version: i64) -> Option<LedgerEntry> {
        self.state()
            .ledger
            .get(&ChangeKey::new(table_id, row_version))
            .cloned()
    }
}

#[async_trait]
impl RowChangeRepository for InMemoryTableStore {
    async fn query_page(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, RowChangeRepositoryError> {
        let state = self.state();
        let missing = state
            .changes
            .values()
            .filter(|change| change.transaction_id.is_none())
            .cloned();
        Ok(window(missing, request))
    }

    async fn get_max_version_below(
        &self,
        table_id: TableId,
        row_version: i64,
    ) -> Result<Option<RowChange>, RowChangeRepositoryError> {
        let state = self.state();
        let below = ChangeKey::new(table_id, i64::MIN)..ChangeKey::new(table_id, row_version);
        Ok(state
            .changes
            .range(below)
            .next_back()
            .map(|(_, change)| change.clone()))
    }

    async fn set_transaction_id(
        &self,
        table_id: TableId,
        row_version: i64,
        transaction_id: TransactionId,
    ) -> Result<(), RowChangeRepositoryError> {
        let mut state = self.state();
        match state.changes.get_mut(&ChangeKey::new(table_id, row_version)) {
            Some(change) if change.transaction_id.is_none() => {
                change.transaction_id = Some(transaction_id);
                Ok(())
            }
            _ => Err(RowChangeRepositoryError::already_assigned(
                table_id.get(),
                row_version,
            )),
        }
    }

    async fn count_missing_transactions(&self) -> Result<u64, RowChangeRepositoryError> {
        let state = self.state();
        let missing = state
            .changes
            .values()
            .filter(|change| change.transaction_id.is_none())
            .count();
        u64::try_from(missing).map_err(|err| RowChangeRepositoryError::query(err.to_string()))
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTableStore {
    async fn insert(&self, transaction: &Transaction) -> Result<(), TransactionRepositoryError> {
        let mut state = self.state();
        if state.transactions.contains_key(&transaction.transaction_id) {
            return Err(TransactionRepositoryError::duplicate(
                transaction.transaction_id.get(),
            ));
        }
        state
            .transactions
            .insert(transaction.transaction_id, *transaction);
        Ok(())
    }

    async fn find_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, TransactionRepositoryError> {
        Ok(self.state().transactions.get(&transaction_id).copied())
    }
}

#[async_trait]
impl ColumnModelRepository for InMemoryTableStore {
    async fn get_columns(
        &self,
        column_ids: &[ColumnId],
    ) -> Result<Vec<ColumnModel>, ColumnModelRepositoryError> {
        let state = self.state();
        let unique: BTreeSet<_> = column_ids.iter().copied().collect();
        Ok(unique
            .into_iter()
            .filter_map(|column_id| state.columns.get(&column_id).cloned())
            .collect())
    }
}

#[async_trait]
impl RowScanner for InMemoryTableStore {
    async fn scan_change(&self, change: &RowChange) -> Result<ChangeRows, RowScannerError> {
        let rows = self
            .state()
            .rows
            .get(&change.key())
            .cloned()
            .unwrap_or_default();
        Ok(ChangeRows::from_rows(rows))
    }
}

/// Write scope staging binds until commit.
#[derive(Debug)]
pub struct InMemoryAssociationScope {
    state: Arc<Mutex<StoreState>>,
    staged: BTreeSet<(TableId, FileHandleId)>,
}

#[async_trait]
impl FileAssociationScope for InMemoryAssociationScope {
    async fn bind_file_handle_ids(
        &mut self,
        table_id: TableId,
        file_handle_ids: &BTreeSet<FileHandleId>,
    ) -> Result<(), FileAssociationIndexError> {
        if lock_state(&self.state)
            .failing_bind_tables
            .contains(&table_id)
        {
            return Err(FileAssociationIndexError::query(format!(
                "binds for table {table_id} are rejected"
            )));
        }
        self.staged
            .extend(file_handle_ids.iter().map(|id| (table_id, *id)));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        let Self { state, staged } = *self;
        lock_state(&state).associations.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), FileAssociationIndexError> {
        Ok(())
    }
}

#[async_trait]
impl FileAssociationIndex for InMemoryTableStore {
    async fn begin(&self) -> Result<Box<dyn FileAssociationScope>, FileAssociationIndexError> {
        Ok(Box::new(InMemoryAssociationScope {
            state: Arc::clone(&self.state),
            staged: BTreeSet::new(),
        }))
    }
}

#[async_trait]
impl FileMigrationLedger for InMemoryTableStore {
    async fn list_unmigrated(
        &self,
        request: PageRequest,
    ) -> Result<Page<RowChange>, FileMigrationLedgerError> {
        let state = self.state();
        let unmigrated = state
            .changes
            .iter()
            .filter(|(key, change)| {
                state
                    .ledger
                    .get(key)
                    .is_none_or(|entry| entry.etag != change.etag)
            })
            .map(|(_, change)| change.clone());
        Ok(window(unmigrated, request))
    }

    async fn record_outcome(
        &self,
        change: &RowChange,
        state: MigrationState,
    ) -> Result<(), FileMigrationLedgerError> {
        self.state().ledger.insert(
            change.key(),
            LedgerEntry {
                state,
                etag: change.etag.clone(),
            },
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct IdState {
    max: Option<TransactionId>,
    issued: Vec<TransactionId>,
}

/// Id-generation store held in memory.
///
/// Ids start after the seeded maximum and are never reused.
#[derive(Debug, Default)]
pub struct InMemoryTransactionIdGenerator {
    state: Mutex<IdState>,
}

impl InMemoryTransactionIdGenerator {
    /// Create an empty store; the first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose greatest allocated id is `max`, as after a
    /// previous run.
    pub fn starting_after(max: i64) -> Self {
        Self {
            state: Mutex::new(IdState {
                max: Some(TransactionId::new(max)),
                issued: Vec::new(),
            }),
        }
    }

    /// Ids allocated by this instance, in allocation order.
    pub fn issued(&self) -> Vec<TransactionId> {
        self.lock().issued.clone()
    }

    fn lock(&self) -> MutexGuard<'_, IdState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self, count: u32) -> Result<Vec<TransactionId>, TransactionIdGeneratorError> {
        let mut state = self.lock();
        let start = state.max.map_or(0, TransactionId::get);
        let mut block = Vec::new();
        for offset in 1..=i64::from(count) {
            let next = start
                .checked_add(offset)
                .ok_or_else(|| TransactionIdGeneratorError::query("transaction ids exhausted"))?;
            block.push(TransactionId::new(next));
        }
        if let Some(last) = block.last() {
            state.max = Some(*last);
        }
        state.issued.extend(block.iter().copied());
        Ok(block)
    }
}

#[async_trait]
impl TransactionIdGenerator for InMemoryTransactionIdGenerator {
    async fn next_transaction_id(&self) -> Result<TransactionId, TransactionIdGeneratorError> {
        self.allocate(1)?
            .pop()
            .ok_or_else(|| TransactionIdGeneratorError::query("no id allocated"))
    }

    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        Ok(self.lock().max)
    }
}

#[async_trait]
impl TransactionIdBlockSource for InMemoryTransactionIdGenerator {
    async fn reserve_block(
        &self,
        size: u32,
    ) -> Result<Vec<TransactionId>, TransactionIdGeneratorError> {
        self.allocate(size)
    }

    async fn current_max_id(&self) -> Result<Option<TransactionId>, TransactionIdGeneratorError> {
        Ok(self.lock().max)
    }
}
