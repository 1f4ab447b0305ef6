//! Diesel table definitions for both stores.
//!
//! These definitions must match the migrations under `migrations/primary`
//! and `migrations/id_generator` exactly. `table_transaction_id` lives in the
//! id-generation database; every other table lives in the primary database.

diesel::table! {
    /// Append-only log of row-set changes, one row per table version.
    table_row_change (table_id, row_version) {
        /// Table the change was appended to.
        table_id -> Int8,
        /// Table version produced by the change.
        row_version -> Int8,
        /// Version token of the change record.
        etag -> Varchar,
        /// Principal that appended the rows.
        created_by -> Int8,
        /// Append time in epoch milliseconds.
        created_on -> Int8,
        /// Transaction grouping; null until backfilled.
        transaction_id -> Nullable<Int8>,
        /// Column ids in cell order.
        column_ids -> Array<Int8>,
        /// Number of rows carried by the change.
        row_count -> Int8,
    }
}

diesel::table! {
    /// Registered transactions.
    table_transaction (transaction_id) {
        /// Id allocated by the id-generation store.
        transaction_id -> Int8,
        /// Table every member change belongs to.
        table_id -> Int8,
        /// Author of the first change.
        started_by -> Int8,
        /// Epoch milliseconds of the first change.
        started_on -> Int8,
    }
}

diesel::table! {
    /// Column schema referenced by changes.
    column_model (column_id) {
        /// Column identifier.
        column_id -> Int8,
        /// Display name.
        name -> Varchar,
        /// Persisted column type name, e.g. `FILEHANDLEID`.
        column_type -> Varchar,
    }
}

diesel::table! {
    /// Rows carried by each change.
    table_row (table_id, row_version, row_id) {
        /// Owning table.
        table_id -> Int8,
        /// Change version that carried the row.
        row_version -> Int8,
        /// Row identifier within the table.
        row_id -> Int8,
        /// Row version number.
        version_number -> Int8,
        /// JSON array of cell values in column order.
        cells -> Jsonb,
    }
}

diesel::table! {
    /// Index of objects referencing each file handle.
    file_handle_association (file_handle_id, associated_object_id, associated_object_type) {
        /// Referenced file handle.
        file_handle_id -> Int8,
        /// Referencing object, a table id for table associations.
        associated_object_id -> Int8,
        /// Referencing object type, `table` for table associations.
        associated_object_type -> Varchar,
    }
}

diesel::table! {
    /// Ledger of file-association migration attempts.
    migrated_table_row_change (table_id, row_version) {
        /// Table of the attempted change.
        table_id -> Int8,
        /// Version of the attempted change.
        row_version -> Int8,
        /// Etag of the change when attempted.
        etag -> Varchar,
        /// `SUCCESS` or `FAILURE`.
        state -> Varchar,
        /// Attempt time in epoch milliseconds.
        migrated_on -> Int8,
    }
}

diesel::table! {
    /// Transaction ids allocated by the id-generation store.
    table_transaction_id (id) {
        /// Allocated id.
        id -> Int8,
        /// Allocation time in epoch milliseconds.
        created_on -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    table_row_change,
    table_transaction,
    column_model,
    table_row,
    file_handle_association,
    migrated_table_row_change,
);
