//! Driven port for column schema lookups.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{ColumnId, ColumnModel};

define_port_error! {
    /// Errors raised while loading column models.
    pub enum ColumnModelRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "column model connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "column model query failed: {message}",
        /// A stored column declared a type the domain does not know.
        Decode { message: String } =>
            "column model could not be decoded: {message}",
    }
}

/// Port resolving column ids to their models.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ColumnModelRepository: Send + Sync {
    /// Load the models of `column_ids`.
    ///
    /// Ids with no stored model are omitted from the result; callers decide
    /// whether that is an error. Duplicate ids yield one model.
    async fn get_columns(
        &self,
        column_ids: &[ColumnId],
    ) -> Result<Vec<ColumnModel>, ColumnModelRepositoryError>;
}
