//! Error types for the Postgres adapter.

use sqlgate_core::CoreError;
use thiserror::Error;

/// Errors raised by pool routing, execution and introspection.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Classification or authorization rejected the statement before
    /// execution (permission denied, empty statement).
    #[error(transparent)]
    Denied(#[from] CoreError),

    /// The named table does not exist in the inspected namespace.
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// The underlying engine failed during pool construction, statement
    /// execution or commit.
    #[error("sql execution failed: {0}")]
    Sql(#[from] sqlx::Error),
}
