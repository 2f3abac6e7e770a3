//! Error types for the core crate.

use crate::permissions::{Category, Grant};
use thiserror::Error;

/// Errors raised by grant parsing and statement classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A grant token was not one of read/ddl/dml. The whole grant fails.
    #[error("unknown permission '{0}' (expected read, ddl or dml)")]
    InvalidPermission(String),

    /// A grant must contain at least one category.
    #[error("permission grant must not be empty")]
    EmptyGrant,

    /// The statement was empty after comment stripping. Never treated as read.
    #[error("statement is empty")]
    EmptyStatement,

    /// The statement's derived category is not in the session grant.
    #[error("permission denied: statement requires '{category}' but the session grant is '{grant}'")]
    PermissionDenied { category: Category, grant: Grant },
}
