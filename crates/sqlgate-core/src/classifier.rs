//! Lexical SQL classification.
//!
//! Maps raw statement text to a [`Category`] by inspecting the leading
//! clause after comment stripping and whitespace normalization. This is a
//! fast-path filter with a fail-closed default, not a SQL grammar engine:
//! anything that does not open with a DDL or DML keyword classifies as read.

use crate::error::CoreError;
use crate::permissions::{Category, Grant};
use regex::Regex;
use std::sync::OnceLock;

fn line_comments() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--[^\n]*").expect("valid pattern"))
}

fn block_comments() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid pattern"))
}

fn ddl_leading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:CREATE|DROP|ALTER|TRUNCATE|COMMENT)\b").expect("valid pattern")
    })
}

fn dml_leading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:INSERT|UPDATE|DELETE|MERGE|UPSERT)\b").expect("valid pattern")
    })
}

/// Derive the operation category of a statement.
///
/// Comments are stripped, whitespace collapsed and the text uppercased
/// before the leading clause is tested against the DDL keyword set, then
/// the DML set. First match wins; no match means read. A statement that is
/// empty after stripping is an error, never read.
pub fn classify(sql: &str) -> Result<Category, CoreError> {
    let stripped = block_comments().replace_all(sql, " ");
    let stripped = line_comments().replace_all(&stripped, " ");
    let normalized = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    if normalized.is_empty() {
        return Err(CoreError::EmptyStatement);
    }
    if ddl_leading().is_match(&normalized) {
        return Ok(Category::Ddl);
    }
    if dml_leading().is_match(&normalized) {
        return Ok(Category::Dml);
    }
    Ok(Category::Read)
}

/// Classify a statement and check it against the session grant.
///
/// Fails closed: the grant must contain the derived category. The denial
/// carries both the category and the grant for diagnostics. Purely local,
/// never touches the database.
pub fn authorize(sql: &str, grant: &Grant) -> Result<Category, CoreError> {
    let category = classify(sql)?;
    if grant.contains(category) {
        Ok(category)
    } else {
        Err(CoreError::PermissionDenied {
            category,
            grant: grant.clone(),
        })
    }
}
