//! Permission-gated query execution.
//!
//! Every statement is classified and authorized before it reaches the
//! database. The transaction shape follows the session grant: exactly
//! `{read}` runs read-only, anything broader runs read-write. On any
//! failure the transaction is rolled back and the original error is
//! surfaced; a rollback failure is logged, never masking the trigger.

use crate::error::AdapterError;
use serde_json::{Value, json};
use sqlgate_core::classifier;
use sqlgate_core::permissions::Grant;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Postgres, Row, Transaction};

/// Execute one SQL statement under the session grant and return the
/// result rows as a JSON array.
pub async fn run_query(pool: &PgPool, sql: &str, grant: &Grant) -> Result<Value, AdapterError> {
    let category = classifier::authorize(sql, grant)?;

    let mut tx = pool.begin().await?;
    if grant.is_read_only() {
        if let Err(err) = sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
        {
            rollback(tx).await;
            return Err(err.into());
        }
    }

    let rows = match sqlx::query(sql).fetch_all(&mut *tx).await {
        Ok(rows) => rows,
        Err(err) => {
            rollback(tx).await;
            return Err(err.into());
        }
    };

    tx.commit().await?;

    tracing::debug!(category = %category, row_count = rows.len(), "statement executed");
    Ok(Value::Array(rows.iter().map(row_to_json).collect()))
}

/// Roll back a failed transaction without masking the original error.
pub(crate) async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "rollback failed after statement error");
    }
}

/// Convert a row to JSON, decoding each column through a cascade of
/// common Postgres types and falling back to null.
fn row_to_json(row: &PgRow) -> Value {
    let mut obj = serde_json::Map::new();

    for col in row.columns() {
        let name = col.name();

        let value: Value = if let Ok(v) = row.try_get::<i64, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<i32, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<f64, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<bool, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<String, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Value, _>(name) {
            v
        } else if let Ok(v) = row.try_get::<Option<String>, _>(name) {
            match v {
                Some(s) => json!(s),
                None => Value::Null,
            }
        } else {
            Value::Null
        };

        obj.insert(name.to_string(), value);
    }

    Value::Object(obj)
}
