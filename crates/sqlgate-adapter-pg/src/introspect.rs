//! Schema introspection for the `schema` tool.
//!
//! Always runs inside a read-only transaction regardless of the session
//! grant; introspection is read-only by construction and never gated by
//! DDL/DML permission. Inspects the `public` namespace only.

use crate::error::AdapterError;
use crate::executor::rollback;
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::BTreeMap;

/// Describe one table's columns, or every table when no name is given.
///
/// A named table yields its ordered column descriptors and errors if the
/// table does not exist. With no name, yields a map from every table name
/// to its columns, ordered by table name then native column ordinal.
pub async fn describe_schema(
    pool: &PgPool,
    table_name: Option<&str>,
) -> Result<Value, AdapterError> {
    let mut tx = pool.begin().await?;
    if let Err(err) = sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *tx)
        .await
    {
        rollback(tx).await;
        return Err(err.into());
    }

    let result = match table_name {
        Some(table) => describe_table(&mut tx, table).await,
        None => describe_all(&mut tx).await,
    };

    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            rollback(tx).await;
            Err(err)
        }
    }
}

async fn describe_table(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
) -> Result<Value, AdapterError> {
    let rows = sqlx::query(
        r#"
        select column_name, data_type, is_nullable, column_default
        from information_schema.columns
        where table_schema = 'public' and table_name = $1
        order by ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(&mut **tx)
    .await?;

    if rows.is_empty() {
        return Err(AdapterError::TableNotFound(table.to_string()));
    }

    Ok(Value::Array(rows.iter().map(column_json).collect()))
}

async fn describe_all(tx: &mut Transaction<'_, Postgres>) -> Result<Value, AdapterError> {
    let rows = sqlx::query(
        r#"
        select table_name, column_name, data_type, is_nullable, column_default
        from information_schema.columns
        where table_schema = 'public'
        order by table_name, ordinal_position
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    let mut tables: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for row in &rows {
        let table: String = row.get("table_name");
        tables.entry(table).or_default().push(column_json(row));
    }

    Ok(json!(tables))
}

fn column_json(row: &sqlx::postgres::PgRow) -> Value {
    let column_name: String = row.get("column_name");
    let data_type: String = row.get("data_type");
    let is_nullable: String = row.get("is_nullable");
    let column_default: Option<String> = row.get("column_default");

    json!({
        "name": column_name,
        "data_type": data_type,
        "nullable": is_nullable == "YES",
        "default": column_default
    })
}
