// =====================================================
// SQLITE SPECIFIC DATABASE OPERATIONS
// =====================================================

use crate::db_types::*;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::query::Query;
use sqlx::{Column, Pool, Row, Sqlite};

// --- Connection ---

fn build_connect_options(db_path: &str) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
}

pub async fn create_pool(db_path: &str) -> Result<Pool<Sqlite>, String> {
    if db_path.is_empty() {
        return Err("Database file path is required".to_string());
    }

    let options = build_connect_options(db_path);

    SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| format!("Failed to create SQLite pool: {}", e))
}

/// Single-connection in-memory database. One connection is the point:
/// every pooled connection would otherwise see its own empty database.
pub async fn create_memory_pool() -> Result<Pool<Sqlite>, String> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| format!("Failed to create in-memory SQLite pool: {}", e))
}

// --- Value Binding ---

pub fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                query.bind(int)
            } else {
                query.bind(number.as_f64().unwrap_or_default())
            }
        }
        Value::String(text) => query.bind(text.as_str()),
        other => query.bind(other.to_string()),
    }
}

// --- Row Decoding ---

pub fn decode_row(row: &SqliteRow) -> Vec<Value> {
    let mut row_data = Vec::with_capacity(row.columns().len());
    for (i, _) in row.columns().iter().enumerate() {
        // checked gets: SQLite values are dynamically typed, so the
        // column's value type decides which branch decodes
        let val: Value = if let Ok(v) = row.try_get::<String, _>(i) {
            Value::String(v)
        } else if let Ok(v) = row.try_get::<i64, _>(i) {
            serde_json::json!(v)
        } else if let Ok(v) = row.try_get::<f64, _>(i) {
            serde_json::json!(v)
        } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
            Value::String(BASE64_STANDARD.encode(&v))
        } else if let Ok(v) = row.try_get::<bool, _>(i) {
            Value::Bool(v)
        } else {
            Value::Null
        };
        row_data.push(val);
    }
    row_data
}

pub fn rows_to_result(rows: &[SqliteRow]) -> QueryResult {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    QueryResult {
        columns,
        rows: rows.iter().map(decode_row).collect(),
    }
}

// --- Table Introspection ---

pub async fn get_tables(pool: &Pool<Sqlite>) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .filter_map(|r| r.try_get::<String, _>("name").ok())
        .collect())
}

pub async fn get_table_schema(
    pool: &Pool<Sqlite>,
    table: &str,
) -> Result<Vec<ColumnSchema>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\"")))
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|r| {
            let name = r.try_get::<String, _>("name").unwrap_or_default();
            let data_type = r.try_get::<String, _>("type").unwrap_or_default();
            let notnull = r.try_get::<i32, _>("notnull").unwrap_or(0);

            ColumnSchema {
                name,
                data_type,
                size: 0,
                is_nullable: notnull == 0,
            }
        })
        .collect())
}
