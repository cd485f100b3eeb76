// =====================================================
// POSTGRESQL SPECIFIC DATABASE OPERATIONS
// =====================================================

use crate::db_types::*;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Pool, Postgres, Row};

// --- Connection ---

pub async fn create_pool(config: &ConnectionConfig) -> Result<Pool<Postgres>, String> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username);

    if let Some(pwd) = &config.password {
        options = options.password(pwd);
    }

    if let Some(db) = &config.database {
        if !db.is_empty() {
            options = options.database(db);
        }
    }

    if let Some(ssl) = &config.ssl_mode {
        options = match ssl.as_str() {
            "disable" => options.ssl_mode(sqlx::postgres::PgSslMode::Disable),
            "prefer" => options.ssl_mode(sqlx::postgres::PgSslMode::Prefer),
            "require" => options.ssl_mode(sqlx::postgres::PgSslMode::Require),
            _ => options,
        };
    }

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect_with(options)
        .await
        .map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("connection refused") {
                return format!(
                    "Connection Refused\\n\\nCheck if PostgreSQL is running on {}:{}",
                    config.host, config.port
                );
            }
            format!("Failed to create pool: {}", e)
        })
}

// --- Value Binding ---

pub fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
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

pub fn decode_row(row: &PgRow) -> Vec<Value> {
    let mut row_data = Vec::with_capacity(row.columns().len());
    for (i, _) in row.columns().iter().enumerate() {
        let val: Value = row
            .try_get_unchecked::<i64, _>(i)
            .map(|v| serde_json::json!(v))
            .or_else(|_| row.try_get_unchecked::<i32, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<i16, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<f64, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<f32, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<bool, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<String, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| {
                row.try_get_unchecked::<Vec<u8>, _>(i)
                    .map(|bytes| serde_json::json!(BASE64_STANDARD.encode(&bytes)))
            })
            .unwrap_or(Value::Null);
        row_data.push(val);
    }
    row_data
}

pub fn rows_to_result(rows: &[PgRow]) -> QueryResult {
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

pub async fn get_tables(pool: &Pool<Postgres>, schema: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT tablename FROM pg_tables WHERE schemaname = $1 ORDER BY tablename")
        .bind(schema)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| row.try_get::<String, _>("tablename").unwrap_or_default())
        .collect())
}

pub async fn get_table_schema(
    pool: &Pool<Postgres>,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnSchema>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT
            c.column_name,
            c.data_type,
            c.character_maximum_length,
            c.numeric_precision,
            c.is_nullable
        FROM information_schema.columns c
        WHERE c.table_schema = $1
            AND c.table_name = $2
        ORDER BY c.ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut columns = Vec::new();
    for row in rows {
        let name: String = row.try_get("column_name").unwrap_or_default();
        let data_type: String = row.try_get("data_type").unwrap_or_default();
        let max_length: Option<i32> = row.try_get("character_maximum_length").ok();
        let numeric_precision: Option<i32> = row.try_get("numeric_precision").ok();
        let is_nullable_str: String = row.try_get("is_nullable").unwrap_or_default();

        let size = max_length
            .or(numeric_precision)
            .and_then(|len| u32::try_from(len).ok())
            .unwrap_or(0);

        columns.push(ColumnSchema {
            name,
            data_type,
            size,
            is_nullable: is_nullable_str == "YES",
        });
    }

    Ok(columns)
}
