// =====================================================
// MySQL SPECIFIC DATABASE OPERATIONS
// =====================================================

use crate::db_types::*;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Pool, Row};

// --- Connection ---

pub async fn create_pool(config: &ConnectionConfig) -> Result<Pool<MySql>, String> {
    let mut options = MySqlConnectOptions::new()
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

    sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect_with(options)
        .await
        .map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("os error 111") {
                return format!(
                    "Connection Refused ({})\\n\\nCheck if MySQL is running on {}:{}",
                    err_msg, config.host, config.port
                );
            }
            if err_msg.contains("timed out") {
                return format!(
                    "Connection Timed Out\\n\\nThe server at {}:{} did not respond within 10 seconds.",
                    config.host, config.port
                );
            }
            format!("Failed to create pool: {}", e)
        })
}

// --- Value Binding ---

pub fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
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

pub fn decode_row(row: &MySqlRow) -> Vec<Value> {
    let mut row_data = Vec::with_capacity(row.columns().len());
    for (i, _) in row.columns().iter().enumerate() {
        let val: Value = row
            .try_get_unchecked::<i64, _>(i)
            .map(|v| serde_json::json!(v))
            .or_else(|_| row.try_get_unchecked::<i32, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<i16, _>(i).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get_unchecked::<u64, _>(i).map(|v| serde_json::json!(v)))
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

pub fn rows_to_result(rows: &[MySqlRow]) -> QueryResult {
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

pub async fn get_tables(pool: &Pool<MySql>, database: &str) -> Result<Vec<String>, sqlx::Error> {
    let query = format!("SHOW TABLES FROM `{}`", database);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let tables: Vec<String> = rows
        .iter()
        .map(|row| {
            row.try_get::<String, _>(0).unwrap_or_else(|_| {
                let bytes: Vec<u8> = row.get(0);
                String::from_utf8_lossy(&bytes).to_string()
            })
        })
        .collect();

    Ok(tables)
}

pub async fn get_table_schema(
    pool: &Pool<MySql>,
    database: &str,
    table: &str,
) -> Result<Vec<ColumnSchema>, sqlx::Error> {
    let query = format!("SHOW COLUMNS FROM `{}`.`{}`", database, table);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns = Vec::new();
    for row in rows {
        let name: String = row.try_get("Field").unwrap_or_default();

        let full_type: String = match row.try_get::<Vec<u8>, _>("Type") {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(_) => row.try_get::<String, _>("Type").unwrap_or_default(),
        };

        let nullable: String = match row.try_get::<Vec<u8>, _>("Null") {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(_) => row.try_get::<String, _>("Null").unwrap_or_default(),
        };

        let data_type = full_type
            .split('(')
            .next()
            .unwrap_or(&full_type)
            .trim()
            .to_string();

        columns.push(ColumnSchema {
            name,
            data_type,
            size: parse_type_length(&full_type).unwrap_or(0),
            is_nullable: nullable.eq_ignore_ascii_case("YES"),
        });
    }

    Ok(columns)
}

fn parse_type_length(column_type: &str) -> Option<u32> {
    let open = column_type.find('(')?;
    let close = column_type[open..].find(')')? + open;
    column_type[open + 1..close]
        .split(',')
        .next()?
        .trim()
        .parse::<u32>()
        .ok()
}
