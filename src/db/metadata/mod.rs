// =====================================================
// SCHEMA INTROSPECTION DISPATCH
// Table and column discovery per endpoint backend
// =====================================================

use crate::db::connections::EndpointPool;
use crate::db_types::ColumnSchema;
use crate::{mysql, postgres, sqlite};

pub async fn get_tables(endpoint: &EndpointPool) -> Result<Vec<String>, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, database } => mysql::get_tables(pool, database).await,
        EndpointPool::Postgres { pool, schema } => postgres::get_tables(pool, schema).await,
        EndpointPool::Sqlite { pool } => sqlite::get_tables(pool).await,
    }
}

pub async fn get_table_schema(
    endpoint: &EndpointPool,
    table: &str,
) -> Result<Vec<ColumnSchema>, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, database } => {
            mysql::get_table_schema(pool, database, table).await
        }
        EndpointPool::Postgres { pool, schema } => {
            postgres::get_table_schema(pool, schema, table).await
        }
        EndpointPool::Sqlite { pool } => sqlite::get_table_schema(pool, table).await,
    }
}

/// Case-insensitive existence check against the endpoint's table list.
/// Table-name case handling differs per backend, so the list is matched
/// rather than queried by name.
pub async fn table_exists(endpoint: &EndpointPool, table: &str) -> Result<bool, sqlx::Error> {
    let tables = get_tables(endpoint).await?;
    Ok(tables.iter().any(|name| name.eq_ignore_ascii_case(table)))
}
