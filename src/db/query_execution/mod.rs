// =====================================================
// QUERY EXECUTION DISPATCH
// Bound statement execution and transactions over an
// endpoint pool, rows surfaced as JSON values
// =====================================================

use crate::db::connections::EndpointPool;
use crate::db_types::QueryResult;
use crate::{mysql, postgres, sqlite};
use futures::StreamExt;
use serde_json::Value;
use sqlx::{MySql, Postgres, Sqlite};

#[cfg(test)]
mod tests;

pub async fn fetch_rows(
    endpoint: &EndpointPool,
    sql: &str,
    binds: &[Value],
) -> Result<QueryResult, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = mysql::bind_value(query, value);
            }
            let rows = query.fetch_all(pool).await?;
            Ok(mysql::rows_to_result(&rows))
        }
        EndpointPool::Postgres { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = postgres::bind_value(query, value);
            }
            let rows = query.fetch_all(pool).await?;
            Ok(postgres::rows_to_result(&rows))
        }
        EndpointPool::Sqlite { pool } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = sqlite::bind_value(query, value);
            }
            let rows = query.fetch_all(pool).await?;
            Ok(sqlite::rows_to_result(&rows))
        }
    }
}

/// First row yielded by the cursor, remaining rows discarded.
pub async fn fetch_first_row(
    endpoint: &EndpointPool,
    sql: &str,
    binds: &[Value],
) -> Result<Option<Vec<Value>>, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = mysql::bind_value(query, value);
            }
            Ok(query
                .fetch_optional(pool)
                .await?
                .map(|row| mysql::decode_row(&row)))
        }
        EndpointPool::Postgres { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = postgres::bind_value(query, value);
            }
            Ok(query
                .fetch_optional(pool)
                .await?
                .map(|row| postgres::decode_row(&row)))
        }
        EndpointPool::Sqlite { pool } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = sqlite::bind_value(query, value);
            }
            Ok(query
                .fetch_optional(pool)
                .await?
                .map(|row| sqlite::decode_row(&row)))
        }
    }
}

pub async fn execute(
    endpoint: &EndpointPool,
    sql: &str,
    binds: &[Value],
) -> Result<u64, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = mysql::bind_value(query, value);
            }
            Ok(query.execute(pool).await?.rows_affected())
        }
        EndpointPool::Postgres { pool, .. } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = postgres::bind_value(query, value);
            }
            Ok(query.execute(pool).await?.rows_affected())
        }
        EndpointPool::Sqlite { pool } => {
            let mut query = sqlx::query(sql);
            for value in binds {
                query = sqlite::bind_value(query, value);
            }
            Ok(query.execute(pool).await?.rows_affected())
        }
    }
}

/// Runs a multi-statement script, draining every result set. Used for
/// schema setup and fixture seeding where statements carry no binds.
pub async fn run_script(endpoint: &EndpointPool, script: &str) -> Result<(), sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, .. } => {
            let mut stream = sqlx::raw_sql(script).fetch_many(pool);
            while let Some(result) = stream.next().await {
                result?;
            }
        }
        EndpointPool::Postgres { pool, .. } => {
            let mut stream = sqlx::raw_sql(script).fetch_many(pool);
            while let Some(result) = stream.next().await {
                result?;
            }
        }
        EndpointPool::Sqlite { pool } => {
            let mut stream = sqlx::raw_sql(script).fetch_many(pool);
            while let Some(result) = stream.next().await {
                result?;
            }
        }
    }
    Ok(())
}

// --- Transactions ---

/// One open destination transaction. Dropping it without an explicit
/// commit rolls the work back.
pub enum EndpointTransaction {
    MySql(sqlx::Transaction<'static, MySql>),
    Postgres(sqlx::Transaction<'static, Postgres>),
    Sqlite(sqlx::Transaction<'static, Sqlite>),
}

pub async fn begin(endpoint: &EndpointPool) -> Result<EndpointTransaction, sqlx::Error> {
    match endpoint {
        EndpointPool::MySql { pool, .. } => Ok(EndpointTransaction::MySql(pool.begin().await?)),
        EndpointPool::Postgres { pool, .. } => {
            Ok(EndpointTransaction::Postgres(pool.begin().await?))
        }
        EndpointPool::Sqlite { pool } => Ok(EndpointTransaction::Sqlite(pool.begin().await?)),
    }
}

impl EndpointTransaction {
    pub async fn fetch_first_row(
        &mut self,
        sql: &str,
        binds: &[Value],
    ) -> Result<Option<Vec<Value>>, sqlx::Error> {
        match self {
            EndpointTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = mysql::bind_value(query, value);
                }
                Ok(query
                    .fetch_optional(&mut **tx)
                    .await?
                    .map(|row| mysql::decode_row(&row)))
            }
            EndpointTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = postgres::bind_value(query, value);
                }
                Ok(query
                    .fetch_optional(&mut **tx)
                    .await?
                    .map(|row| postgres::decode_row(&row)))
            }
            EndpointTransaction::Sqlite(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = sqlite::bind_value(query, value);
                }
                Ok(query
                    .fetch_optional(&mut **tx)
                    .await?
                    .map(|row| sqlite::decode_row(&row)))
            }
        }
    }

    pub async fn execute(&mut self, sql: &str, binds: &[Value]) -> Result<u64, sqlx::Error> {
        match self {
            EndpointTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = mysql::bind_value(query, value);
                }
                Ok(query.execute(&mut **tx).await?.rows_affected())
            }
            EndpointTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = postgres::bind_value(query, value);
                }
                Ok(query.execute(&mut **tx).await?.rows_affected())
            }
            EndpointTransaction::Sqlite(tx) => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = sqlite::bind_value(query, value);
                }
                Ok(query.execute(&mut **tx).await?.rows_affected())
            }
        }
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            EndpointTransaction::MySql(tx) => tx.commit().await,
            EndpointTransaction::Postgres(tx) => tx.commit().await,
            EndpointTransaction::Sqlite(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self {
            EndpointTransaction::MySql(tx) => tx.rollback().await,
            EndpointTransaction::Postgres(tx) => tx.rollback().await,
            EndpointTransaction::Sqlite(tx) => tx.rollback().await,
        }
    }
}
