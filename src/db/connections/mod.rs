// =====================================================
// ENDPOINT CONNECTIONS
// Pool construction and the connection-provider seam
// =====================================================

use crate::db_types::{ConnectionConfig, DatabaseType, EndpointRole};
use crate::error::{BridgeResult, IntegrationError};
use crate::{mysql, postgres, sqlite};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Postgres, Sqlite};

/// A live pool for one endpoint, together with the catalog context its
/// backend needs for introspection queries.
#[derive(Clone, Debug)]
pub enum EndpointPool {
    MySql { pool: Pool<MySql>, database: String },
    Postgres { pool: Pool<Postgres>, schema: String },
    Sqlite { pool: Pool<Sqlite> },
}

impl EndpointPool {
    pub async fn connect(config: &ConnectionConfig, role: EndpointRole) -> BridgeResult<Self> {
        match config.db_type {
            DatabaseType::MySQL => {
                let pool = mysql::create_pool(config)
                    .await
                    .map_err(|message| IntegrationError::Connectivity { role, message })?;
                Ok(EndpointPool::MySql {
                    pool,
                    database: config.database.clone().unwrap_or_default(),
                })
            }
            DatabaseType::PostgreSQL => {
                let pool = postgres::create_pool(config)
                    .await
                    .map_err(|message| IntegrationError::Connectivity { role, message })?;
                Ok(EndpointPool::Postgres {
                    pool,
                    schema: config
                        .schema
                        .clone()
                        .filter(|value| !value.is_empty())
                        .unwrap_or_else(|| "public".to_string()),
                })
            }
            DatabaseType::SQLite => {
                let pool = sqlite::create_pool(&config.sqlite_path())
                    .await
                    .map_err(|message| IntegrationError::Connectivity { role, message })?;
                Ok(EndpointPool::Sqlite { pool })
            }
        }
    }

    pub fn from_sqlite(pool: Pool<Sqlite>) -> Self {
        EndpointPool::Sqlite { pool }
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            EndpointPool::MySql { .. } => DatabaseType::MySQL,
            EndpointPool::Postgres { .. } => DatabaseType::PostgreSQL,
            EndpointPool::Sqlite { .. } => DatabaseType::SQLite,
        }
    }
}

/// Yields a live pool per logical endpoint. A provider may hand out a
/// fresh pool or a shared one; the engine assumes neither.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn get_pool(&self, role: EndpointRole) -> BridgeResult<EndpointPool>;
}

/// Provider over two fixed endpoint configurations.
#[derive(Clone, Debug)]
pub struct StaticConnectionProvider {
    pub source: ConnectionConfig,
    pub destination: ConnectionConfig,
}

impl StaticConnectionProvider {
    pub fn new(source: ConnectionConfig, destination: ConnectionConfig) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[async_trait]
impl ConnectionProvider for StaticConnectionProvider {
    async fn get_pool(&self, role: EndpointRole) -> BridgeResult<EndpointPool> {
        let config = match role {
            EndpointRole::Source => &self.source,
            EndpointRole::Destination => &self.destination,
        };
        EndpointPool::connect(config, role).await
    }
}
