// =====================================================
// COMMON DATABASE TYPES AND STRUCTURES
// =====================================================

use serde::{Deserialize, Serialize};
use std::fmt;

// --- Database Type Enum ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
}

// --- Endpoint Role ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Source,
    Destination,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Source => write!(f, "source"),
            EndpointRole::Destination => write!(f, "destination"),
        }
    }
}

// --- Connection Configuration ---
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConnectionConfig {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "dbType", default)]
    pub db_type: DatabaseType,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub database: Option<String>,
    // PostgreSQL specific
    #[serde(rename = "sslMode")]
    pub ssl_mode: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionConfig {
    /// SQLite keeps the file path in `database`; older configs used `host`.
    pub fn sqlite_path(&self) -> String {
        self.database
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.host.trim().to_string())
    }
}

// --- Query Result ---
#[derive(Serialize, Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

// --- Column Schema ---
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub is_nullable: bool,
}

impl ColumnSchema {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.name, self.data_type)?;
        if self.size > 0 {
            write!(f, "({})", self.size)?;
        }
        if !self.is_nullable {
            write!(f, ", NOT NULL")?;
        }
        write!(f, ")")
    }
}
