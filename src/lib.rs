// =====================================================
// BRIDGESQL - MAPPING-DRIVEN ROW INTEGRATION ENGINE
// Moves and reconciles rows between two independently
// schemaed relational endpoints via column mappings
// =====================================================

// Database modules
pub mod db_types;
pub mod error;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod db;

// Integration core
pub mod integration;

// Test-endpoint seeding
pub mod mock_data;

pub use db::connections::{ConnectionProvider, EndpointPool, StaticConnectionProvider};
pub use db_types::{ColumnSchema, ConnectionConfig, DatabaseType, EndpointRole, QueryResult};
pub use error::{BridgeResult, IntegrationError};
pub use integration::engine::IntegrationEngine;
pub use integration::models::{
    group_mappings, ColumnMapping, IdentityConfig, IdentityGeneration, MappingGroup,
    MatchCriterion, MergePhase, TablePair,
};
