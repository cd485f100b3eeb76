// =====================================================
// DATABASE DISPATCHER MODULE
// Routes endpoint operations to the MySQL, PostgreSQL
// or SQLite modules
// =====================================================

pub mod sql_utils;

pub mod connections;
pub use connections::*;

pub mod metadata;

pub mod query_execution;
pub use query_execution::*;
