// =====================================================
// TYPED FAILURES SURFACED BY THE INTEGRATION ENGINE
// =====================================================

use crate::db_types::EndpointRole;
use crate::integration::models::MergePhase;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, IntegrationError>;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("failed to connect to the {role} endpoint: {message}")]
    Connectivity { role: EndpointRole, message: String },

    #[error("identifier `{identifier}` does not exist in `{table}` on the {role} endpoint")]
    RejectedIdentifier {
        role: EndpointRole,
        table: String,
        identifier: String,
    },

    #[error("{phase} failed for {source_table} -> {dest_table} ({rows_affected} rows already applied): {source}")]
    Execution {
        phase: MergePhase,
        source_table: String,
        dest_table: String,
        /// Rows successfully applied and committed before the failure.
        rows_affected: u64,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("run storage failure: {0}")]
    Storage(String),
}
