use crate::error::{BridgeResult, IntegrationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::sync::LazyLock;
use tokio::sync::Mutex;
use uuid::Uuid;

static RUN_SNAPSHOT_STORE: LazyLock<Mutex<HashMap<String, IntegrationRunSummary>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));
static LOCAL_DB_POOL: LazyLock<Mutex<Option<Pool<Sqlite>>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationRunMode {
    Integrate,
    Merge,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationRunStatus {
    #[default]
    Running,
    Success,
    Failed,
}

impl IntegrationRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntegrationRunStatus::Success | IntegrationRunStatus::Failed
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRunSummary {
    pub run_id: String,
    pub mode: IntegrationRunMode,
    pub status: IntegrationRunStatus,
    pub rows_affected: u64,
    pub group_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl IntegrationRunSummary {
    pub fn started(mode: IntegrationRunMode, group_count: usize) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            mode,
            status: IntegrationRunStatus::Running,
            rows_affected: 0,
            group_count,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_success(&mut self, rows_affected: u64) {
        self.status = IntegrationRunStatus::Success;
        self.rows_affected = rows_affected;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: &str) {
        self.status = IntegrationRunStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.to_string());
    }
}

async fn ensure_schema(pool: &Pool<Sqlite>) -> BridgeResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS integration_runs (
            run_id TEXT PRIMARY KEY,
            run_json TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_integration_runs_started_at ON integration_runs(started_at DESC);
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        IntegrationError::Storage(format!("failed to initialize run storage: {}", e))
    })?;

    Ok(())
}

async fn clone_pool() -> Option<Pool<Sqlite>> {
    let guard = LOCAL_DB_POOL.lock().await;
    guard.clone()
}

async fn put_run_in_memory(run: IntegrationRunSummary) {
    let mut guard = RUN_SNAPSHOT_STORE.lock().await;
    guard.insert(run.run_id.clone(), run);
}

async fn persist_run(pool: &Pool<Sqlite>, run: &IntegrationRunSummary) -> BridgeResult<()> {
    let run_json = serde_json::to_string(run)
        .map_err(|e| IntegrationError::Storage(format!("failed to serialize run summary: {}", e)))?;
    let updated_at = run.finished_at.unwrap_or(run.started_at);

    sqlx::query(
        r#"
        INSERT INTO integration_runs (run_id, run_json, started_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            run_json = excluded.run_json,
            started_at = excluded.started_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&run.run_id)
    .bind(run_json)
    .bind(run.started_at.timestamp())
    .bind(updated_at.timestamp())
    .execute(pool)
    .await
    .map_err(|e| IntegrationError::Storage(format!("failed to persist run summary: {}", e)))?;

    Ok(())
}

async fn load_run_from_db(pool: &Pool<Sqlite>, run_id: &str) -> Option<IntegrationRunSummary> {
    let row = sqlx::query("SELECT run_json FROM integration_runs WHERE run_id = ? LIMIT 1")
        .bind(run_id)
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()?;

    let run_json: String = row.try_get("run_json").ok()?;
    serde_json::from_str::<IntegrationRunSummary>(&run_json).ok()
}

async fn load_runs_from_db(pool: &Pool<Sqlite>, limit: usize) -> Vec<IntegrationRunSummary> {
    let safe_limit = i64::try_from(limit).unwrap_or(i64::MAX).clamp(1, 500);
    let rows = match sqlx::query(
        "SELECT run_json FROM integration_runs ORDER BY started_at DESC, updated_at DESC LIMIT ?",
    )
    .bind(safe_limit)
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };

    rows.into_iter()
        .filter_map(|row| {
            let raw: String = row.try_get("run_json").ok()?;
            serde_json::from_str::<IntegrationRunSummary>(&raw).ok()
        })
        .collect()
}

pub async fn set_local_pool(pool: Pool<Sqlite>) -> BridgeResult<()> {
    ensure_schema(&pool).await?;
    let mut guard = LOCAL_DB_POOL.lock().await;
    *guard = Some(pool);
    Ok(())
}

pub async fn put_run(run: IntegrationRunSummary) {
    {
        let mut guard = RUN_SNAPSHOT_STORE.lock().await;
        guard.insert(run.run_id.clone(), run.clone());
    }

    if let Some(pool) = clone_pool().await {
        if let Err(error) = persist_run(&pool, &run).await {
            log::error!("{}", error);
        }
    }
}

pub async fn get_run(run_id: &str) -> Option<IntegrationRunSummary> {
    {
        let guard = RUN_SNAPSHOT_STORE.lock().await;
        if let Some(run) = guard.get(run_id) {
            return Some(run.clone());
        }
    }

    let pool = clone_pool().await?;
    let run = load_run_from_db(&pool, run_id).await?;
    put_run_in_memory(run.clone()).await;
    Some(run)
}

pub async fn list_runs(limit: usize) -> Vec<IntegrationRunSummary> {
    let safe_limit = limit.clamp(1, 500);

    if let Some(pool) = clone_pool().await {
        let runs = load_runs_from_db(&pool, safe_limit).await;
        if !runs.is_empty() {
            for run in &runs {
                put_run_in_memory(run.clone()).await;
            }
            return runs;
        }
    }

    let guard = RUN_SNAPSHOT_STORE.lock().await;
    let mut runs = guard.values().cloned().collect::<Vec<_>>();
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    runs.truncate(safe_limit);
    runs
}
