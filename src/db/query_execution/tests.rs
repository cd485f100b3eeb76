use super::*;
use crate::sqlite::create_memory_pool;
use serde_json::json;

async fn scratch_endpoint() -> EndpointPool {
    let pool = create_memory_pool().await.expect("in-memory pool");
    EndpointPool::from_sqlite(pool)
}

#[tokio::test]
async fn test_execute_binds_and_fetch_rows() {
    let endpoint = scratch_endpoint().await;
    run_script(
        &endpoint,
        "CREATE TABLE SAMPLES (ID INTEGER PRIMARY KEY, LABEL TEXT, SCORE REAL, ACTIVE INTEGER)",
    )
    .await
    .unwrap();

    let affected = execute(
        &endpoint,
        "INSERT INTO SAMPLES (ID, LABEL, SCORE, ACTIVE) VALUES (?, ?, ?, ?)",
        &[json!(1), json!("alpha"), json!(2.5), json!(true)],
    )
    .await
    .unwrap();
    assert_eq!(affected, 1);

    let result = fetch_rows(&endpoint, "SELECT ID, LABEL, SCORE, ACTIVE FROM SAMPLES", &[])
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["ID", "LABEL", "SCORE", "ACTIVE"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], json!(1));
    assert_eq!(result.rows[0][1], json!("alpha"));
    assert_eq!(result.rows[0][2], json!(2.5));
    // SQLite stores booleans as integers
    assert_eq!(result.rows[0][3], json!(1));
}

#[tokio::test]
async fn test_fetch_first_row_uses_cursor_order() {
    let endpoint = scratch_endpoint().await;
    run_script(
        &endpoint,
        "CREATE TABLE ORDERED (ID INTEGER PRIMARY KEY, LABEL TEXT);\n\
         INSERT INTO ORDERED VALUES (1, 'first');\n\
         INSERT INTO ORDERED VALUES (2, 'second');",
    )
    .await
    .unwrap();

    let row = fetch_first_row(&endpoint, "SELECT LABEL FROM ORDERED ORDER BY ID", &[])
        .await
        .unwrap()
        .expect("one row");
    assert_eq!(row[0], json!("first"));

    let missing = fetch_first_row(
        &endpoint,
        "SELECT LABEL FROM ORDERED WHERE ID = ?",
        &[json!(99)],
    )
    .await
    .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_null_bind_round_trip() {
    let endpoint = scratch_endpoint().await;
    run_script(&endpoint, "CREATE TABLE NULLS (ID INTEGER, LABEL TEXT)")
        .await
        .unwrap();

    execute(
        &endpoint,
        "INSERT INTO NULLS (ID, LABEL) VALUES (?, ?)",
        &[json!(1), serde_json::Value::Null],
    )
    .await
    .unwrap();

    let row = fetch_first_row(&endpoint, "SELECT LABEL FROM NULLS WHERE ID = ?", &[json!(1)])
        .await
        .unwrap()
        .expect("one row");
    assert!(row[0].is_null());
}

#[tokio::test]
async fn test_transaction_commit_and_rollback() {
    let endpoint = scratch_endpoint().await;
    run_script(&endpoint, "CREATE TABLE TXN (ID INTEGER PRIMARY KEY)")
        .await
        .unwrap();

    let mut tx = begin(&endpoint).await.unwrap();
    tx.execute("INSERT INTO TXN (ID) VALUES (?)", &[json!(1)])
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let rows = fetch_rows(&endpoint, "SELECT ID FROM TXN", &[]).await.unwrap();
    assert!(rows.rows.is_empty());

    let mut tx = begin(&endpoint).await.unwrap();
    tx.execute("INSERT INTO TXN (ID) VALUES (?)", &[json!(2)])
        .await
        .unwrap();
    let seen = tx
        .fetch_first_row("SELECT ID FROM TXN WHERE ID = ?", &[json!(2)])
        .await
        .unwrap();
    assert!(seen.is_some());
    tx.commit().await.unwrap();

    let rows = fetch_rows(&endpoint, "SELECT ID FROM TXN", &[]).await.unwrap();
    assert_eq!(rows.rows.len(), 1);
}
