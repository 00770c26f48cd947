//! Frame executor with caller-held connections.

use pretty_assertions::assert_eq;
use querydock::error::QueryDockError;
use querydock::frame::{EngineConnection, FrameExecutor};
use querydock::table::Value;

#[tokio::test]
async fn test_duckdb_script_side_effects_stay_on_connection() {
    let frames = FrameExecutor::new();
    let mut conn = EngineConnection::duckdb_in_memory().unwrap();

    let frame = frames
        .execute_to_frame(
            "CREATE TABLE t(x INTEGER); INSERT INTO t VALUES (1); SELECT * FROM t;",
            "duckdb",
            Some(&mut conn),
        )
        .await
        .unwrap();
    assert_eq!(frame.names(), &["x"]);
    assert_eq!(frame.height(), 1);
    assert_eq!(frame.column("x"), Some(&[Value::Int(1)][..]));

    let count = frames
        .execute_to_frame("SELECT count(*) AS n FROM t", "duckdb", Some(&mut conn))
        .await
        .unwrap();
    assert_eq!(count.column("n"), Some(&[Value::Int(1)][..]));
}

#[tokio::test]
async fn test_duckdb_create_as_values() {
    let frames = FrameExecutor::new();
    let mut conn = EngineConnection::duckdb_in_memory().unwrap();

    let frame = frames
        .execute_to_frame(
            "CREATE TABLE t(x) AS VALUES (1); SELECT * FROM t;",
            "duckdb",
            Some(&mut conn),
        )
        .await
        .unwrap();
    assert_eq!(frame.names(), &["x"]);
    assert_eq!(frame.column("x"), Some(&[Value::Int(1)][..]));

    let tables = frames
        .execute_to_frame(
            "SELECT table_name FROM information_schema.tables",
            "duckdb",
            Some(&mut conn),
        )
        .await
        .unwrap();
    assert_eq!(tables.column("table_name"), Some(&[Value::from("t")][..]));
}

#[tokio::test]
async fn test_sqlite_literal_semicolons_do_not_split() {
    let frame = FrameExecutor::new()
        .execute_to_frame(
            "CREATE TABLE t(s TEXT); INSERT INTO t VALUES ('a;b'); /* c;d */ SELECT s FROM t",
            "sqlite",
            None,
        )
        .await
        .unwrap();
    assert_eq!(frame.column("s"), Some(&[Value::from("a;b")][..]));
}

#[tokio::test]
async fn test_frames_normalize_values() {
    let frame = FrameExecutor::new()
        .execute_to_frame("SELECT CAST('-0.0' AS DOUBLE) AS z, DATE '2024-01-31' AS d", "duckdb", None)
        .await
        .unwrap();
    let row = frame.row(0).unwrap();
    assert_eq!(row[0].to_display_string(), "0");
    assert_eq!(row[1], Value::from("2024-01-31"));
}

#[tokio::test]
async fn test_frame_round_trips_to_table() {
    let frame = FrameExecutor::new()
        .execute_to_frame("SELECT 1 AS a, 'x' AS b", "sqlite", None)
        .await
        .unwrap();
    let table = frame.into_table();
    assert_eq!(table.columns(), &["a", "b"]);
    assert_eq!(table.rows(), &[vec![Value::Int(1), Value::from("x")]]);
}

#[tokio::test]
async fn test_connection_for_other_engine_is_rejected() {
    let mut conn = EngineConnection::sqlite_in_memory().await.unwrap();
    let err = FrameExecutor::new()
        .execute_to_frame("SELECT 1", "duckdb", Some(&mut conn))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryDockError::Config(_)));
    conn.close().await.unwrap();
}
