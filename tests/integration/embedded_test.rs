//! Embedded engine execution through the executor.

use pretty_assertions::assert_eq;
use querydock::config::Config;
use querydock::engine::{EngineExecutor, EngineSettings};
use querydock::error::QueryDockError;
use querydock::table::Value;

fn executor() -> EngineExecutor {
    let config = Config {
        psql_connection_env: "QUERYDOCK_IT_UNSET_VARIABLE".to_string(),
        ..Config::default()
    };
    EngineExecutor::from_config(&config)
}

#[tokio::test]
async fn test_row_and_column_counts_match_projection() {
    for engine in ["sqlite", "duckdb"] {
        let result = executor()
            .execute(
                "SELECT 1 AS a, 2 AS b, 3 AS c UNION ALL SELECT 4, 5, 6",
                &EngineSettings::new(),
                engine,
            )
            .await
            .unwrap();
        let table = result.as_table().unwrap();
        assert_eq!(table.column_count(), 3, "engine {engine}");
        assert_eq!(table.row_count(), 2, "engine {engine}");
    }
}

#[tokio::test]
async fn test_scripts_run_in_source_order() {
    let script = "CREATE TABLE t(x INTEGER);\n\
                  INSERT INTO t VALUES (1);\n\
                  UPDATE t SET x = x + 10;\n\
                  SELECT x FROM t;";
    for engine in ["sqlite", "duckdb"] {
        let result = executor()
            .execute(script, &EngineSettings::new(), engine)
            .await
            .unwrap();
        assert_eq!(
            result.as_table().unwrap().rows(),
            &[vec![Value::Int(11)]],
            "engine {engine}"
        );
    }
}

#[tokio::test]
async fn test_each_call_gets_a_fresh_database() {
    let executor = executor();
    executor
        .execute("CREATE TABLE t(x INTEGER)", &EngineSettings::new(), "sqlite")
        .await
        .unwrap();
    let err = executor
        .execute("SELECT * FROM t", &EngineSettings::new(), "sqlite")
        .await
        .unwrap_err();
    assert!(matches!(err, QueryDockError::Database(_)));
}

#[tokio::test]
async fn test_duckdb_clingo_requires_extension() {
    let settings = EngineSettings::new().with("clingo", true);
    let err = executor()
        .execute("SELECT 1", &settings, "duckdb")
        .await
        .unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_unknown_engine_is_configuration_error() {
    let err = tokio_test::block_on(executor().execute("SELECT 1", &EngineSettings::new(), "mysql"))
        .unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert_eq!(err.to_string(), "Unknown engine: mysql");
}
