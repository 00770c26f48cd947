//! Process engines against fake command-line clients.

#![cfg(unix)]

use pretty_assertions::assert_eq;
use querydock::engine::{EngineExecutor, EngineId, EngineSettings, ProcessEngine};
use querydock::frame::{BqCliClient, EngineConnection, FrameExecutor};
use querydock::table::Value;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable shell script into `dir`.
fn fake_client(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_client_receives_arguments_and_script() {
    let dir = tempfile::tempdir().unwrap();
    // Echoes its arguments, then the script it read from stdin.
    let client = fake_client(dir.path(), "trino", "echo \"$@\"\ncat");

    let executor = EngineExecutor::empty().register(Box::new(ProcessEngine::new(
        EngineId::Trino,
        client.to_str().unwrap(),
    )));
    let settings = EngineSettings::new()
        .with("catalog", "hive")
        .with("server", "http://trino:8080");
    let result = executor
        .execute("SELECT 1;\nSELECT 2;", &settings, "trino")
        .await
        .unwrap();

    assert_eq!(
        result.as_text(),
        Some("--catalog=hive --server=http://trino:8080 --output-format=ALIGNED\nSELECT 1;\nSELECT 2;")
    );
}

#[tokio::test]
async fn test_bq_client_json_becomes_frame() {
    let dir = tempfile::tempdir().unwrap();
    let client = fake_client(
        dir.path(),
        "bq",
        "cat > /dev/null\necho '[{\"name\":\"a\",\"n\":1},{\"name\":\"b\",\"n\":2}]'",
    );

    let mut conn = EngineConnection::Columnar(Box::new(BqCliClient::new(client.to_str().unwrap())));
    let frame = FrameExecutor::new()
        .execute_to_frame("SELECT name, n FROM t", "bigquery", Some(&mut conn))
        .await
        .unwrap();

    assert_eq!(frame.names(), &["name", "n"]);
    assert_eq!(frame.column("n"), Some(&[Value::Int(1), Value::Int(2)][..]));
}
