//! End-to-end runs of the binary on the embedded engines.

use super::common::{run_querydock, run_querydock_with};
use pretty_assertions::assert_eq;

#[test]
fn test_sqlite_prints_table() {
    let (code, stdout, _) = run_querydock(
        &["--engine", "sqlite"],
        "CREATE TABLE t(id INTEGER, name TEXT);\n\
         INSERT INTO t VALUES (1, 'Alice'), (2, NULL);\n\
         SELECT id, name FROM t ORDER BY id;",
    );
    assert_eq!(code, 0);
    assert_eq!(
        stdout,
        "+----+-------+\n\
         | id | name  |\n\
         +----+-------+\n\
         | 1  | Alice |\n\
         | 2  | NULL  |\n\
         +----+-------+\n"
    );
}

#[test]
fn test_duckdb_frame() {
    let (code, stdout, _) = run_querydock(
        &["--engine", "duckdb", "--frame"],
        "CREATE TABLE t(x INTEGER); INSERT INTO t VALUES (1); SELECT * FROM t;",
    );
    assert_eq!(code, 0);
    assert_eq!(stdout, "+---+\n| x |\n+---+\n| 1 |\n+---+\n");
}

#[test]
fn test_split_prints_statements() {
    let (code, stdout, _) = run_querydock(
        &["--split"],
        "SELECT 'a;b';\n-- note; here\nSELECT 2",
    );
    assert_eq!(code, 0);
    assert_eq!(stdout, "SELECT 'a;b';\n-- note; here\nSELECT 2;\n");
}

#[test]
fn test_unknown_engine_exits_with_configuration_error() {
    let (code, stdout, stderr) = run_querydock(&["--engine", "oracle"], "SELECT 1");
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Configuration Error: Unknown engine: oracle"));
}

#[test]
fn test_trino_frame_is_unsupported() {
    let (code, _, stderr) = run_querydock(&["--engine", "trino", "--frame"], "SELECT 1");
    assert_eq!(code, 1);
    assert!(stderr.contains("BigQuery, PostgreSQL and SQLite"));
}

#[test]
fn test_psql_frame_without_connection_is_missing_connection() {
    let (code, _, stderr) = run_querydock(&["--engine", "psql", "--frame"], "SELECT 1");
    assert_eq!(code, 1);
    assert!(stderr.contains("Missing connection"));
}

#[cfg(unix)]
#[test]
fn test_psql_frame_without_connection_spawns_and_connects_nothing() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("psql-ran");
    let psql = dir.path().join("psql");
    std::fs::write(&psql, format!("#!/bin/sh\ntouch '{}'\n", marker.display())).unwrap();
    std::fs::set_permissions(&psql, std::fs::Permissions::from_mode(0o755)).unwrap();

    // libpq-style defaults point the driver here if it ever connects.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let config = format!("[binaries]\npsql = \"{}\"\n", psql.display());
    let (code, stdout, stderr) = run_querydock_with(
        &["--engine", "psql", "--frame"],
        "SELECT 1",
        &config,
        &[("PGHOST", "127.0.0.1"), ("PGPORT", &port)],
    );

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Missing connection"));
    assert!(stderr.contains("LOGICA_PSQL_CONNECTION"));
    assert!(!marker.exists());
    assert_eq!(
        listener.accept().map(|_| ()).unwrap_err().kind(),
        std::io::ErrorKind::WouldBlock
    );
}

#[cfg(unix)]
#[test]
fn test_psql_without_connection_falls_back_to_client() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let psql = dir.path().join("psql");
    std::fs::write(&psql, "#!/bin/sh\ncat > /dev/null\necho from-psql\n").unwrap();
    std::fs::set_permissions(&psql, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = format!("[binaries]\npsql = \"{}\"\n", psql.display());
    let (code, stdout, _) = run_querydock_with(&["--engine", "psql"], "SELECT 1", &config, &[]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "from-psql\n");
}
