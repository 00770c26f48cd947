//! Common utilities for binary tests.

use std::io::Write;
use std::process::{Command, Stdio};

/// Runs querydock with `args`, feeding `stdin`, with an isolated config.
///
/// Returns (exit code, stdout, stderr).
pub fn run_querydock(args: &[&str], stdin: &str) -> (i32, String, String) {
    run_querydock_with(args, stdin, "", &[])
}

/// Like [`run_querydock`], with `config` as the config file contents and
/// extra environment variables.
pub fn run_querydock_with(
    args: &[&str],
    stdin: &str,
    config: &str,
    envs: &[(&str, &str)],
) -> (i32, String, String) {
    let config_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(&config_path, config).expect("Failed to write config");

    let mut child = Command::new(env!("CARGO_BIN_EXE_querydock"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("LOGICA_PSQL_CONNECTION")
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    let output = child.wait_with_output().expect("Failed to wait for command");
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
