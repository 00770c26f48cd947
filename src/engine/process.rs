//! Engines driven through a command-line client.
//!
//! The SQL goes to the client's stdin and whatever it prints on stdout is the
//! result. Stdin is written and stdout drained at the same time, so a large
//! script or a large result cannot fill a pipe buffer and stall both sides.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Engine, EngineId, EngineKind, EngineSettings, ExecutionRequest};
use crate::error::{QueryDockError, Result};
use crate::table::RawResult;

/// Catalog used by the distributed engines when none is configured.
const DEFAULT_CATALOG: &str = "memory";

/// Coordinator used by the distributed engines when none is configured.
const DEFAULT_SERVER: &str = "http://localhost:8080";

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Runs the program with `input` on stdin and returns its stdout.
    ///
    /// A non-zero exit is only an error when stdout is empty or not UTF-8;
    /// engines print their own diagnostics on the inherited stderr.
    pub async fn communicate(&self, input: &str) -> Result<String> {
        debug!(program = %self.program, args = ?self.args, "Spawning engine process");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| QueryDockError::internal("engine stdin was not captured"))?;

        let feed = async move {
            let written = stdin.write_all(input.as_bytes()).await;
            // Closing stdin tells the client the script is complete.
            drop(stdin);
            match written {
                // The client may exit before reading everything; its output decides.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let ((), output) = tokio::try_join!(feed, child.wait_with_output())?;
        let status = output.status;
        debug!(program = %self.program, %status, bytes = output.stdout.len(), "Engine process exited");

        match String::from_utf8(output.stdout) {
            Ok(text) if status.success() || !text.is_empty() => Ok(text),
            Err(e) if status.success() => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            _ => {
                warn!(program = %self.program, %status, "Engine process failed without readable output");
                Err(QueryDockError::ProcessFailed {
                    program: self.program.clone(),
                    status,
                })
            }
        }
    }
}

/// An engine reached through its command-line client.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    id: EngineId,
    binary: String,
}

impl ProcessEngine {
    /// Creates a process engine for `id` using `binary` as the client.
    pub fn new(id: EngineId, binary: impl Into<String>) -> Self {
        Self {
            id,
            binary: binary.into(),
        }
    }

    /// Builds the client invocation for one query.
    pub fn invocation(&self, settings: &EngineSettings, output_format: &str) -> Result<Invocation> {
        let args = match self.id {
            EngineId::BigQuery => vec![
                "query".to_string(),
                "--use_legacy_sql=false".to_string(),
                format!("--format={output_format}"),
            ],
            EngineId::Psql => vec!["--quiet".to_string()],
            EngineId::Trino => vec![
                format!("--catalog={}", settings.str_or("catalog", DEFAULT_CATALOG)),
                format!("--server={}", settings.str_or("server", DEFAULT_SERVER)),
                "--output-format=ALIGNED".to_string(),
            ],
            EngineId::Presto => vec![
                format!("--catalog={}", settings.str_or("catalog", DEFAULT_CATALOG)),
                format!("--server={}", settings.str_or("server", DEFAULT_SERVER)),
                "--file=/dev/stdin".to_string(),
                "--output-format=ALIGNED".to_string(),
            ],
            EngineId::Sqlite | EngineId::DuckDb => {
                return Err(QueryDockError::config(format!(
                    "{} has no command-line client",
                    self.id
                )))
            }
        };
        Ok(Invocation::new(&self.binary, args))
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn kind(&self) -> EngineKind {
        EngineKind::ChildProcess
    }

    async fn execute(&self, request: &ExecutionRequest<'_>) -> Result<RawResult> {
        let invocation = self.invocation(request.settings, request.output_format)?;
        let text = invocation.communicate(request.sql).await?;
        Ok(RawResult::Text(text))
    }
}
