//! Engine abstraction layer for querydock.
//!
//! Provides a trait-based interface over the six SQL backends, so the
//! executor dispatches through a registry instead of comparing engine names
//! at every call site. Two execution shapes implement [`Engine`]: engines
//! driven through a child process and engines embedded as native libraries.

pub mod digest;
mod duckdb_engine;
mod postgres;
mod process;
mod settings;
mod sqlite;

pub use duckdb_engine::{DuckDbEngine, DuckDbExtension, DuckDbHandle};
pub use postgres::PostgresEngine;
pub use process::{Invocation, ProcessEngine};
pub use settings::EngineSettings;
pub use sqlite::SqliteEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{QueryDockError, Result};
use crate::table::RawResult;

/// Output format used when none is requested.
pub const DEFAULT_OUTPUT_FORMAT: &str = "pretty";

/// Supported SQL engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    /// Columnar request/response service, driven through `bq`.
    BigQuery,
    /// Embedded relational engine.
    Sqlite,
    /// PostgreSQL, through `psql` or a native connection.
    Psql,
    /// Distributed interactive engine, driven through `trino`.
    Trino,
    /// Distributed interactive engine, driven through `presto`.
    Presto,
    /// Embedded analytic engine.
    #[serde(rename = "duckdb")]
    DuckDb,
}

impl EngineId {
    /// Every engine, in a stable order.
    pub const ALL: [EngineId; 6] = [
        Self::BigQuery,
        Self::Sqlite,
        Self::Psql,
        Self::Trino,
        Self::Presto,
        Self::DuckDb,
    ];

    /// Returns the engine name as it appears in `@Engine` annotations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigQuery => "bigquery",
            Self::Sqlite => "sqlite",
            Self::Psql => "psql",
            Self::Trino => "trino",
            Self::Presto => "presto",
            Self::DuckDb => "duckdb",
        }
    }

    /// Parses an engine name, failing with `UnknownEngine`.
    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|engine| engine.as_str() == s)
            .ok_or_else(|| QueryDockError::unknown_engine(s))
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = QueryDockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How an engine runs a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// SQL is piped to a command-line client.
    ChildProcess,
    /// SQL runs through a native library in this process.
    Embedded,
}

/// One call's worth of input for an engine.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub sql: &'a str,
    pub settings: &'a EngineSettings,
    /// Only the columnar service honours this; other engines have a fixed shape.
    pub output_format: &'a str,
}

/// Trait implemented by every backend.
#[async_trait]
pub trait Engine: Send + Sync {
    /// The engine this backend serves.
    fn id(&self) -> EngineId;

    fn kind(&self) -> EngineKind;

    /// Runs `request.sql` and returns the backend's result.
    async fn execute(&self, request: &ExecutionRequest<'_>) -> Result<RawResult>;
}

/// Stands in for an engine whose configuration was rejected.
///
/// Every call fails with the configuration error, so the other engines keep
/// working.
struct UnavailableEngine {
    id: EngineId,
    reason: String,
}

impl UnavailableEngine {
    fn new(id: EngineId, error: QueryDockError) -> Self {
        let reason = match error {
            QueryDockError::Config(msg) => msg,
            other => other.to_string(),
        };
        Self { id, reason }
    }
}

#[async_trait]
impl Engine for UnavailableEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn execute(&self, _request: &ExecutionRequest<'_>) -> Result<RawResult> {
        Err(QueryDockError::config(self.reason.clone()))
    }
}

/// Routes SQL to the backend registered for its engine.
pub struct EngineExecutor {
    engines: HashMap<EngineId, Box<dyn Engine>>,
    output_format: String,
}

impl EngineExecutor {
    /// Creates an executor with no engines registered.
    pub fn empty() -> Self {
        Self {
            engines: HashMap::new(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
        }
    }

    /// Creates an executor for all six engines from configuration.
    ///
    /// PostgreSQL runs natively when the configured connection-string variable
    /// is set and through `psql` otherwise. A connection string that cannot be
    /// parsed only fails queries sent to psql.
    pub fn from_config(config: &Config) -> Self {
        let psql: Box<dyn Engine> = match config.psql_connection() {
            Ok(Some(dsn)) => Box::new(PostgresEngine::new(dsn)),
            Ok(None) => Box::new(ProcessEngine::new(EngineId::Psql, &config.binaries.psql)),
            Err(e) => {
                warn!(error = %e, "Ignoring PostgreSQL connection string");
                Box::new(UnavailableEngine::new(EngineId::Psql, e))
            }
        };

        let mut executor = Self::empty()
            .with_output_format(&config.output_format)
            .register(Box::new(SqliteEngine::new()))
            .register(Box::new(DuckDbEngine::new()))
            .register(psql);
        for id in [EngineId::BigQuery, EngineId::Trino, EngineId::Presto] {
            if let Some(binary) = config.binaries.for_engine(id) {
                executor = executor.register(Box::new(ProcessEngine::new(id, binary)));
            }
        }
        executor
    }

    /// Registers (or replaces) the backend for `engine.id()`.
    pub fn register(mut self, engine: Box<dyn Engine>) -> Self {
        self.engines.insert(engine.id(), engine);
        self
    }

    pub fn with_output_format(mut self, format: &str) -> Self {
        self.output_format = format.to_string();
        self
    }

    /// Returns the backend registered for `engine`, if any.
    pub fn engine(&self, engine: EngineId) -> Option<&dyn Engine> {
        self.engines.get(&engine).map(|e| e.as_ref())
    }

    /// Runs `sql` on the named engine with the default output format.
    pub async fn execute(
        &self,
        sql: &str,
        settings: &EngineSettings,
        engine: &str,
    ) -> Result<RawResult> {
        self.execute_with_format(sql, settings, engine, &self.output_format)
            .await
    }

    /// Runs `sql` on the named engine.
    ///
    /// Unknown engine names fail before any process or connection is touched.
    pub async fn execute_with_format(
        &self,
        sql: &str,
        settings: &EngineSettings,
        engine: &str,
        output_format: &str,
    ) -> Result<RawResult> {
        let id = EngineId::parse(engine)?;
        let backend = self
            .engines
            .get(&id)
            .ok_or_else(|| QueryDockError::unknown_engine(engine))?;

        debug!(engine = %id, kind = ?backend.kind(), "Dispatching query");
        backend
            .execute(&ExecutionRequest {
                sql,
                settings,
                output_format,
            })
            .await
    }
}
