//! Frame executor: runs SQL on an explicit connection and returns a [`Frame`].
//!
//! Callers that want state to persist between calls hold an
//! [`EngineConnection`] and pass it in each time. When no connection is
//! passed, the embedded engines open a private in-memory database for the
//! call and PostgreSQL connects through the configured environment variable.

use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use std::fmt;
use tracing::debug;

use crate::config::{Config, PostgresDsn, DEFAULT_PSQL_CONNECTION_ENV};
use crate::engine::{digest, DuckDbHandle, EngineId, Invocation, PostgresEngine, SqliteEngine};
use crate::error::{QueryDockError, Result};
use crate::table::{Frame, Row, Value};

/// A request/response columnar service that answers queries with frames.
#[async_trait]
pub trait ColumnarClient: Send + Sync {
    async fn query_to_frame(&self, sql: &str) -> Result<Frame>;
}

/// Columnar client backed by the `bq` command-line tool in JSON mode.
#[derive(Debug, Clone)]
pub struct BqCliClient {
    binary: String,
}

impl BqCliClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(
            &self.binary,
            vec![
                "query".to_string(),
                "--use_legacy_sql=false".to_string(),
                "--format=json".to_string(),
            ],
        )
    }
}

#[async_trait]
impl ColumnarClient for BqCliClient {
    async fn query_to_frame(&self, sql: &str) -> Result<Frame> {
        let output = self.invocation().communicate(sql).await?;
        parse_json_rows(&output)
    }
}

/// Parses a JSON array of row objects into a frame.
///
/// Column order follows the keys of the first object. Keys missing from a
/// later object read as NULL. Blank output is an empty frame.
pub fn parse_json_rows(text: &str) -> Result<Frame> {
    if text.trim().is_empty() {
        return Frame::from_rows(Vec::new(), Vec::new());
    }

    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| QueryDockError::internal(format!("Invalid JSON from columnar service: {e}")))?;
    let serde_json::Value::Array(items) = parsed else {
        return Err(QueryDockError::internal(
            "Columnar service did not return a JSON array",
        ));
    };

    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::Object(map) => objects.push(map),
            other => {
                return Err(QueryDockError::internal(format!(
                    "Expected a JSON object per row, got {other}"
                )))
            }
        }
    }

    let names: Vec<String> = objects
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let rows: Vec<Row> = objects
        .into_iter()
        .map(|object| {
            names
                .iter()
                .map(|name| object.get(name).cloned().map(Value::from).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Frame::from_rows(names, rows)
}

/// A caller-held connection to one engine.
pub enum EngineConnection {
    Columnar(Box<dyn ColumnarClient>),
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
    DuckDb(DuckDbHandle),
}

impl EngineConnection {
    /// Opens a private in-memory SQLite database.
    pub async fn sqlite_in_memory() -> Result<Self> {
        Ok(Self::Sqlite(SqliteEngine::open_in_memory().await?))
    }

    /// Opens a private in-memory DuckDB database.
    pub fn duckdb_in_memory() -> Result<Self> {
        Ok(Self::DuckDb(DuckDbHandle::open_in_memory()?))
    }

    /// Connects to PostgreSQL.
    pub async fn postgres(dsn: &PostgresDsn) -> Result<Self> {
        Ok(Self::Postgres(PostgresEngine::connect(dsn).await?))
    }

    /// The engine this connection serves.
    pub fn engine(&self) -> EngineId {
        match self {
            Self::Columnar(_) => EngineId::BigQuery,
            Self::Postgres(_) => EngineId::Psql,
            Self::Sqlite(_) => EngineId::Sqlite,
            Self::DuckDb(_) => EngineId::DuckDb,
        }
    }

    /// Closes the connection, flushing any pending driver work.
    pub async fn close(self) -> Result<()> {
        match self {
            Self::Postgres(conn) => conn.close().await?,
            Self::Sqlite(conn) => conn.close().await?,
            Self::Columnar(_) | Self::DuckDb(_) => {}
        }
        Ok(())
    }
}

impl fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineConnection({})", self.engine())
    }
}

fn unsupported(engine: impl fmt::Display) -> QueryDockError {
    QueryDockError::UnsupportedEngineForFrame(format!(
        "Frame execution is not available for {engine}; \
         it only supports BigQuery, PostgreSQL and SQLite for now."
    ))
}

/// Runs SQL and returns frames.
#[derive(Debug, Clone)]
pub struct FrameExecutor {
    psql_connection_env: String,
}

impl Default for FrameExecutor {
    fn default() -> Self {
        Self {
            psql_connection_env: DEFAULT_PSQL_CONNECTION_ENV.to_string(),
        }
    }
}

impl FrameExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            psql_connection_env: config.psql_connection_env.clone(),
        }
    }

    /// Runs `sql` on `engine` and returns its result as a frame.
    ///
    /// With `connection` set, side effects of the script stay visible on it.
    /// Without one, a connection is opened for this call only.
    pub async fn execute_to_frame(
        &self,
        sql: &str,
        engine: &str,
        connection: Option<&mut EngineConnection>,
    ) -> Result<Frame> {
        let id = EngineId::parse(engine).map_err(|_| unsupported(engine))?;
        if matches!(id, EngineId::Trino | EngineId::Presto) {
            return Err(unsupported(id));
        }

        let frame = match connection {
            Some(conn) => run_on(id, conn, sql).await?,
            None => {
                let mut conn = self.default_connection(id).await?;
                let frame = run_on(id, &mut conn, sql).await;
                conn.close().await?;
                frame?
            }
        };

        Ok(frame.map_values(digest::normalize))
    }

    async fn default_connection(&self, engine: EngineId) -> Result<EngineConnection> {
        debug!(%engine, "Opening default frame connection");
        match engine {
            EngineId::Sqlite => EngineConnection::sqlite_in_memory().await,
            EngineId::DuckDb => EngineConnection::duckdb_in_memory(),
            EngineId::Psql => match PostgresDsn::from_env(&self.psql_connection_env)? {
                Some(dsn) => EngineConnection::postgres(&dsn).await,
                None => Err(QueryDockError::missing_connection(format!(
                    "psql needs a connection; set {} or pass one",
                    self.psql_connection_env
                ))),
            },
            EngineId::BigQuery => Err(QueryDockError::missing_connection(
                "bigquery needs a columnar client connection",
            )),
            EngineId::Trino | EngineId::Presto => Err(unsupported(engine)),
        }
    }
}

async fn run_on(engine: EngineId, conn: &mut EngineConnection, sql: &str) -> Result<Frame> {
    debug!(%engine, "Running frame query");
    match (engine, conn) {
        (EngineId::BigQuery, EngineConnection::Columnar(client)) => client.query_to_frame(sql).await,
        (EngineId::Psql, EngineConnection::Postgres(conn)) => {
            Ok(PostgresEngine::run_script(conn, sql).await?.into())
        }
        (EngineId::Sqlite, EngineConnection::Sqlite(conn)) => {
            Ok(SqliteEngine::run_script(conn, sql).await?.into())
        }
        (EngineId::DuckDb, EngineConnection::DuckDb(handle)) => {
            Ok(handle.run_script(sql).await?.into())
        }
        (engine, conn) => Err(QueryDockError::config(format!(
            "a {} connection cannot run {engine} queries",
            conn.engine()
        ))),
    }
}
