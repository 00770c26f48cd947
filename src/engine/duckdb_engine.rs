//! Embedded DuckDB engine.
//!
//! DuckDB calls block, so they run on tokio's blocking pool. The connection
//! lives behind a mutex in a cheap-to-clone [`DuckDbHandle`] that callers
//! hold and pass around explicitly when they want state to persist.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{digest, Engine, EngineId, EngineKind, ExecutionRequest};
use crate::error::{QueryDockError, Result};
use crate::script::Script;
use crate::table::{RawResult, ResultTable, Row};

/// Something that augments a DuckDB connection before queries run on it,
/// e.g. the constraint-solving functions enabled by the `clingo` setting.
pub trait DuckDbExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Registers the extension's functions or macros on `conn`.
    fn install(&self, conn: &duckdb::Connection) -> Result<()>;
}

/// A shared DuckDB connection.
#[derive(Clone)]
pub struct DuckDbHandle {
    conn: Arc<Mutex<duckdb::Connection>>,
}

impl std::fmt::Debug for DuckDbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbHandle").finish_non_exhaustive()
    }
}

impl DuckDbHandle {
    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(duckdb::Connection::open_in_memory()?))
    }

    /// Wraps an already opened connection.
    pub fn from_connection(conn: duckdb::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with the connection on the blocking pool.
    pub async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&duckdb::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| QueryDockError::internal("DuckDB connection lock poisoned"))?;
            f(&guard)
        })
        .await
        .map_err(|e| QueryDockError::internal(format!("DuckDB task failed: {e}")))?
    }

    /// Installs `extension` on this connection.
    pub async fn install(&self, extension: Arc<dyn DuckDbExtension>) -> Result<()> {
        debug!(extension = extension.name(), "Installing DuckDB extension");
        self.with_connection(move |conn| extension.install(conn))
            .await
    }

    /// Runs a possibly multi-statement script.
    ///
    /// Every statement but the last runs as one batch for its side effects;
    /// the last statement's rows are returned.
    pub async fn run_script(&self, sql: &str) -> Result<ResultTable> {
        let sql = sql.to_string();
        self.with_connection(move |conn| run_script_blocking(conn, &sql))
            .await
    }
}

fn run_script_blocking(conn: &duckdb::Connection, sql: &str) -> Result<ResultTable> {
    let script = Script::parse(sql);
    let Some(last) = script.last() else {
        return Ok(ResultTable::default());
    };

    if let Some(prelude) = script.prelude() {
        debug!(statements = script.statements().len() - 1, "Running DuckDB prelude");
        conn.execute_batch(&prelude)?;
    }

    let mut stmt = conn.prepare(last)?;
    let mut rows = stmt.query([])?;
    let columns: Vec<String> = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut data: Vec<Row> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(digest::duckdb_cell(row.get_ref(i)?));
        }
        data.push(values);
    }

    ResultTable::new(columns, data)
}

/// DuckDB engine. Every call runs against a fresh in-memory database.
#[derive(Default, Clone)]
pub struct DuckDbEngine {
    clingo: Option<Arc<dyn DuckDbExtension>>,
}

impl DuckDbEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the extension enabled by `clingo = true`.
    pub fn with_clingo(mut self, extension: Arc<dyn DuckDbExtension>) -> Self {
        self.clingo = Some(extension);
        self
    }
}

#[async_trait]
impl Engine for DuckDbEngine {
    fn id(&self) -> EngineId {
        EngineId::DuckDb
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn execute(&self, request: &ExecutionRequest<'_>) -> Result<RawResult> {
        let handle = DuckDbHandle::open_in_memory()?;

        if request.settings.flag("clingo") {
            let extension = self.clingo.clone().ok_or_else(|| {
                QueryDockError::config("clingo is enabled but no clingo extension is registered")
            })?;
            handle.install(extension).await?;
        }

        Ok(RawResult::Table(handle.run_script(request.sql).await?))
    }
}
