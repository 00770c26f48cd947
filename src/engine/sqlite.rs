//! Embedded SQLite engine using sqlx.

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Column, Connection, Executor, Statement};
use tracing::debug;

use super::{digest, Engine, EngineId, EngineKind, ExecutionRequest};
use crate::error::Result;
use crate::script::Script;
use crate::table::{RawResult, ResultTable, Row};

/// SQLite engine. Every call runs against a fresh in-memory database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> Result<SqliteConnection> {
        Ok(SqliteConnection::connect("sqlite::memory:").await?)
    }

    /// Runs a possibly multi-statement script on `conn`.
    ///
    /// Every statement but the last runs as one batch for its side effects;
    /// the last statement's rows are returned.
    pub async fn run_script(conn: &mut SqliteConnection, sql: &str) -> Result<ResultTable> {
        let script = Script::parse(sql);
        let Some(last) = script.last() else {
            return Ok(ResultTable::default());
        };

        if let Some(prelude) = script.prelude() {
            debug!(statements = script.statements().len() - 1, "Running SQLite prelude");
            conn.execute(prelude.as_str()).await?;
        }

        query_table(conn, last).await
    }
}

async fn query_table(conn: &mut SqliteConnection, sql: &str) -> Result<ResultTable> {
    let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;

    let columns: Vec<String> = match rows.first() {
        Some(row) => sqlx::Row::columns(row)
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
        // No rows to read names from; ask the prepared statement instead.
        None => conn
            .prepare(sql)
            .await?
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
    };

    let data: Vec<Row> = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|i| digest::sqlite_cell(row, i))
                .collect()
        })
        .collect();

    ResultTable::new(columns, data)
}

#[async_trait]
impl Engine for SqliteEngine {
    fn id(&self) -> EngineId {
        EngineId::Sqlite
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn execute(&self, request: &ExecutionRequest<'_>) -> Result<RawResult> {
        let mut conn = Self::open_in_memory().await?;
        let table = Self::run_script(&mut conn, request.sql).await;
        conn.close().await?;
        Ok(RawResult::Table(table?))
    }
}
