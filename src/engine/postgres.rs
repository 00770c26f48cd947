//! Native PostgreSQL engine using sqlx.
//!
//! Scripts go through the simple-query protocol, so a multi-statement script
//! is one round trip and every cell arrives as text. Cells are digested by
//! their column type name.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{
    Column as SqlxColumn, Connection, Either, Executor, Row as SqlxRow, Statement, TypeInfo,
};
use tracing::debug;

use super::{digest, Engine, EngineId, EngineKind, ExecutionRequest};
use crate::config::PostgresDsn;
use crate::error::Result;
use crate::script::Script;
use crate::table::{RawResult, ResultTable, Row};

/// PostgreSQL engine. Opens one connection per call.
#[derive(Debug, Clone)]
pub struct PostgresEngine {
    dsn: PostgresDsn,
}

impl PostgresEngine {
    pub fn new(dsn: PostgresDsn) -> Self {
        Self { dsn }
    }

    /// Opens a connection to `dsn`.
    pub async fn connect(dsn: &PostgresDsn) -> Result<PgConnection> {
        debug!(dsn = %dsn.display_string(), "Connecting to PostgreSQL");
        Ok(PgConnection::connect_with(&dsn.connect_options()?).await?)
    }

    /// Runs a possibly multi-statement script on `conn`.
    ///
    /// The rows of the last statement are returned. When it yields no rows
    /// the column names come from preparing the statement.
    pub async fn run_script(conn: &mut PgConnection, sql: &str) -> Result<ResultTable> {
        let mut stream = (&mut *conn).fetch_many(sqlx::raw_sql(sql));

        let mut pending: Vec<PgRow> = Vec::new();
        let mut last: Vec<PgRow> = Vec::new();
        let mut statements = 0usize;

        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(_) => {
                    statements += 1;
                    last = std::mem::take(&mut pending);
                }
                Either::Right(row) => pending.push(row),
            }
        }
        if !pending.is_empty() {
            last = pending;
        }
        drop(stream);
        debug!(statements, rows = last.len(), "PostgreSQL script finished");

        if !last.is_empty() {
            return table_from_rows(&last);
        }
        let Some(statement) = Script::parse(sql).last() else {
            return Ok(ResultTable::default());
        };
        ResultTable::new(describe_columns(conn, statement).await, Vec::new())
    }
}

/// Column names of `statement`, or none when it cannot be prepared.
async fn describe_columns(conn: &mut PgConnection, statement: &str) -> Vec<String> {
    match conn.prepare(statement).await {
        Ok(prepared) => prepared
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
        Err(e) => {
            debug!(error = %e, "Could not describe the last statement");
            Vec::new()
        }
    }
}

fn table_from_rows(rows: &[PgRow]) -> Result<ResultTable> {
    let Some(first) = rows.first() else {
        return Ok(ResultTable::default());
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let data: Vec<Row> = rows.iter().map(convert_row).collect();

    ResultTable::new(columns, data)
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let text = row.try_get_unchecked::<Option<String>, _>(i).ok().flatten();
            digest::postgres_text(col.type_info().name(), text.as_deref())
        })
        .collect()
}

#[async_trait]
impl Engine for PostgresEngine {
    fn id(&self) -> EngineId {
        EngineId::Psql
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn execute(&self, request: &ExecutionRequest<'_>) -> Result<RawResult> {
        let mut conn = Self::connect(&self.dsn).await?;
        let table = Self::run_script(&mut conn, request.sql).await;
        conn.close().await?;
        Ok(RawResult::Table(table?))
    }
}
