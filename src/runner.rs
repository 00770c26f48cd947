//! Compile-and-run entry points for library callers.

use std::path::Path;
use tracing::info;

use crate::engine::EngineExecutor;
use crate::error::Result;
use crate::frame::{EngineConnection, FrameExecutor};
use crate::pipeline::{CompiledQuery, Pipeline, ProgramCompiler, ReportMode};
use crate::table::{Frame, RawResult};

/// Receives the SQL compiled by [`Runner::run_predicate_from_string`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlReceiver {
    pub sql: Option<String>,
}

/// Compiles predicates and runs them on their annotated engine.
pub struct Runner<C> {
    pipeline: Pipeline<C>,
    executor: EngineExecutor,
    frames: FrameExecutor,
}

impl<C: ProgramCompiler> Runner<C> {
    pub fn new(pipeline: Pipeline<C>, executor: EngineExecutor, frames: FrameExecutor) -> Self {
        Self {
            pipeline,
            executor,
            frames,
        }
    }

    /// Compiles `predicate` from a program file and runs it.
    ///
    /// Compile failures terminate the process.
    pub async fn run_predicate(
        &self,
        path: &Path,
        predicate: &str,
        output_format: &str,
    ) -> Result<RawResult> {
        let query = self.pipeline.compile_file(path, predicate, ReportMode::Exit)?;
        info!(predicate, engine = query.engine(), "Running predicate");
        self.executor
            .execute_with_format(query.sql(), query.settings(), query.engine(), output_format)
            .await
    }

    /// Compiles `predicate` from a program file and runs it to a frame.
    ///
    /// Compile failures terminate the process.
    pub async fn run_predicate_to_frame(
        &self,
        path: &Path,
        predicate: &str,
        connection: Option<&mut EngineConnection>,
    ) -> Result<Frame> {
        let query = self.pipeline.compile_file(path, predicate, ReportMode::Exit)?;
        info!(predicate, engine = query.engine(), "Running predicate to frame");
        self.frames
            .execute_to_frame(query.sql(), query.engine(), connection)
            .await
    }

    /// Compiles `predicate` from program text, returning compile failures.
    pub fn compile_predicate_from_string(&self, source: &str, predicate: &str) -> Result<CompiledQuery> {
        Ok(self.pipeline.compile(source, predicate, ReportMode::Propagate)?)
    }

    /// Compiles `predicate` from program text and runs it to a frame.
    ///
    /// The compiled SQL is stored in `sql_receiver` before it runs.
    pub async fn run_predicate_from_string(
        &self,
        source: &str,
        predicate: &str,
        connection: Option<&mut EngineConnection>,
        sql_receiver: Option<&mut SqlReceiver>,
    ) -> Result<Frame> {
        let query = self.compile_predicate_from_string(source, predicate)?;
        if let Some(receiver) = sql_receiver {
            receiver.sql = Some(query.sql().to_string());
        }
        self.frames
            .execute_to_frame(query.sql(), query.engine(), connection)
            .await
    }
}
