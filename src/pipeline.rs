//! Compile pipeline coordinator.
//!
//! Drives an external program compiler through four ordered stages:
//! parse, build program, format SQL and resolve the engine. The first stage
//! that fails ends the attempt. Failures are reported the same way in both
//! reporting modes; exit mode then terminates the process.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};

use crate::engine::EngineSettings;
use crate::error::Result;

/// Engine used when a program carries no engine annotation.
pub const DEFAULT_ENGINE: &str = "bigquery";

/// Exit status used when a compile fails in exit mode.
pub const COMPILE_FAILURE_EXIT_CODE: i32 = 1;

/// Flags handed to the compiler when it builds a program.
pub type UserFlags = BTreeMap<String, String>;

/// The stage a compile failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileStage {
    Parse,
    RuleCompile,
    Functor,
    Type,
}

impl CompileStage {
    fn heading(&self) -> &'static str {
        match self {
            Self::Parse => "Parsing",
            Self::RuleCompile => "Compiling",
            Self::Functor => "Expanding functors",
            Self::Type => "Inferring types",
        }
    }
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parse => "parse",
            Self::RuleCompile => "rule compilation",
            Self::Functor => "functor",
            Self::Type => "type",
        };
        f.write_str(name)
    }
}

/// Where in the source a failure was detected. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// The offending source line, if the compiler kept it.
    pub snippet: Option<String>,
}

/// A failure raised by one compile stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} error: {message}")]
pub struct CompileFailure {
    pub stage: CompileStage,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl CompileFailure {
    pub fn new(stage: CompileStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Formats the user-facing diagnostic.
    pub fn render(&self) -> String {
        let mut out = format!("{}:\n", self.stage.heading());
        if let Some(location) = &self.location {
            out.push_str(&format!(
                "  at line {}, column {}:\n",
                location.line, location.column
            ));
            if let Some(snippet) = &location.snippet {
                out.push_str(&format!("    {snippet}\n"));
                let pad = " ".repeat(location.column.saturating_sub(1));
                out.push_str(&format!("    {pad}^\n"));
            }
        }
        out.push_str(&format!("[ Error ] {}", self.message));
        out
    }
}

/// The engine annotation of a compiled program: `@Engine("name", ...)` plus
/// settings blocks keyed by engine name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineAnnotation {
    pub engine: Option<String>,
    pub settings: BTreeMap<String, EngineSettings>,
}

impl EngineAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(mut self, name: impl Into<String>) -> Self {
        self.engine = Some(name.into());
        self
    }

    pub fn with_settings(mut self, engine: impl Into<String>, settings: EngineSettings) -> Self {
        self.settings.insert(engine.into(), settings);
        self
    }
}

/// Picks the engine and its settings from an annotation.
///
/// The engine defaults to [`DEFAULT_ENGINE`]; the settings block keyed by the
/// chosen engine is returned as is, or empty when there is none.
pub fn resolve_engine(mut annotation: EngineAnnotation) -> (String, EngineSettings) {
    let engine = annotation
        .engine
        .take()
        .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
    let settings = annotation.settings.remove(&engine).unwrap_or_default();
    (engine, settings)
}

/// SQL for one predicate together with the engine that should run it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    engine: String,
    settings: EngineSettings,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, engine: impl Into<String>, settings: EngineSettings) -> Self {
        Self {
            sql: sql.into(),
            engine: engine.into(),
            settings,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// The program compiler the pipeline drives.
///
/// Functor expansion and type inference happen inside `build_program`; it
/// reports whichever of them fails first.
pub trait ProgramCompiler {
    type Rules;
    type Program;

    /// Parses program text. Imports resolve against `import_root` when set.
    fn parse(
        &self,
        source: &str,
        import_root: Option<&Path>,
    ) -> std::result::Result<Self::Rules, CompileFailure>;

    fn build_program(
        &self,
        rules: Self::Rules,
        user_flags: &UserFlags,
    ) -> std::result::Result<Self::Program, CompileFailure>;

    fn format_sql(
        &self,
        program: &Self::Program,
        predicate: &str,
    ) -> std::result::Result<String, CompileFailure>;

    fn engine_annotation(
        &self,
        program: &Self::Program,
    ) -> std::result::Result<EngineAnnotation, CompileFailure>;
}

/// What happens after a compile failure has been shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Return the failure to the caller.
    Propagate,
    /// Terminate with [`COMPILE_FAILURE_EXIT_CODE`].
    Exit,
}

/// Shows compile diagnostics and ends the process in exit mode.
pub trait Reporter: Send + Sync {
    fn emit(&self, diagnostic: &str);

    fn terminate(&self, code: i32);
}

/// Writes diagnostics to stderr and exits the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn emit(&self, diagnostic: &str) {
        eprintln!("{diagnostic}");
    }

    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Runs the compile stages over a [`ProgramCompiler`].
pub struct Pipeline<C> {
    compiler: C,
    user_flags: UserFlags,
    import_root: Option<PathBuf>,
    reporter: Box<dyn Reporter>,
}

impl<C: ProgramCompiler> Pipeline<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            user_flags: UserFlags::new(),
            import_root: None,
            reporter: Box::new(StderrReporter),
        }
    }

    pub fn with_user_flags(mut self, user_flags: UserFlags) -> Self {
        self.user_flags = user_flags;
        self
    }

    pub fn with_import_root(mut self, import_root: impl Into<PathBuf>) -> Self {
        self.import_root = Some(import_root.into());
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Compiles `predicate` from program text.
    pub fn compile(
        &self,
        source: &str,
        predicate: &str,
        mode: ReportMode,
    ) -> std::result::Result<CompiledQuery, CompileFailure> {
        self.run_stages(source, predicate)
            .map_err(|failure| self.report(failure, mode))
    }

    /// Reads a program file and compiles `predicate` from it.
    ///
    /// Read errors surface unchanged.
    pub fn compile_file(&self, path: &Path, predicate: &str, mode: ReportMode) -> Result<CompiledQuery> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.compile(&source, predicate, mode)?)
    }

    fn run_stages(
        &self,
        source: &str,
        predicate: &str,
    ) -> std::result::Result<CompiledQuery, CompileFailure> {
        let rules = self.compiler.parse(source, self.import_root.as_deref())?;
        let program = self.compiler.build_program(rules, &self.user_flags)?;
        let sql = self.compiler.format_sql(&program, predicate)?;
        let (engine, settings) = resolve_engine(self.compiler.engine_annotation(&program)?);

        debug!(predicate, %engine, settings = settings.len(), "Compiled predicate");
        Ok(CompiledQuery::new(sql, engine, settings))
    }

    fn report(&self, failure: CompileFailure, mode: ReportMode) -> CompileFailure {
        error!(stage = %failure.stage, "{}", failure.message);
        self.reporter.emit(&failure.render());
        if mode == ReportMode::Exit {
            self.reporter.terminate(COMPILE_FAILURE_EXIT_CODE);
        }
        failure
    }
}
