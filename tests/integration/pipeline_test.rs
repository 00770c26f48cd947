//! Compile pipeline driven end to end through the runner.

use pretty_assertions::assert_eq;
use querydock::engine::{EngineExecutor, EngineSettings};
use querydock::error::QueryDockError;
use querydock::frame::FrameExecutor;
use querydock::pipeline::{
    CompileFailure, CompileStage, EngineAnnotation, Pipeline, ProgramCompiler, ReportMode,
    Reporter, SourceLocation, UserFlags,
};
use querydock::runner::{Runner, SqlReceiver};
use querydock::table::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A toy compiler: each line is `Name(value)`, and the predicate becomes a
/// `SELECT` of the values recorded for that name. `@Engine(name)` picks the
/// engine; `@Setting(key, value)` adds to that engine's settings block;
/// `@Import(file)` splices in the rules of a file under the import root.
struct FactCompiler;

#[derive(Default)]
struct FactProgram {
    facts: Vec<(String, String)>,
    annotation: EngineAnnotation,
}

impl ProgramCompiler for FactCompiler {
    type Rules = Vec<(String, String)>;
    type Program = FactProgram;

    fn parse(&self, source: &str, import_root: Option<&Path>) -> Result<Self::Rules, CompileFailure> {
        let mut rules = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed = line
                .strip_suffix(')')
                .and_then(|l| l.split_once('('))
                .map(|(name, arg)| (name.to_string(), arg.to_string()));
            match parsed {
                Some((name, file)) if name == "@Import" => {
                    let root = import_root.ok_or_else(|| {
                        CompileFailure::new(CompileStage::Parse, "@Import needs an import root.")
                    })?;
                    let imported = std::fs::read_to_string(root.join(&file)).map_err(|e| {
                        CompileFailure::new(CompileStage::Parse, format!("Cannot import {file}: {e}"))
                    })?;
                    rules.extend(self.parse(&imported, import_root)?);
                }
                Some(rule) => rules.push(rule),
                None => {
                    return Err(CompileFailure::new(CompileStage::Parse, "Expected Name(value).")
                        .with_location(SourceLocation {
                            line: index + 1,
                            column: 1,
                            snippet: Some(line.to_string()),
                        }))
                }
            }
        }
        Ok(rules)
    }

    fn build_program(
        &self,
        rules: Self::Rules,
        _user_flags: &UserFlags,
    ) -> Result<FactProgram, CompileFailure> {
        let mut program = FactProgram::default();
        let mut settings = EngineSettings::new();
        for (name, arg) in rules {
            match name.as_str() {
                "@Engine" => program.annotation.engine = Some(arg),
                "@Setting" => {
                    let (key, value) = arg.split_once(',').ok_or_else(|| {
                        CompileFailure::new(CompileStage::RuleCompile, "@Setting needs a key and a value")
                    })?;
                    settings.insert(key.trim(), value.trim());
                }
                _ => program.facts.push((name, arg)),
            }
        }
        if let Some(engine) = &program.annotation.engine {
            if !settings.is_empty() {
                program.annotation.settings.insert(engine.clone(), settings);
            }
        }
        Ok(program)
    }

    fn format_sql(&self, program: &FactProgram, predicate: &str) -> Result<String, CompileFailure> {
        let values: Vec<String> = program
            .facts
            .iter()
            .filter(|(name, _)| name == predicate)
            .map(|(_, value)| format!("SELECT {value} AS col0"))
            .collect();
        if values.is_empty() {
            return Err(CompileFailure::new(
                CompileStage::RuleCompile,
                format!("Predicate {predicate} is not defined."),
            ));
        }
        Ok(values.join(" UNION ALL "))
    }

    fn engine_annotation(&self, program: &FactProgram) -> Result<EngineAnnotation, CompileFailure> {
        Ok(program.annotation.clone())
    }
}

#[derive(Default, Clone)]
struct Collect {
    diagnostics: Arc<Mutex<Vec<String>>>,
}

impl Reporter for Collect {
    fn emit(&self, diagnostic: &str) {
        self.diagnostics.lock().unwrap().push(diagnostic.to_string());
    }

    fn terminate(&self, _code: i32) {}
}

fn runner(reporter: &Collect) -> Runner<FactCompiler> {
    runner_with(Pipeline::new(FactCompiler), reporter)
}

fn runner_with(pipeline: Pipeline<FactCompiler>, reporter: &Collect) -> Runner<FactCompiler> {
    Runner::new(
        pipeline.with_reporter(Box::new(reporter.clone())),
        EngineExecutor::empty(),
        FrameExecutor::new(),
    )
}

#[tokio::test]
async fn test_program_runs_on_annotated_engine() {
    let reporter = Collect::default();
    let mut receiver = SqlReceiver::default();

    let frame = runner(&reporter)
        .run_predicate_from_string(
            "@Engine(sqlite)\nQ(1)\nQ(2)\nR(3)",
            "Q",
            None,
            Some(&mut receiver),
        )
        .await
        .unwrap();

    assert_eq!(frame.column("col0"), Some(&[Value::Int(1), Value::Int(2)][..]));
    assert_eq!(
        receiver.sql.as_deref(),
        Some("SELECT 1 AS col0 UNION ALL SELECT 2 AS col0")
    );
    assert!(reporter.diagnostics.lock().unwrap().is_empty());
}

#[test]
fn test_settings_block_follows_annotation() {
    let reporter = Collect::default();
    let query = runner(&reporter)
        .compile_predicate_from_string("@Engine(trino)\n@Setting(catalog, hive)\nQ(1)", "Q")
        .unwrap();
    assert_eq!(query.engine(), "trino");
    assert_eq!(query.settings(), &EngineSettings::new().with("catalog", "hive"));
}

#[test]
fn test_missing_annotation_defaults_to_bigquery() {
    let reporter = Collect::default();
    let query = runner(&reporter)
        .compile_predicate_from_string("Q(1)", "Q")
        .unwrap();
    assert_eq!(query.engine(), "bigquery");
    assert!(query.settings().is_empty());
}

#[test]
fn test_parse_failure_is_reported_with_location() {
    let reporter = Collect::default();
    let err = runner(&reporter)
        .compile_predicate_from_string("Q(1)\nQ(2", "Q")
        .unwrap_err();

    assert!(matches!(
        err,
        QueryDockError::Compile(CompileFailure {
            stage: CompileStage::Parse,
            ..
        })
    ));
    assert_eq!(
        *reporter.diagnostics.lock().unwrap(),
        vec!["Parsing:\n  at line 2, column 1:\n    Q(2\n    ^\n[ Error ] Expected Name(value).".to_string()]
    );
}

#[tokio::test]
async fn test_exit_mode_reports_then_returns_failure_when_not_terminated() {
    let reporter = Collect::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("program.l");
    std::fs::write(&path, "Q(1)").unwrap();

    let err = runner(&reporter)
        .run_predicate_to_frame(&path, "Missing", None)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Compile Error");
    assert_eq!(reporter.diagnostics.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_imports_resolve_against_import_root() {
    let reporter = Collect::default();
    let lib = tempfile::tempdir().unwrap();
    std::fs::write(lib.path().join("facts.l"), "Q(7)\nQ(8)").unwrap();

    let programs = tempfile::tempdir().unwrap();
    let path = programs.path().join("program.l");
    std::fs::write(&path, "@Engine(sqlite)\n@Import(facts.l)").unwrap();

    let frame = runner_with(Pipeline::new(FactCompiler).with_import_root(lib.path()), &reporter)
        .run_predicate_to_frame(&path, "Q", None)
        .await
        .unwrap();
    assert_eq!(frame.column("col0"), Some(&[Value::Int(7), Value::Int(8)][..]));

    let err = runner(&reporter)
        .compile_predicate_from_string("@Import(facts.l)", "Q")
        .unwrap_err();
    assert_eq!(err.to_string(), "parse error: @Import needs an import root.");
}
