//! Error types for querydock.
//!
//! Defines the main error enum used throughout the crate. Compile-stage
//! failures live in [`crate::pipeline`] and are wrapped here transparently.

use std::process::ExitStatus;

use thiserror::Error;

use crate::pipeline::CompileFailure;

/// Main error type for querydock operations.
#[derive(Error, Debug)]
pub enum QueryDockError {
    /// The engine name is not one of the supported engines.
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    /// The frame executor cannot run this engine.
    #[error("{0}")]
    UnsupportedEngineForFrame(String),

    /// The engine needs a connection and none was supplied or configured.
    #[error("Missing connection: {0}")]
    MissingConnection(String),

    /// Configuration errors (invalid config file, mismatched connection, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An engine process exited unsuccessfully without readable output.
    #[error("{program} exited with {status} and produced no readable output")]
    ProcessFailed { program: String, status: ExitStatus },

    /// Process spawn or pipe failures, surfaced as the OS reported them.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Native PostgreSQL or SQLite driver failures.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Native DuckDB failures.
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    /// A compile stage failed.
    #[error(transparent)]
    Compile(#[from] CompileFailure),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryDockError {
    /// Creates an unknown-engine error for the given engine name.
    pub fn unknown_engine(name: impl Into<String>) -> Self {
        Self::UnknownEngine(name.into())
    }

    /// Creates a missing-connection error with the given message.
    pub fn missing_connection(msg: impl Into<String>) -> Self {
        Self::MissingConnection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for errors caused by configuration rather than execution.
    ///
    /// Unknown engines, frame-unsupported engines and missing connections are
    /// all reported through this single class.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownEngine(_)
                | Self::UnsupportedEngineForFrame(_)
                | Self::MissingConnection(_)
                | Self::Config(_)
        )
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownEngine(_)
            | Self::UnsupportedEngineForFrame(_)
            | Self::MissingConnection(_)
            | Self::Config(_) => "Configuration Error",
            Self::ProcessFailed { .. } | Self::Io(_) => "Execution Error",
            Self::Database(_) | Self::DuckDb(_) => "Query Error",
            Self::Compile(_) => "Compile Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using QueryDockError.
pub type Result<T> = std::result::Result<T, QueryDockError>;
