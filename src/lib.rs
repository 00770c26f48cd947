//! querydock - run compiled SQL on six engines and get one result shape back.
//!
//! The [`engine`] module dispatches SQL to BigQuery, SQLite, PostgreSQL,
//! Trino, Presto or DuckDB; [`frame`] returns normalized frames from an
//! explicit connection; [`pipeline`] and [`runner`] drive an external program
//! compiler and run what it produces.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod runner;
pub mod script;
pub mod table;
