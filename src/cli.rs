//! Command-line argument parsing for querydock.

use crate::config::Config;
use crate::engine::EngineSettings;
use crate::error::Result;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// Run a SQL script on BigQuery, SQLite, PostgreSQL, Trino, Presto or DuckDB.
#[derive(Parser, Debug)]
#[command(name = "querydock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL script to run (reads stdin when absent or "-")
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Engine to run the script on
    #[arg(short = 'e', long, value_name = "ENGINE", default_value = "bigquery")]
    pub engine: String,

    /// Engine setting, e.g. catalog=hive (repeatable)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE", value_parser = parse_setting)]
    pub settings: Vec<(String, serde_json::Value)>,

    /// Output format passed to bq (defaults to the configured format)
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Run through the frame executor and print the normalized frame
    #[arg(long)]
    pub frame: bool,

    /// Print the statements of the script and exit
    #[arg(long, conflicts_with = "frame")]
    pub split: bool,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Parses `key=value`; `true` and `false` become booleans.
fn parse_setting(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid setting '{s}'. Expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid setting '{s}'. The key is empty"));
    }

    let value = match value {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        other => serde_json::Value::String(other.to_string()),
    };
    Ok((key.to_string(), value))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path (CLI override or default).
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Configured defaults for the chosen engine, overridden by `--setting`.
    pub fn engine_settings(&self, config: &Config) -> EngineSettings {
        let mut settings = config.engine_settings(&self.engine);
        settings.merge(&self.settings.iter().cloned().collect());
        settings
    }

    /// The output format to use: `--format`, else the configured one.
    pub fn output_format(&self, config: &Config) -> String {
        self.format
            .clone()
            .unwrap_or_else(|| config.output_format.clone())
    }

    /// Reads the script from FILE, or stdin when FILE is absent or `-`.
    pub fn read_script(&self) -> Result<String> {
        match &self.file {
            Some(path) if path.as_os_str() != "-" => Ok(std::fs::read_to_string(path)?),
            _ => {
                let mut script = String::new();
                std::io::stdin().read_to_string(&mut script)?;
                Ok(script)
            }
        }
    }
}
