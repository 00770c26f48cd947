//! Result tables returned by every engine.
//!
//! A [`ResultTable`] is the display-oriented shape (ordered column names plus
//! positional rows); a [`Frame`] is the column-major shape handed to
//! programmatic consumers.

mod frame;
mod value;

pub use frame::Frame;
pub use value::{Row, Value};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryDockError, Result};

/// Ordered column names plus rows aligned to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Creates a table, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(QueryDockError::internal(format!(
                "row {index} has {} values but the table has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Creates a table with columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Splits the table into its header and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }

    /// Renders the table as a boxed ASCII grid.
    ///
    /// ```text
    /// +----+-------+
    /// | id | name  |
    /// +----+-------+
    /// | 1  | Alice |
    /// +----+-------+
    /// ```
    pub fn to_display_string(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Value::to_display_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let border = format!(
            "+-{}-+",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-")
        );

        let mut lines = Vec::with_capacity(cells.len() + 4);
        lines.push(border.clone());
        lines.push(render_line(&self.columns, &widths));
        lines.push(border.clone());
        for row in &cells {
            lines.push(render_line(row, &widths));
        }
        lines.push(border);
        lines.join("\n")
    }
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    format!("| {} |", padded.join(" | "))
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// What an engine hands back before any frame normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Output of an engine process, already formatted by the engine.
    Text(String),
    /// Rows fetched through a native driver.
    Table(ResultTable),
}

impl RawResult {
    /// Returns the table if the engine produced one natively.
    pub fn as_table(&self) -> Option<&ResultTable> {
        match self {
            Self::Table(table) => Some(table),
            Self::Text(_) => None,
        }
    }

    /// Returns the engine text if the result came from a process.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Table(_) => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Table(table) => table.to_display_string(),
        }
    }
}

impl fmt::Display for RawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}
