//! Column-major dataframe-like results.

use std::fmt;

use super::{ResultTable, Row, Value};
use crate::error::Result;

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl Frame {
    /// Builds a frame from column names and row-major data.
    pub fn from_rows(names: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        Ok(ResultTable::new(names, rows)?.into())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Returns the values of the first column with the given name.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Returns row `index` as an owned row.
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.height() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index].clone()).collect())
    }

    /// Applies `f` to every cell.
    pub fn map_values(self, mut f: impl FnMut(Value) -> Value) -> Self {
        let columns = self
            .columns
            .into_iter()
            .map(|column| column.into_iter().map(&mut f).collect())
            .collect();
        Self {
            names: self.names,
            columns,
        }
    }

    /// Converts back to a row-major table.
    pub fn into_table(self) -> ResultTable {
        let height = self.height();
        let mut rows: Vec<Row> = (0..height)
            .map(|_| Vec::with_capacity(self.names.len()))
            .collect();
        for column in self.columns {
            for (row, value) in rows.iter_mut().zip(column) {
                row.push(value);
            }
        }
        // Columns share one height, so every row is as wide as the header.
        ResultTable {
            columns: self.names,
            rows,
        }
    }
}

impl From<ResultTable> for Frame {
    fn from(table: ResultTable) -> Self {
        let (names, rows) = table.into_parts();
        let mut columns: Vec<Vec<Value>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for row in rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self { names, columns }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone().into_table().to_display_string())
    }
}
