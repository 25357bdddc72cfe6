//! Row sources for hub imports
//!
//! A source exposes a fixed number of rows, readable in offset/limit windows.
//! `JsonlHubSource` holds rows parsed from a JSON Lines export (one object per line).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};

use super::errors::{HubError, HubResult};

/// One dataset row: column name to value
pub type Row = Map<String, Value>;

/// A dataset that can be read in sequential windows.
pub trait HubSource: Send + Sync {
    /// Total number of rows in the split
    fn num_rows(&self) -> usize;

    /// Reads up to `limit` rows starting at `offset`.
    fn read_batch(&self, offset: usize, limit: usize) -> HubResult<Vec<Row>>;
}

/// Rows loaded from a JSON Lines file
#[derive(Debug, Clone, Default)]
pub struct JsonlHubSource {
    rows: Vec<Row>,
}

impl JsonlHubSource {
    /// Loads every row of a JSON Lines file.
    ///
    /// Blank lines are skipped. Each non-blank line must be a JSON object.
    pub fn open(path: &Path) -> HubResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut rows = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).map_err(|e| HubError::InvalidRow {
                line: i + 1,
                reason: e.to_string(),
            })?;
            match value {
                Value::Object(row) => rows.push(row),
                _ => {
                    return Err(HubError::InvalidRow {
                        line: i + 1,
                        reason: "expected a JSON object".into(),
                    })
                }
            }
        }

        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl HubSource for JsonlHubSource {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn read_batch(&self, offset: usize, limit: usize) -> HubResult<Vec<Row>> {
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}
