use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use prettytable::{Cell, Row, Table};

use crate::aggregate::VersionMetric;
use crate::error::BenchmarkError;

pub const SIZE_COLUMN: &str = "size";

/// In-memory copy of the persistent per-size result table.
///
/// Columns accumulate across benchmarking sessions: `size` first, then every
/// `<version>_gflops` / `<version>_time` pair in first-seen order. Merging a
/// new session only ever touches the two columns of the merged version, so
/// results recorded for other versions or sizes survive every run.
pub struct ResultTable {
    columns: Vec<String>,
    rows: BTreeMap<usize, HashMap<String, String>>,
}

impl ResultTable {
    pub fn new() -> Self {
        ResultTable {
            columns: vec![SIZE_COLUMN.to_string()],
            rows: BTreeMap::new(),
        }
    }

    /// Loads an existing table, or returns an empty one if the file does not
    /// exist yet. A missing file is the initial-run case, not an error.
    pub fn load(path: &Path) -> Result<Self, BenchmarkError> {
        if !path.exists() {
            return Ok(ResultTable::new());
        }
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| BenchmarkError::MalformedTable(format!("{}: {}", path.display(), e)))?;
        let headers = reader
            .headers()
            .map_err(|e| BenchmarkError::MalformedTable(format!("{}: {}", path.display(), e)))?
            .clone();
        if !headers.iter().any(|h| h == SIZE_COLUMN) {
            return Err(BenchmarkError::MalformedTable(format!(
                "{}: missing '{}' column",
                path.display(),
                SIZE_COLUMN
            )));
        }

        let mut table = ResultTable::new();
        for header in headers.iter() {
            if header != SIZE_COLUMN {
                table.ensure_column(header);
            }
        }
        for record in reader.records() {
            let record = record.map_err(|e| {
                BenchmarkError::MalformedTable(format!("{}: {}", path.display(), e))
            })?;
            let mut size = None;
            let mut cells = HashMap::new();
            for (header, value) in headers.iter().zip(record.iter()) {
                if header == SIZE_COLUMN {
                    size = Some(value.parse::<usize>().map_err(|_| {
                        BenchmarkError::MalformedTable(format!(
                            "{}: non-integer size '{}'",
                            path.display(),
                            value
                        ))
                    })?);
                } else if !value.is_empty() {
                    cells.insert(header.to_string(), value.to_string());
                }
            }
            // headers contain the size column, so every record yields a size
            let size = size.ok_or_else(|| {
                BenchmarkError::MalformedTable(format!("{}: row without size", path.display()))
            })?;
            table.rows.insert(size, cells);
        }
        Ok(table)
    }

    /// Merges one session's measurements for `version_label`, leaving every
    /// other row and column untouched.
    pub fn merge(&mut self, version_label: &str, results: &BTreeMap<usize, VersionMetric>) {
        let gflops_column = format!("{}_gflops", version_label);
        let time_column = format!("{}_time", version_label);
        self.ensure_column(&gflops_column);
        self.ensure_column(&time_column);
        for (&size, metric) in results {
            let row = self.rows.entry(size).or_default();
            row.insert(gflops_column.clone(), metric.gflops.to_string());
            row.insert(time_column.clone(), metric.time.to_string());
        }
    }

    /// Rewrites the whole table: header, then one row per size in ascending
    /// order, with empty cells for measurements no session has produced.
    ///
    /// The write goes to a temporary sibling first and is renamed over the
    /// target, so the prior file survives a failure mid-write.
    pub fn save(&self, path: &Path) -> Result<(), BenchmarkError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BenchmarkError::Storage(format!(
                        "failed to create '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| {
                BenchmarkError::Storage(format!("failed to open '{}': {}", tmp_path.display(), e))
            })?;
            writer.write_record(&self.columns).map_err(|e| {
                BenchmarkError::Storage(format!("failed to write '{}': {}", tmp_path.display(), e))
            })?;
            for (&size, cells) in &self.rows {
                let record: Vec<String> = self
                    .columns
                    .iter()
                    .map(|column| {
                        if column == SIZE_COLUMN {
                            size.to_string()
                        } else {
                            cells.get(column).cloned().unwrap_or_default()
                        }
                    })
                    .collect();
                writer.write_record(&record).map_err(|e| {
                    BenchmarkError::Storage(format!(
                        "failed to write '{}': {}",
                        tmp_path.display(),
                        e
                    ))
                })?;
            }
            writer.flush().map_err(|e| {
                BenchmarkError::Storage(format!("failed to flush '{}': {}", tmp_path.display(), e))
            })?;
        }
        fs::rename(&tmp_path, path).map_err(|e| {
            BenchmarkError::Storage(format!("failed to replace '{}': {}", path.display(), e))
        })
    }

    /// Column names in storage order: `size` first, then first-seen.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw stored value of one cell, if any session has produced it.
    pub fn get(&self, size: usize, column: &str) -> Option<&str> {
        self.rows.get(&size)?.get(column).map(String::as_str)
    }

    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.keys().copied()
    }

    /// Prints the whole table to the terminal.
    pub fn print(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(
            self.columns.iter().map(|c| Cell::new(c)).collect(),
        ));
        for (&size, cells) in &self.rows {
            let row = self
                .columns
                .iter()
                .map(|column| {
                    if column == SIZE_COLUMN {
                        Cell::new(&size.to_string())
                    } else {
                        Cell::new(cells.get(column).map(String::as_str).unwrap_or(""))
                    }
                })
                .collect();
            table.add_row(Row::new(row));
        }
        table.printstd();
    }

    fn ensure_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::new()
    }
}
