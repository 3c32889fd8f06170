use crate::domain::{PvError, PvResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// CSV report whose header is the union of every row's columns, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    header: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `index`, empty when the row lacks that column.
    pub fn value(&self, index: usize, column: &str) -> Option<&str> {
        let row = self.rows.get(index)?;
        let position = *self.positions.get(column)?;
        Some(row.get(position).map_or("", String::as_str))
    }

    fn position(&mut self, column: &str) -> usize {
        if let Some(position) = self.positions.get(column) {
            return *position;
        }
        let position = self.header.len();
        self.header.push(column.to_string());
        self.positions.insert(column.to_string(), position);
        position
    }

    pub fn push_row<C: AsRef<str>>(&mut self, columns: &[C], values: Vec<String>) {
        let mut row = Vec::new();
        for (column, value) in columns.iter().zip(values) {
            let position = self.position(column.as_ref());
            if row.len() <= position {
                row.resize(position + 1, String::new());
            }
            row[position] = value;
        }
        self.rows.push(row);
    }

    pub fn append(&mut self, other: &ReportTable) {
        for row in &other.rows {
            self.push_row(&other.header[..row.len()], row.clone());
        }
    }

    pub fn write_csv(&self, path: &Path) -> PvResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                PvError::io_system(
                    "IO.REPORT_DIRECTORY",
                    format!(
                        "failed to create report directory '{}': {}",
                        parent.display(),
                        source
                    ),
                )
            })?;
        }

        let write_error = |source: csv::Error| {
            PvError::io_system(
                "IO.REPORT_WRITE",
                format!("failed to write report '{}': {}", path.display(), source),
            )
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
        writer.write_record(&self.header).map_err(write_error)?;
        for row in &self.rows {
            let padded = (0..self.header.len()).map(|index| row.get(index).map_or("", String::as_str));
            writer.write_record(padded).map_err(write_error)?;
        }
        writer.flush().map_err(|source| {
            PvError::io_system(
                "IO.REPORT_WRITE",
                format!("failed to flush report '{}': {}", path.display(), source),
            )
        })
    }

    pub fn read_csv(path: &Path) -> PvResult<Self> {
        let read_error = |source: csv::Error| {
            PvError::io_system(
                "IO.REPORT_READ",
                format!("failed to read report '{}': {}", path.display(), source),
            )
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(read_error)?;
        let header = reader
            .headers()
            .map_err(read_error)?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut table = Self::default();
        for column in &header {
            table.position(column);
        }
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            table.push_row(&header, record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }
}
