//! Tabular data sources: named-column rows, independent of file format.

use crate::error::{PipelineError, Result};
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Anything that can produce a table of named-column rows.
pub trait TabularSource {
    fn load(&self) -> Result<Table>;
}

/// In-memory table of string cells.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: HashMap<String, usize>,
    records: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let mut columns = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins on duplicated headers
            columns.entry(header.clone()).or_insert(i);
        }
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    /// Convenience constructor for literal fixtures.
    pub fn from_rows(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(PipelineError::MissingColumn {
                source_name: self.name.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(move |values| Row {
            table: self,
            values: values.as_slice(),
        })
    }
}

impl TabularSource for Table {
    fn load(&self) -> Result<Table> {
        Ok(self.clone())
    }
}

/// One row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    values: &'a [String],
}

impl<'a> Row<'a> {
    /// Cell text for `column`; absent columns and blank cells are `None`.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.table.columns.get(column)?;
        self.values
            .get(index)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has(&self, column: &str) -> bool {
        self.table.has_column(column)
    }
}

/// A CSV export of one spreadsheet sheet.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TabularSource for CsvSource {
    fn load(&self) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::Headers)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(str::to_string).collect());
        }

        log::debug!("Read {} rows from {}", records.len(), self.path.display());
        Ok(Table::new(self.path.display().to_string(), headers, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_treats_blank_as_missing() {
        let table = Table::from_rows("t", &["a", "b"], &[&["1", "  "]]);
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(row.get("b"), None);
        assert_eq!(row.get("c"), None);
        assert!(row.has("b"));
        assert!(!row.has("c"));
    }

    #[test]
    fn test_short_rows_do_not_panic() {
        let table = Table::from_rows("t", &["a", "b"], &[&["1"]]);
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("b"), None);
    }

    #[test]
    fn test_require_columns_names_the_missing_column() {
        let table = Table::from_rows("grad", &["system"], &[]);
        let err = table.require_columns(&["system", "school"]).unwrap_err();
        assert!(err.to_string().contains("'school'"));
    }

    #[test]
    fn test_csv_source_reads_file() {
        let path = std::env::temp_dir().join(format!("grad-outcomes-{}.csv", std::process::id()));
        std::fs::write(&path, " system ,school\n190,25\n").unwrap();
        let table = CsvSource::new(&path).load().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows().next().unwrap().get("system"), Some("190"));
    }
}
