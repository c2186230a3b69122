//! CSV text to raw rows.

use std::collections::HashMap;

use csv::{ReaderBuilder, Trim};

use super::columns::Column;

/// Failures reading the CSV text itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsvReadError {
    /// The input could not be decoded as CSV.
    #[error("malformed CSV near line {line}: {message}")]
    Malformed { line: u64, message: String },
    /// The header row was present but no data rows followed.
    #[error("the file contains no data rows")]
    NoRows,
}

/// One data row keyed by recognised column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: u64,
    cells: HashMap<Column, String>,
}

impl RawRow {
    /// Build a row from explicit cells.
    pub fn from_cells(line: u64, cells: impl IntoIterator<Item = (Column, String)>) -> Self {
        Self {
            line,
            cells: cells.into_iter().collect(),
        }
    }

    /// Trimmed cell text; missing columns read as empty.
    pub fn get(&self, column: Column) -> &str {
        self.cells.get(&column).map_or("", |value| value.trim())
    }

    /// Non-empty trimmed cell text.
    pub fn optional(&self, column: Column) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_owned())
    }
}

/// Read CSV text with a header row into rows.
///
/// Unknown columns are ignored, rows with only blank cells are skipped and
/// short rows are tolerated.
pub fn read_rows(text: &str) -> Result<Vec<RawRow>, CsvReadError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<Option<Column>> = reader
        .headers()
        .map_err(|err| malformed(1, &err))?
        .iter()
        .map(Column::from_header)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| {
            let line = err.position().map_or(0, csv::Position::line);
            malformed(line, &err)
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter_map(|(column, cell)| column.map(|column| (column, cell.to_owned())));
        rows.push(RawRow::from_cells(line, cells));
    }

    if rows.is_empty() {
        return Err(CsvReadError::NoRows);
    }
    Ok(rows)
}

fn malformed(line: u64, err: &csv::Error) -> CsvReadError {
    CsvReadError::Malformed {
        line,
        message: err.to_string(),
    }
}
