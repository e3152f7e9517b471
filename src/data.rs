use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::normalize::NormalizedTable;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input has no header row")]
    NoHeader,
    #[error("record {line} has {found} fields but the header has {expected}")]
    TooManyFields { line: u64, found: usize, expected: usize },
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

/// One unparsed record, positioned against [`RawTable::headers`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<String>,
}

impl RawRow {
    pub fn new(fields: Vec<String>) -> RawRow {
        RawRow { fields }
    }

    /// Short records read as blanks past their last field.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn read_csv(file_path: &Path) -> Result<RawTable, InputError> {
    let file = File::open(file_path).map_err(|source| InputError::Open {
        path: file_path.to_path_buf(),
        source,
    })?;

    read_csv_from(file)
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<RawTable, InputError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|header| header.is_empty()) {
        return Err(InputError::NoHeader);
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(InputError::TooManyFields {
                line: record.position().map_or(0, |p| p.line()),
                found: record.len(),
                expected: headers.len(),
            });
        }

        rows.push(RawRow::new(record.iter().map(str::to_string).collect()));
    }

    debug!("read {} records under {} headers", rows.len(), headers.len());

    Ok(RawTable { headers, rows })
}

/// Writes the normalized rows as CSV, header first, nulls as empty fields.
pub fn write_csv<W: io::Write>(table: &NormalizedTable, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(table.columns.iter().map(|column| column.name()))?;

    for row in &table.rows {
        let record: Vec<_> = table.columns.iter().map(|column| row.value(*column)).collect();
        csv_writer.serialize(record)?;
    }

    csv_writer.flush()?;

    Ok(())
}
