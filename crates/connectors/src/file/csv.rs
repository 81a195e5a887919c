use crate::file::error::FileError;
use model::{core::value::Record, execution::spec::CsvDialect};
use serde_json::Value;
use std::io::Read;
use tracing::info;

/// Streams the rows of a delimited-text file as string-valued records.
pub struct CsvRecordReader<R> {
    reader: csv::Reader<R>,
    dialect: CsvDialect,
}

impl<R: Read> CsvRecordReader<R> {
    pub fn new(input: R, dialect: &CsvDialect) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(dialect.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        Self {
            reader,
            dialect: dialect.clone(),
        }
    }

    /// Calls `on_record` once per data row, in file order. Empty cells are
    /// left out of the record instead of being stored as empty strings.
    pub fn for_each<F, E>(mut self, mut on_record: F) -> Result<(), E>
    where
        F: FnMut(Record) -> Result<(), E>,
        E: From<FileError>,
    {
        let header = self.resolve_header()?;
        let mut row = csv::StringRecord::new();
        let mut next_line = self.reader.position().line();

        while self.reader.read_record(&mut row).map_err(FileError::from)? {
            // The csv reader drops blank lines; each one counts as an empty row.
            let end_line = self.reader.position().line();
            let spanned = 1 + embedded_newlines(&row);
            let blank = end_line.saturating_sub(next_line).saturating_sub(spanned);
            if blank > 0 {
                return Err(column_mismatch(header.len(), 0, Some(next_line)).into());
            }
            next_line = end_line;

            if row.len() != header.len() {
                return Err(
                    column_mismatch(header.len(), row.len(), row.position().map(|pos| pos.line()))
                        .into(),
                );
            }

            let record = header
                .iter()
                .zip(row.iter())
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(name, cell)| (name.clone(), Value::String(cell.to_string())))
                .collect::<Record>();

            on_record(record)?;
        }

        Ok(())
    }

    fn resolve_header(&mut self) -> Result<Vec<String>, FileError> {
        let file_header = if self.dialect.has_header_row {
            let mut row = csv::StringRecord::new();
            if self.reader.read_record(&mut row)? {
                Some(row.iter().map(str::to_string).collect::<Vec<_>>())
            } else {
                None
            }
        } else {
            None
        };

        match (self.dialect.custom_header.clone(), file_header) {
            (Some(custom), Some(ignored)) => {
                info!(header = ?ignored, "Ignoring header row");
                Ok(custom)
            }
            (Some(custom), None) => Ok(custom),
            (None, Some(header)) => Ok(header),
            (None, None) => Err(FileError::InvalidFormat(
                "no field name information available".to_string(),
            )),
        }
    }
}

fn embedded_newlines(row: &csv::StringRecord) -> u64 {
    row.iter().map(|cell| cell.matches('\n').count() as u64).sum()
}

fn column_mismatch(expected: usize, found: usize, line: Option<u64>) -> FileError {
    FileError::InvalidShape {
        message: format!("inconsistent number of columns: expected {expected}, found {found}"),
        line,
    }
}
