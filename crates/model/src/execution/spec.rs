use crate::core::identifiers::TableRef;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Csv,
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            other => Err(format!(
                "unknown format '{other}', valid options are 'csv' and 'json'"
            )),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Json => f.write_str("json"),
            FileFormat::Csv => f.write_str("csv"),
        }
    }
}

/// How a delimited-text file is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDialect {
    pub delimiter: u8,
    /// Whether the first row of the file holds field names.
    pub has_header_row: bool,
    /// Field names that replace (or stand in for) the file header.
    pub custom_header: Option<Vec<String>>,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header_row: true,
            custom_header: None,
        }
    }
}

/// Everything a reader needs to import one file into one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImportSpec {
    pub path: PathBuf,
    pub format: FileFormat,
    pub destination: TableRef,
    /// `None` lets the store pick its default key when creating the table.
    pub primary_key: Option<String>,
    /// Allow-list of fields to keep; `None` keeps every field.
    pub fields: Option<Vec<String>>,
    pub dialect: CsvDialect,
}

impl FileImportSpec {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat, destination: TableRef) -> Self {
        Self {
            path: path.into(),
            format,
            destination,
            primary_key: None,
            fields: None,
            dialect: CsvDialect::default(),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_dialect(mut self, dialect: CsvDialect) -> Self {
        self.dialect = dialect;
        self
    }
}
