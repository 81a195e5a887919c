use model::execution::report::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not syntactically valid for its declared format.
    #[error("{0}")]
    InvalidFormat(String),

    /// The input parsed, but its shape does not fit a record.
    #[error("{message}")]
    InvalidShape { message: String, line: Option<u64> },

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
}

impl FileError {
    pub fn format(message: impl Into<String>) -> Self {
        FileError::InvalidFormat(format!("JSON format not recognized - {}", message.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::InvalidShape { .. } => ErrorKind::Schema,
            FileError::IoError(_) | FileError::InvalidFormat(_) | FileError::CsvError(_) => {
                ErrorKind::Format
            }
        }
    }

    /// 1-based line of the input the error refers to, if known.
    pub fn line(&self) -> Option<u64> {
        match self {
            FileError::InvalidShape { line, .. } => *line,
            FileError::CsvError(err) => err.position().map(|pos| pos.line()),
            _ => None,
        }
    }
}
