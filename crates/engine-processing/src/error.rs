use connectors::{file::error::FileError, store::error::StoreError};
use engine_core::error::DispatchClosed;
use model::{
    core::{identifiers::TableRef, value::NotAnObject},
    execution::{
        report::{ErrorKind, ErrorReport},
        spec::FileImportSpec,
    },
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("{0}")]
    File(#[from] FileError),

    #[error("Invalid input, {0}")]
    NotAnObject(#[from] NotAnObject),

    #[error("Failed to prepare table '{table}': {source}")]
    Store {
        table: TableRef,
        #[source]
        source: StoreError,
    },

    #[error("The dispatch queue was closed unexpectedly.")]
    ShutdownSignal(#[from] DispatchClosed),

    #[error("Reader task failed: {0}")]
    Task(String),

    /// The run was cancelled while the file was being read.
    #[error("Import cancelled")]
    Cancelled,
}

impl ProducerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProducerError::File(err) => err.kind(),
            ProducerError::NotAnObject(_) => ErrorKind::Schema,
            ProducerError::Store { source, .. } if source.is_connection() => ErrorKind::Connection,
            ProducerError::Store { .. } => ErrorKind::TableSetup,
            ProducerError::ShutdownSignal(_) | ProducerError::Task(_) => ErrorKind::Internal,
            ProducerError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Converts the error into a user-facing report for the file being read.
    /// Cancellation is not a failure of its own and yields `None`.
    pub fn into_report(self, spec: &FileImportSpec) -> Option<ErrorReport> {
        let kind = self.kind();
        if kind == ErrorKind::Cancelled {
            return None;
        }
        let line = match &self {
            ProducerError::File(err) => err.line(),
            _ => None,
        };

        Some(
            ErrorReport::new(kind, self.to_string())
                .with_table(spec.destination.clone())
                .with_file(&spec.path)
                .with_line(line),
        )
    }
}

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("{source}")]
    Connect {
        #[source]
        source: StoreError,
    },

    #[error("{errors} record(s) failed to import into '{table}': {message}")]
    RowErrors {
        table: TableRef,
        file: PathBuf,
        errors: u64,
        message: String,
    },

    #[error("Failed to write batch to '{table}': {source}")]
    WriteBatch {
        table: TableRef,
        file: PathBuf,
        #[source]
        source: StoreError,
    },
}

impl ConsumerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsumerError::Connect { .. } => ErrorKind::Connection,
            ConsumerError::RowErrors { .. } | ConsumerError::WriteBatch { .. } => {
                ErrorKind::StoreInsert
            }
        }
    }

    pub fn into_report(self) -> ErrorReport {
        let report = ErrorReport::new(self.kind(), self.to_string());
        match self {
            ConsumerError::Connect { .. } => report,
            ConsumerError::RowErrors { table, file, .. }
            | ConsumerError::WriteBatch { table, file, .. } => {
                report.with_table(table).with_file(file)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::execution::spec::FileFormat;

    fn spec() -> FileImportSpec {
        FileImportSpec::new("/data/people.csv", FileFormat::Csv, TableRef::new("test", "people"))
    }

    #[test]
    fn test_cancellation_has_no_report() {
        assert!(ProducerError::Cancelled.into_report(&spec()).is_none());
    }

    #[test]
    fn test_file_error_report_carries_line() {
        let err = ProducerError::File(FileError::InvalidShape {
            message: "inconsistent number of columns".into(),
            line: Some(3),
        });
        let report = err.into_report(&spec()).unwrap();

        assert_eq!(report.kind, ErrorKind::Schema);
        assert_eq!(report.line, Some(3));
        assert_eq!(report.file, Some(PathBuf::from("/data/people.csv")));
        assert_eq!(report.table, Some(TableRef::new("test", "people")));
    }

    #[test]
    fn test_store_errors_are_classified() {
        let refused = ProducerError::Store {
            table: TableRef::new("test", "people"),
            source: StoreError::Handshake("bad key".into()),
        };
        assert_eq!(refused.kind(), ErrorKind::Connection);

        let rejected = ProducerError::Store {
            table: TableRef::new("test", "people"),
            source: StoreError::Runtime("Database `test` does not exist.".into()),
        };
        assert_eq!(rejected.kind(), ErrorKind::TableSetup);
        assert_eq!(
            rejected.into_report(&spec()).unwrap().kind.to_string(),
            "TableSetupError"
        );
    }

    #[test]
    fn test_row_errors_report_source_file() {
        let report = ConsumerError::RowErrors {
            table: TableRef::new("test", "people"),
            file: PathBuf::from("/data/people.json"),
            errors: 2,
            message: "Duplicate primary key `id`".into(),
        }
        .into_report();

        assert_eq!(report.kind, ErrorKind::StoreInsert);
        assert_eq!(report.file, Some(PathBuf::from("/data/people.json")));
        assert_eq!(
            report.message,
            "2 record(s) failed to import into 'test.people': Duplicate primary key `id`"
        );
    }
}
