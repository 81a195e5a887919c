use crate::core::identifiers::TableRef;
use serde::Serialize;
use std::{fmt, path::PathBuf};

/// Classification of a failure raised by a reader or worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed input syntax.
    Format,
    /// Row/column count mismatch or a non-object element.
    Schema,
    /// Store unreachable or credentials rejected.
    Connection,
    /// The destination table could not be listed or created.
    TableSetup,
    /// Row-level failures reported by a bulk insert.
    StoreInsert,
    /// Work left on the dispatch queue after the pool drained.
    QueueInvariant,
    /// A reader or worker task panicked.
    Internal,
    /// Side effect of an abort; never surfaced to the user.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Format => "FormatError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::TableSetup => "TableSetupError",
            ErrorKind::StoreInsert => "StoreInsertError",
            ErrorKind::QueueInvariant => "QueueInvariantError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<PathBuf>,
    pub table: Option<TableRef>,
    /// 1-based line in `file`, when known.
    pub line: Option<u64>,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            table: None,
            line: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_table(mut self, table: TableRef) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_line(mut self, line: Option<u64>) -> Self {
        self.line = line;
        self
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(table) = &self.table {
            write!(f, "\n  In table: {table}")?;
        }
        if let Some(file) = &self.file {
            write!(f, "\n  In file: {}", file.display())?;
            if let Some(line) = self.line {
                write!(f, " (line {line})")?;
            }
        }
        Ok(())
    }
}

/// Terminal status of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Interrupted,
    Failed(Vec<ErrorReport>),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }

    /// The user-visible error list; empty unless the run failed.
    pub fn errors(&self) -> &[ErrorReport] {
        match self {
            RunStatus::Failed(reports) => reports,
            _ => &[],
        }
    }
}
