use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Destination of an import: a table inside a database.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub db: String,
    pub table: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("invalid 'db' or 'db.table' name: {0}")]
    InvalidName(String),

    #[error("invalid 'db.table' format: {0}")]
    InvalidFormat(String),
}

impl TableRef {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.table)
    }
}

impl FromStr for TableRef {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_name(s) {
            return Err(IdentifierError::InvalidName(s.to_string()));
        }
        match s.split('.').collect::<Vec<_>>().as_slice() {
            [db, table] if !db.is_empty() && !table.is_empty() => Ok(Self::new(*db, *table)),
            _ => Err(IdentifierError::InvalidFormat(s.to_string())),
        }
    }
}

/// Database and table names are restricted to ASCII letters, digits, `_` and
/// the `.` separator.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_db_table() {
        let parsed: TableRef = "test.history".parse().unwrap();
        assert_eq!(parsed, TableRef::new("test", "history"));
        assert_eq!(parsed.to_string(), "test.history");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "test".parse::<TableRef>(),
            Err(IdentifierError::InvalidFormat("test".into()))
        );
        assert_eq!(
            "a.b.c".parse::<TableRef>(),
            Err(IdentifierError::InvalidFormat("a.b.c".into()))
        );
        assert_eq!(
            "te st.x".parse::<TableRef>(),
            Err(IdentifierError::InvalidName("te st.x".into()))
        );
    }
}
