use crate::core::{identifiers::TableRef, value::Record};
use std::{path::Path, sync::Arc};

/// An ordered group of records bound for a single table.
#[derive(Debug, Clone)]
pub struct Batch {
    /// File the records were read from.
    pub source: Arc<Path>,
    pub destination: TableRef,
    pub records: Vec<Record>,
    /// Sum of the encoded sizes of `records`.
    pub size_bytes: usize,
}

impl Batch {
    pub fn new(source: Arc<Path>, destination: TableRef) -> Self {
        Self {
            source,
            destination,
            records: Vec::new(),
            size_bytes: 0,
        }
    }

    pub fn push(&mut self, record: Record, encoded_len: usize) {
        self.records.push(record);
        self.size_bytes += encoded_len;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Moves the accumulated records out, leaving an empty batch for the same
    /// source and destination behind.
    pub fn take(&mut self) -> Batch {
        let size_bytes = std::mem::take(&mut self.size_bytes);
        Batch {
            source: self.source.clone(),
            destination: self.destination.clone(),
            records: std::mem::take(&mut self.records),
            size_bytes,
        }
    }
}
