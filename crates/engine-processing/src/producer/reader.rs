use crate::{
    error::ProducerError,
    producer::{DataProducer, ProducerContext, batcher::RecordBatcher},
};
use async_trait::async_trait;
use connectors::{
    file::{csv::CsvRecordReader, error::FileError, json::JsonStreamDecoder},
    store::StoreConnector,
};
use model::execution::spec::{FileFormat, FileImportSpec};
use std::{fs::File, sync::Arc, time::Instant};
use tracing::{debug, info};

/// Imports one file: makes sure the destination table exists, then decodes
/// the file on the blocking pool and feeds its records to a batcher.
pub struct TableReader {
    spec: FileImportSpec,
    connector: Arc<dyn StoreConnector>,
    ctx: ProducerContext,
}

impl TableReader {
    pub fn new(spec: FileImportSpec, connector: Arc<dyn StoreConnector>, ctx: ProducerContext) -> Self {
        Self {
            spec,
            connector,
            ctx,
        }
    }

    async fn ensure_table(&self) -> Result<(), ProducerError> {
        let table = &self.spec.destination;
        let store_err = |source| ProducerError::Store {
            table: table.clone(),
            source,
        };

        let mut conn = self.connector.connect().await.map_err(store_err)?;
        let tables = conn.list_tables(&table.db).await.map_err(store_err)?;
        if tables.iter().any(|name| name == &table.table) {
            return Ok(());
        }

        conn.create_table(table, self.spec.primary_key.as_deref())
            .await
            .map_err(store_err)?;
        info!(
            table = %table,
            primary_key = self.spec.primary_key.as_deref().unwrap_or("<default>"),
            "Created table"
        );
        Ok(())
    }
}

#[async_trait]
impl DataProducer for TableReader {
    async fn run(&mut self) -> Result<usize, ProducerError> {
        if self.ctx.cancel.is_cancelled() {
            return Err(ProducerError::Cancelled);
        }

        let started = Instant::now();
        info!(
            file = %self.spec.path.display(),
            table = %self.spec.destination,
            format = %self.spec.format,
            "Reading file"
        );

        self.ensure_table().await?;

        let spec = self.spec.clone();
        let ctx = self.ctx.clone();
        let batches = tokio::task::spawn_blocking(move || decode_file(&spec, &ctx))
            .await
            .map_err(|e| ProducerError::Task(e.to_string()))??;

        info!(
            file = %self.spec.path.display(),
            table = %self.spec.destination,
            batches,
            duration_ms = started.elapsed().as_millis() as u64,
            "Finished reading file"
        );
        Ok(batches)
    }
}

/// Decodes `spec.path` synchronously, dispatching batches as they fill up.
/// Returns the number of batches dispatched.
pub fn decode_file(spec: &FileImportSpec, ctx: &ProducerContext) -> Result<usize, ProducerError> {
    let file = File::open(&spec.path).map_err(FileError::from)?;
    let mut batcher = RecordBatcher::new(spec, ctx);

    match spec.format {
        FileFormat::Json => JsonStreamDecoder::new(file)
            .with_chunk_size(ctx.read_chunk_size)
            .for_each(|value| batcher.push_value(value))?,
        FileFormat::Csv => {
            CsvRecordReader::new(file, &spec.dialect).for_each(|record| batcher.push(record))?
        }
    }

    let batches = batcher.finish()?;
    debug!(file = %spec.path.display(), batches, "Decoded file");
    Ok(batches)
}
