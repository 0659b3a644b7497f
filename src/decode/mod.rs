use crate::error::IngestError;
use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Open the parquet file at `path` and decode every row, in file order, into
/// arrow record batches. The schema comes from the file's embedded metadata.
///
/// The whole file is materialized up front, mirroring how the decoded table
/// is consumed: the loader re-slices it into fixed-size chunks anyway.
pub fn read_batches(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), IngestError> {
    decode(path).map_err(|e| IngestError::Decode(format!("{e:#}")))
}

fn decode(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata from {}", path.display()))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .with_context(|| format!("opening parquet reader for {}", path.display()))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("decoding rows from {}", path.display()))?;

    Ok((schema, batches))
}
