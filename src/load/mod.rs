pub mod values;

use crate::config::Config;
use crate::error::IngestError;
use crate::schema;
use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures_util::pin_mut;
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

/// Open a postgres connection from the run's configuration. The connection
/// task is spawned onto the runtime and lives until the client drops.
pub async fn connect(config: &Config) -> Result<Client, IngestError> {
    let (client, connection) = config
        .pg_config()
        .connect(NoTls)
        .await
        .map_err(|e| IngestError::Connection(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!(error = %e, "postgres connection task ended");
        }
    });
    info!(host = %config.host, db = %config.db, "connected to postgres");
    Ok(client)
}

/// Drop any same-named table and create it empty with `schema`'s columns.
/// Runs exactly once per ingest, before any rows are written, including when
/// the source has zero rows. A DDL failure surfaces as an `Insert` error:
/// the taxonomy treats everything past `connect` as the write stage.
pub async fn create_table(
    client: &Client,
    table: &str,
    schema: &SchemaRef,
) -> Result<(), IngestError> {
    let ddl = schema::create_table_sql(table, schema.as_ref())
        .map_err(|e| IngestError::Decode(format!("{e:#}")))?;
    client
        .batch_execute(&ddl)
        .await
        .map_err(|e| IngestError::Insert(format!("recreating table `{table}`: {e}")))?;
    info!(table, columns = schema.fields().len(), "dropped and recreated table");
    Ok(())
}

/// Re-slice the decoded batches into chunks of exactly `chunk_size` rows
/// (the last one shorter), preserving row order. Returns no chunks for an
/// empty source and an error for a zero chunk size.
pub fn partition(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    chunk_size: usize,
) -> Result<Vec<RecordBatch>> {
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be at least 1");
    }
    let total: usize = batches.iter().map(|b| b.num_rows()).sum();
    if total == 0 {
        return Ok(Vec::new());
    }

    let all = concat_batches(schema, batches).context("concatenating decoded batches")?;
    let mut chunks = Vec::with_capacity(total.div_ceil(chunk_size));
    let mut offset = 0;
    while offset < total {
        let len = chunk_size.min(total - offset);
        chunks.push(all.slice(offset, len));
        offset += len;
    }
    Ok(chunks)
}

/// Destination for one chunk of rows. The production implementation is a
/// postgres binary COPY; tests substitute their own to exercise the loop's
/// failure behavior without a live database.
#[async_trait]
pub trait ChunkWriter {
    async fn write_chunk(&mut self, batch: &RecordBatch) -> Result<()>;
}

/// One `COPY ... FROM STDIN BINARY` round trip per chunk. Rows go out in
/// batch order with the column order fixed by the DDL; no row-id column is
/// written.
struct CopyChunkWriter<'a> {
    client: &'a Client,
    copy_sql: String,
    types: &'a [Type],
}

#[async_trait]
impl ChunkWriter for CopyChunkWriter<'_> {
    async fn write_chunk(&mut self, batch: &RecordBatch) -> Result<()> {
        let columns = batch
            .columns()
            .iter()
            .map(values::column_values)
            .collect::<Result<Vec<_>>>()?;

        let sink = self
            .client
            .copy_in(self.copy_sql.as_str())
            .await
            .context("starting COPY")?;
        let writer = BinaryCopyInWriter::new(sink, self.types);
        pin_mut!(writer);

        for row in 0..batch.num_rows() {
            let row_values: Vec<&(dyn ToSql + Sync)> =
                columns.iter().map(|col| col[row].as_sql()).collect();
            writer
                .as_mut()
                .write(&row_values)
                .await
                .with_context(|| format!("writing row {row}"))?;
        }
        writer.finish().await.context("finishing COPY")?;
        Ok(())
    }
}

/// Recreate `table`, then write every decoded row in fixed-size chunks, one
/// COPY per chunk, in source order, logging progress after each. A failed
/// chunk aborts the run; chunks already written stay committed.
pub async fn load(
    client: &Client,
    table: &str,
    schema: &SchemaRef,
    types: &[Type],
    batches: &[RecordBatch],
    chunk_size: usize,
) -> Result<u64, IngestError> {
    create_table(client, table, schema).await?;

    let chunks = partition(schema, batches, chunk_size)
        .map_err(|e| IngestError::Decode(format!("{e:#}")))?;
    let mut writer = CopyChunkWriter {
        client,
        copy_sql: schema::copy_in_sql(table, schema.as_ref()),
        types,
    };
    write_chunks(&mut writer, &chunks, table).await
}

/// The loader loop proper: one `write_chunk` call per chunk, strictly in
/// order. The first failure aborts with an `Insert` error naming the chunk;
/// earlier chunks are already committed and are not rolled back.
pub async fn write_chunks<W: ChunkWriter + Send>(
    writer: &mut W,
    chunks: &[RecordBatch],
    table: &str,
) -> Result<u64, IngestError> {
    let total = chunks.len();
    let mut inserted: u64 = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        writer.write_chunk(chunk).await.map_err(|e| {
            IngestError::Insert(format!("chunk {} of {} into `{table}`: {e:#}", i + 1, total))
        })?;
        inserted += chunk.num_rows() as u64;
        info!(
            chunk = i + 1,
            total,
            rows = chunk.num_rows(),
            "inserted chunk"
        );
    }
    Ok(inserted)
}
