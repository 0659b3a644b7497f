use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::{decode, fetch, load, schema};
use tokio::time::Instant;
use tracing::info;

/// Run one full ingest: download the source file, decode it, recreate the
/// destination table, and bulk-load every row in fixed-size chunks. Strictly
/// sequential; the first failing stage ends the run. The downloaded artifact
/// is left on disk for the caller.
pub async fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let client = reqwest::Client::new();
    info!(url = %config.url, dest = %config.output.display(), "downloading source file");
    let start = Instant::now();
    let bytes = fetch::download(&client, &config.url, &config.output).await?;
    info!(bytes, elapsed = ?start.elapsed(), "download complete");

    let (schema, batches) = decode::read_batches(&config.output)?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    info!(rows, columns = schema.fields().len(), "decoded parquet file");

    // Surface unsupported column types before any DDL runs.
    let types = schema::pg_types(schema.as_ref())
        .map_err(|e| IngestError::Decode(format!("{e:#}")))?;

    let client = load::connect(config).await?;
    let inserted = load::load(
        &client,
        &config.table_name,
        &schema,
        &types,
        &batches,
        config.chunk_size,
    )
    .await?;
    info!(rows = inserted, table = %config.table_name, "load complete");

    Ok(())
}
