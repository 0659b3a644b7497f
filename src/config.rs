use crate::error::{IngestError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Command-line configuration for one ingest run. Parsed once at startup
/// and never mutated afterwards.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parqload",
    about = "Download a parquet file over HTTP and bulk-load it into a Postgres table"
)]
pub struct Config {
    /// User name for postgres.
    #[arg(long)]
    pub user: String,

    /// Password for postgres.
    #[arg(long)]
    pub password: String,

    /// Host for postgres.
    #[arg(long)]
    pub host: String,

    /// Port for postgres.
    #[arg(long)]
    pub port: u16,

    /// Database name.
    #[arg(long)]
    pub db: String,

    /// Destination table. Dropped and recreated on every run.
    #[arg(long = "table_name")]
    pub table_name: String,

    /// Source parquet file URL.
    #[arg(long)]
    pub url: String,

    /// Local path for the downloaded artifact.
    #[arg(long, default_value = "output.parquet")]
    pub output: PathBuf,

    /// Rows per insert chunk.
    #[arg(long, default_value_t = 100_000)]
    pub chunk_size: usize,
}

impl Config {
    /// Checks the fields clap cannot: values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::Config("chunk size must be at least 1".into()));
        }
        if self.table_name.trim().is_empty() {
            return Err(IngestError::Config("table name must not be empty".into()));
        }
        Ok(())
    }

    /// Builds the postgres connection parameters from the credential fields.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut cfg = tokio_postgres::Config::new();
        cfg.user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .dbname(&self.db);
        cfg
    }
}
