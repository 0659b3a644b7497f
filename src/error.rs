use thiserror::Error;

/// One variant per pipeline stage. Every error is terminal for the run;
/// nothing is retried internally.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("insert error: {0}")]
    Insert(String),
}

impl IngestError {
    /// Pipeline stage the error belongs to, for log messages.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::Config(_) => "config",
            IngestError::Download(_) => "download",
            IngestError::Decode(_) => "decode",
            IngestError::Connection(_) => "connect",
            IngestError::Insert(_) => "insert",
        }
    }

    /// Distinct process exit code per failure kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            IngestError::Config(_) => 1,
            IngestError::Download(_) => 2,
            IngestError::Decode(_) => 3,
            IngestError::Connection(_) => 4,
            IngestError::Insert(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
