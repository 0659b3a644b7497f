use crate::error::IngestError;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Download `url` to `dest`, streaming the body to disk chunk by chunk so the
/// payload is never held in memory whole. Overwrites any existing file at
/// `dest`. Returns the number of bytes written.
///
/// A single attempt only: a bad status, connect failure, or mid-body stream
/// error aborts the run.
pub async fn download(client: &Client, url: &str, dest: &Path) -> Result<u64, IngestError> {
    // Reject malformed URLs before touching the network.
    let url =
        Url::parse(url).map_err(|e| IngestError::Download(format!("invalid url `{url}`: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(IngestError::Download(format!(
            "unsupported url scheme `{}`",
            url.scheme()
        )));
    }

    stream_to_file(client, url.clone(), dest)
        .await
        .map_err(|e| IngestError::Download(format!("{url}: {e:#}")))
}

async fn stream_to_file(client: &Client, url: Url, dest: &Path) -> Result<u64> {
    let resp = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?;

    let file = File::create(dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;
    let mut out = BufWriter::new(file);
    let mut written: u64 = 0;

    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("reading response body")?;
        out.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", dest.display()))?;
        written += chunk.len() as u64;
    }
    out.flush()
        .await
        .with_context(|| format!("flushing {}", dest.display()))?;

    Ok(written)
}
