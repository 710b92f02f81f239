//! Streaming a response body into place without exposing partial files.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ArtifactResponse, ClientError};
use crate::mirror::FetchError;
use crate::transport::TransportError;

/// Streams `response` to `scratch`, then renames it to `target`.
///
/// The scratch file is removed on any failure, so `target` either keeps its
/// previous state or holds the complete body. Returns bytes written.
pub(super) async fn stage_and_place(
    response: ArtifactResponse,
    scratch: &Path,
    target: &Path,
    cancel: &CancellationToken,
) -> Result<u64, FetchError> {
    let result = async {
        let written = stream_to_file(response, scratch, cancel).await?;
        fs::rename(scratch, target)
            .await
            .map_err(|e| FetchError::io(target, e))?;
        Ok::<_, FetchError>(written)
    }
    .await;

    if result.is_err() {
        debug!(path = %scratch.display(), "cleaning up staged file after error");
        let _ = fs::remove_file(scratch).await;
    }
    result
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    response: ArtifactResponse,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, FetchError> {
    let file = File::create(path).await.map_err(|e| FetchError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut body = response.body;
    let url = response.url.to_string();
    let mut bytes_written: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(FetchError::client(ClientError::transport(
                    TransportError::cancelled(url.as_str()),
                )));
            }
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        let chunk = chunk.map_err(|e| FetchError::client(ClientError::transport(e)))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer.flush().await.map_err(|e| FetchError::io(path, e))?;

    Ok(bytes_written)
}
