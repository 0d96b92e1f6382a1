//! Newline-delimited JSON framing

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::{KvError, KvResult};

/// Serialize `value` and write it as one line
pub async fn write_frame<S, T>(stream: &mut S, value: &T, limit: usize, endpoint: &str) -> KvResult<()>
where
    S: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(value)?;
    if json.len() > limit {
        return Err(KvError::MessageTooLarge {
            size: json.len(),
            limit,
        });
    }

    stream
        .write_all(json.as_bytes())
        .await
        .map_err(|e| KvError::io(endpoint, e))?;
    stream.write_all(b"\n").await.map_err(|e| KvError::io(endpoint, e))?;
    stream.flush().await.map_err(|e| KvError::io(endpoint, e))?;
    Ok(())
}

/// Read one line and parse it, refusing payloads longer than `limit`
///
/// `limit` excludes the trailing newline, matching [`write_frame`].
pub async fn read_frame<S, T>(stream: &mut S, limit: usize, endpoint: &str) -> KvResult<T>
where
    S: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    // Payload plus newline, and one byte more to detect overflow
    let mut reader = BufReader::new((&mut *stream).take(limit as u64 + 2));
    let mut line = String::new();

    let bytes_read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| KvError::io(endpoint, e))?;

    let size = line.trim_end_matches('\n').len();
    if size > limit {
        return Err(KvError::MessageTooLarge { size, limit });
    }

    if line.trim().is_empty() {
        return Err(KvError::EmptyMessage);
    }

    debug!(%endpoint, bytes_read, "read_frame: received line");
    Ok(serde_json::from_str(line.trim())?)
}
