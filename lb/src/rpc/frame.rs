//! Newline-delimited JSON framing

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::RpcError;

/// Read one frame and decode it
///
/// Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R, T>(reader: &mut R, max_bytes: usize) -> Result<Option<T>, RpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let bytes_read = (&mut *reader).take(max_bytes as u64 + 1).read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    if bytes_read > max_bytes {
        return Err(RpcError::TooLarge(bytes_read));
    }
    if !line.ends_with('\n') {
        return Err(RpcError::Disconnected);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}

/// Encode a value and write it as one frame
pub async fn write_frame<W, T>(writer: &mut W, value: &T, max_bytes: usize) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json = serde_json::to_vec(value)?;
    if json.len() + 1 > max_bytes {
        return Err(RpcError::TooLarge(json.len() + 1));
    }
    json.push(b'\n');
    writer.write_all(&json).await?;
    writer.flush().await?;
    Ok(())
}
