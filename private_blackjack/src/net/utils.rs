use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::errors::{CodecError, Result};

/// Maximum allowed frame size (64KiB) to prevent unbounded line buffering.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Frame delimiter.
const DELIMITER: u8 = b'\n';

/// Serialize a value into one newline-terminated JSON frame. JSON escapes
/// newlines inside strings, so the delimiter only ever ends the frame.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<String> {
    let mut frame = serde_json::to_string(value).map_err(CodecError::Encode)?;
    frame.push(DELIMITER as char);
    Ok(frame)
}

/// Deserialize one frame, with or without its trailing delimiter.
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    serde_json::from_slice(frame).map_err(CodecError::Decode)
}

/// Read the next frame. Returns `Ok(None)` on a clean end of stream.
/// Blank lines are skipped. A final frame missing its delimiter is still
/// decoded.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut buf = Vec::new();
        let n = (&mut *reader)
            .take(MAX_FRAME_SIZE as u64 + 1)
            .read_until(DELIMITER, &mut buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&DELIMITER) {
            buf.pop();
        } else if buf.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                max: MAX_FRAME_SIZE,
            });
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return decode_frame(&buf).map(Some);
    }
}

/// Write a frame in a single `write_all` so concurrent readers never see
/// half of it.
pub async fn write_frame<T, W>(writer: &mut W, value: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(value)?;
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
