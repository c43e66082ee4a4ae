//! Wire framing for file transfers.
//!
//! # Wire format
//!
//! ```text
//! HEADER (Sender -> Receiver):
//!   [4 bytes LE: name_len]
//!   [name_len bytes: filename UTF-8]
//!   [4 bytes LE: file_size]
//!
//! BODY: [file_size bytes: raw file data]
//!
//! END: stream finish marker (no in-band terminator)
//! ```
//!
//! There is no checksum and no version field. Both ends must agree on the
//! little-endian byte order.

use tracing::debug;

use crate::MAX_PREFIXED_STRING_LEN;
use crate::error::ProtocolError;
use crate::stream::TransferStream;

/// Size of an encoded `u32` frame.
pub const U32_FRAME_LEN: usize = 4;

/// Header sent before any body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    /// File name as chosen by the sender (UTF-8).
    pub filename: String,
    /// Exact number of body bytes that follow.
    pub file_size: u32,
}

/// Enqueues `data` once the send buffer has room for all of it.
async fn write_frame<S: TransferStream + ?Sized>(
    stream: &mut S,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let capacity = stream.max_write_buffered_amount();
    if data.len() > capacity {
        return Err(ProtocolError::FrameTooLarge {
            len: data.len(),
            max: capacity,
        });
    }
    stream
        .wait_for_write_buffered_amount_below(capacity - data.len())
        .await?;
    stream.write(data)?;
    Ok(())
}

/// Drains exactly `buf.len()` already-buffered bytes.
fn read_frame<S: TransferStream + ?Sized>(
    stream: &mut S,
    buf: &mut [u8],
) -> Result<(), ProtocolError> {
    let result = stream.read_into(buf)?;
    if result.amount < buf.len() {
        return Err(ProtocolError::Truncated {
            expected: buf.len(),
            received: result.amount,
        });
    }
    Ok(())
}

/// Writes `value` as 4 little-endian bytes.
pub async fn write_u32<S: TransferStream + ?Sized>(
    stream: &mut S,
    value: u32,
) -> Result<(), ProtocolError> {
    write_frame(stream, &value.to_le_bytes()).await
}

/// Reads 4 little-endian bytes as a `u32`.
pub async fn read_u32<S: TransferStream + ?Sized>(stream: &mut S) -> Result<u32, ProtocolError> {
    stream.wait_for_readable(U32_FRAME_LEN).await?;
    let mut buf = [0u8; U32_FRAME_LEN];
    read_frame(stream, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Writes a `u32` length followed by the UTF-8 bytes of `value`.
pub async fn write_prefixed_string<S: TransferStream + ?Sized>(
    stream: &mut S,
    value: &str,
) -> Result<(), ProtocolError> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_PREFIXED_STRING_LEN as usize {
        return Err(ProtocolError::FrameTooLarge {
            len: bytes.len(),
            max: MAX_PREFIXED_STRING_LEN as usize,
        });
    }

    write_u32(stream, bytes.len() as u32).await?;
    write_frame(stream, bytes).await
}

/// Reads a `u32` length followed by that many UTF-8 bytes.
pub async fn read_prefixed_string<S: TransferStream + ?Sized>(
    stream: &mut S,
) -> Result<String, ProtocolError> {
    let len = read_u32(stream).await?;
    if len > MAX_PREFIXED_STRING_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: len as usize,
            max: MAX_PREFIXED_STRING_LEN as usize,
        });
    }

    let len = len as usize;
    stream.wait_for_readable(len).await?;
    let mut buf = vec![0u8; len];
    read_frame(stream, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes the transfer header (filename frame, then size frame).
pub async fn write_header<S: TransferStream + ?Sized>(
    stream: &mut S,
    header: &TransferHeader,
) -> Result<(), ProtocolError> {
    write_prefixed_string(stream, &header.filename).await?;
    write_u32(stream, header.file_size).await?;
    debug!(filename = %header.filename, file_size = header.file_size, "header written");
    Ok(())
}

/// Reads the transfer header written by [`write_header`].
pub async fn read_header<S: TransferStream + ?Sized>(
    stream: &mut S,
) -> Result<TransferHeader, ProtocolError> {
    let filename = read_prefixed_string(stream).await?;
    let file_size = read_u32(stream).await?;
    debug!(filename = %filename, file_size, "header read");
    Ok(TransferHeader {
        filename,
        file_size,
    })
}
