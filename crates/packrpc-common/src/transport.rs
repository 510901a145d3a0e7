//! Length-prefixed framing shared by the TCP endpoints.
//!
//! Wire format: `[4-byte length as u32 big-endian] + [data]`. One frame
//! carries exactly one request or one response; the adapter's wire bytes are
//! the frame payload.

use std::io::{self, Read, Write};

/// Frames larger than this are refused on both read and write, bounding the
/// allocation a single message can force.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Writes one length-prefixed frame and flushes the writer.
pub fn write_frame<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "frame too large: {} bytes (max {} bytes)",
                data.len(),
                MAX_FRAME_SIZE
            ),
        ));
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(data)?;
    writer.flush()
}

/// Reads one length-prefixed frame.
///
/// Propagates `UnexpectedEof` when the peer closes between frames, which
/// session loops treat as a normal hangup.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE} bytes)"),
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
