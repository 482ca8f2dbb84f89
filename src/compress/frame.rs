//! ClickHouse compressed-frame envelope.
//!
//! Layout on the wire: 16-byte CityHash-128 checksum, then a 9-byte header
//! (1-byte algorithm tag, 4-byte LE compressed size including the header,
//! 4-byte LE uncompressed size), then the payload. The checksum covers the
//! header and the payload. Frame boundaries are independent of message
//! boundaries in both directions.

use crate::compress::cityhash::hash128;
use crate::error::{Error, Result};
use crate::wire::buffer::ByteBuffer;

pub const CHECKSUM_LEN: usize = 16;
pub const HEADER_LEN: usize = 9;

/// Upper bound accepted for either size field; a corrupt header otherwise
/// asks us to allocate gigabytes before the checksum can catch it.
const MAX_FRAME_SIZE: usize = 1 << 30;

/// Default amount of raw bytes accumulated before a frame is cut.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Lz4,
}

impl CompressionMethod {
    pub fn byte(self) -> u8 {
        match self {
            CompressionMethod::None => 0x02,
            CompressionMethod::Lz4 => 0x82,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x02 => Ok(CompressionMethod::None),
            0x82 => Ok(CompressionMethod::Lz4),
            other => Err(Error::Compression(format!(
                "unknown compression algorithm tag 0x{other:02x}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub method: CompressionMethod,
    /// Size of header plus compressed payload.
    pub compressed: usize,
    pub uncompressed: usize,
}

/// Parses the 9 bytes that follow the checksum. Needs the whole header
/// present; the caller ensures that.
pub fn parse_header(bytes: &[u8]) -> Result<FrameHeader> {
    let method = CompressionMethod::from_byte(bytes[0])?;
    let compressed = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
    let uncompressed = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
    if compressed < HEADER_LEN || compressed > MAX_FRAME_SIZE || uncompressed > MAX_FRAME_SIZE {
        return Err(Error::Compression(format!(
            "implausible frame sizes: compressed {compressed}, uncompressed {uncompressed}"
        )));
    }
    Ok(FrameHeader {
        method,
        compressed,
        uncompressed,
    })
}

/// Verifies and decompresses one complete frame: `frame` spans the 16-byte
/// checksum through the end of the payload.
pub fn decode_frame(frame: &[u8], header: FrameHeader) -> Result<Vec<u8>> {
    let expected_lo = u64::from_le_bytes(frame[0..8].try_into().unwrap());
    let expected_hi = u64::from_le_bytes(frame[8..16].try_into().unwrap());
    let (actual_lo, actual_hi) = hash128(&frame[CHECKSUM_LEN..]);
    if (expected_lo, expected_hi) != (actual_lo, actual_hi) {
        return Err(Error::ChecksumMismatch {
            expected_lo,
            expected_hi,
            actual_lo,
            actual_hi,
        });
    }

    let body = &frame[CHECKSUM_LEN + HEADER_LEN..];
    match header.method {
        CompressionMethod::Lz4 => lz4_flex::decompress(body, header.uncompressed)
            .map_err(|e| Error::Compression(format!("lz4 decode: {e}"))),
        CompressionMethod::None => {
            if body.len() != header.uncompressed {
                return Err(Error::Compression(format!(
                    "uncompressed frame length {} does not match declared {}",
                    body.len(),
                    header.uncompressed
                )));
            }
            Ok(body.to_vec())
        }
    }
}

/// Compresses `payload` and appends a complete frame to `out`.
pub fn write_frame(out: &mut ByteBuffer, method: CompressionMethod, payload: &[u8]) -> Result<()> {
    let body = match method {
        CompressionMethod::Lz4 => lz4_flex::compress(payload),
        CompressionMethod::None => payload.to_vec(),
    };
    let compressed = HEADER_LEN + body.len();
    if compressed > MAX_FRAME_SIZE || payload.len() > MAX_FRAME_SIZE {
        return Err(Error::Compression(format!(
            "frame of {} bytes exceeds the wire limit",
            payload.len()
        )));
    }

    let total = CHECKSUM_LEN + compressed;
    let window = out.get_memory(total)?;
    window[CHECKSUM_LEN] = method.byte();
    window[CHECKSUM_LEN + 1..CHECKSUM_LEN + 5].copy_from_slice(&(compressed as u32).to_le_bytes());
    window[CHECKSUM_LEN + 5..CHECKSUM_LEN + 9]
        .copy_from_slice(&(payload.len() as u32).to_le_bytes());
    window[CHECKSUM_LEN + HEADER_LEN..total].copy_from_slice(&body);

    let (lo, hi) = hash128(&window[CHECKSUM_LEN..total]);
    window[0..8].copy_from_slice(&lo.to_le_bytes());
    window[8..16].copy_from_slice(&hi.to_le_bytes());

    out.confirm_write(total);
    Ok(())
}
