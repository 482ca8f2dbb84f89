use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::compress::frame::{decode_frame, parse_header, CHECKSUM_LEN, HEADER_LEN};
use crate::error::{Error, Result};
use crate::wire::buffer::ByteBuffer;
use crate::wire::with_deadline;
use crate::wire::writer::MAX_VARINT_LEN;

const READ_CHUNK: usize = 8192;

/// Little-endian primitive decoder over a refillable byte source.
///
/// Socket reads and compression frames never align with message boundaries,
/// so every primitive ensures its bytes are buffered before parsing. While
/// the decompression stage is active, primitives drain a second buffer that
/// is refilled one verified frame at a time; leftover decompressed bytes
/// survive the stage being toggled, since one frame may span messages.
pub struct ProtocolReader<S> {
    source: S,
    raw: ByteBuffer,
    decompressed: ByteBuffer,
    compressed_mode: bool,
    deadline: Option<Duration>,
}

impl<S: AsyncRead + Unpin> ProtocolReader<S> {
    pub fn new(source: S, buffer_limit: usize, deadline: Option<Duration>) -> Self {
        Self {
            source,
            raw: ByteBuffer::new(buffer_limit),
            decompressed: ByteBuffer::new(buffer_limit),
            compressed_mode: false,
            deadline,
        }
    }

    /// Subsequent primitive reads come from verified, decompressed frames.
    pub fn begin_decompress(&mut self) {
        self.compressed_mode = true;
    }

    pub fn end_decompress(&mut self) {
        self.compressed_mode = false;
    }

    /// True when no buffered bytes are pending in either stage.
    pub fn is_drained(&self) -> bool {
        self.raw.is_empty() && self.decompressed.is_empty()
    }

    async fn fill_raw(&mut self, min: usize) -> Result<()> {
        while self.raw.readable() < min {
            let missing = min - self.raw.readable();
            let window = self.raw.get_memory(missing.max(READ_CHUNK))?;
            let n = with_deadline(self.deadline, self.source.read(window)).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            self.raw.confirm_write(n);
            self.raw.flush();
        }
        Ok(())
    }

    /// Reads one compressed frame from the raw stream and appends its
    /// decompressed payload to the staging buffer.
    async fn refill_decompressed(&mut self) -> Result<()> {
        self.fill_raw(CHECKSUM_LEN + HEADER_LEN).await?;
        let header = {
            let view = self.raw.read_view();
            parse_header(&view[CHECKSUM_LEN..CHECKSUM_LEN + HEADER_LEN])?
        };
        let total = CHECKSUM_LEN + header.compressed;
        self.fill_raw(total).await?;

        let payload = decode_frame(&self.raw.read_view()[..total], header)?;
        self.raw.confirm_read(total);

        let window = self.decompressed.get_memory(payload.len())?;
        window[..payload.len()].copy_from_slice(&payload);
        self.decompressed.confirm_write(payload.len());
        self.decompressed.flush();
        Ok(())
    }

    async fn ensure(&mut self, min: usize) -> Result<()> {
        if self.compressed_mode {
            while self.decompressed.readable() < min {
                self.refill_decompressed().await?;
            }
            return Ok(());
        }
        // Leftovers from a closed decompression stage are served first; a
        // primitive straddling the stage boundary is a protocol violation.
        let pending = self.decompressed.readable();
        if pending > 0 {
            if pending < min {
                return Err(Error::UnexpectedResponse(
                    "message split across a compression stage boundary".into(),
                ));
            }
            return Ok(());
        }
        self.fill_raw(min).await
    }

    fn active(&mut self) -> &mut ByteBuffer {
        if self.compressed_mode || self.decompressed.readable() > 0 {
            &mut self.decompressed
        } else {
            &mut self.raw
        }
    }

    pub async fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1).await?;
        let buf = self.active();
        let v = buf.read_view()[0];
        buf.confirm_read(1);
        Ok(v)
    }

    pub async fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8().await? != 0)
    }

    pub async fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes).await?;
        Ok(i32::from_le_bytes(bytes))
    }

    pub async fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_exact(&mut bytes).await?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub async fn read_exact(&mut self, dest: &mut [u8]) -> Result<()> {
        self.ensure(dest.len()).await?;
        let buf = self.active();
        dest.copy_from_slice(&buf.read_view()[..dest.len()]);
        buf.confirm_read(dest.len());
        Ok(())
    }

    pub async fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure(len).await?;
        let buf = self.active();
        let out = buf.read_view()[..len].to_vec();
        buf.confirm_read(len);
        Ok(out)
    }

    /// Discards `len` bytes.
    pub async fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len).await?;
        let buf = self.active();
        buf.confirm_read(len);
        Ok(())
    }

    pub async fn read_varint(&mut self) -> Result<u64> {
        let mut have = 1;
        loop {
            self.ensure(have).await?;
            let buf = self.active();
            let view = buf.read_view();
            // The terminator may already be buffered; scan what is there.
            let avail = view.len().min(MAX_VARINT_LEN);
            if let Some(pos) = view[..avail].iter().position(|b| b & 0x80 == 0) {
                let mut value = 0u64;
                for (i, byte) in view[..=pos].iter().enumerate() {
                    value |= u64::from(byte & 0x7f) << (7 * i);
                }
                buf.confirm_read(pos + 1);
                return Ok(value);
            }
            if avail >= MAX_VARINT_LEN {
                return Err(Error::UnexpectedResponse(
                    "varint longer than 10 bytes".into(),
                ));
            }
            have = view.len() + 1;
        }
    }

    /// Varint byte length followed by UTF-8 bytes.
    pub async fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_str_bytes().await?;
        String::from_utf8(bytes)
            .map_err(|_| Error::UnexpectedResponse("invalid utf-8 in wire string".into()))
    }

    pub async fn read_str_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint().await? as usize;
        self.read_vec(len).await
    }
}
