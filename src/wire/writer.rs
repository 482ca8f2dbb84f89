use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::compress::frame::{write_frame, CompressionMethod};
use crate::error::{Error, Result};
use crate::wire::buffer::ByteBuffer;
use crate::wire::with_deadline;

/// Encoding size of the longest varint (64 payload bits, 7 per byte).
pub const MAX_VARINT_LEN: usize = 10;

struct Staging {
    method: CompressionMethod,
    block_size: usize,
    buf: Vec<u8>,
}

/// Little-endian primitive encoder over a buffered byte sink.
///
/// While a compression stage is open, primitives accumulate in a staging
/// buffer that is cut into checksummed LZ4 frames; otherwise they land in
/// the outgoing buffer directly. Nothing reaches the socket until
/// [`flush`](ProtocolWriter::flush).
pub struct ProtocolWriter<S> {
    sink: S,
    out: ByteBuffer,
    staging: Option<Staging>,
    deadline: Option<Duration>,
}

impl<S: AsyncWrite + Unpin> ProtocolWriter<S> {
    pub fn new(sink: S, buffer_limit: usize, deadline: Option<Duration>) -> Self {
        Self {
            sink,
            out: ByteBuffer::new(buffer_limit),
            staging: None,
            deadline,
        }
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// ClickHouse varint: 7 low bits per byte, high bit set while more
    /// groups follow.
    pub fn write_varint(&mut self, mut v: u64) -> Result<()> {
        let mut encoded = [0u8; MAX_VARINT_LEN];
        let mut n = 0;
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                encoded[n] = byte;
                n += 1;
                break;
            }
            encoded[n] = byte | 0x80;
            n += 1;
        }
        self.write_bytes(&encoded[..n])
    }

    /// Varint byte length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_varint(s.len() as u64)?;
        self.write_bytes(s.as_bytes())
    }

    pub fn write_str_bytes(&mut self, s: &[u8]) -> Result<()> {
        self.write_varint(s.len() as u64)?;
        self.write_bytes(s)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.staging {
            Some(staging) => {
                staging.buf.extend_from_slice(bytes);
                self.spill_staging()
            }
            None => {
                let window = self.out.get_memory(bytes.len())?;
                window[..bytes.len()].copy_from_slice(bytes);
                self.out.confirm_write(bytes.len());
                Ok(())
            }
        }
    }

    /// Hands a writable window of at least `hint` bytes to a codec callback
    /// and commits however many bytes it reports. A callback making zero
    /// progress gets the window doubled and is retried; a failing callback
    /// leaves no trace in the buffer.
    pub fn write_raw<F>(&mut self, hint: usize, mut f: F) -> Result<usize>
    where
        F: FnMut(&mut [u8]) -> Result<usize>,
    {
        let mut window = hint.max(1);
        loop {
            let written = match &mut self.staging {
                Some(staging) => {
                    let start = staging.buf.len();
                    staging.buf.resize(start + window, 0);
                    match f(&mut staging.buf[start..]) {
                        Ok(n) => {
                            staging.buf.truncate(start + n);
                            n
                        }
                        Err(e) => {
                            staging.buf.truncate(start);
                            return Err(e);
                        }
                    }
                }
                None => {
                    let slice = self.out.get_memory(window)?;
                    let n = f(slice)?;
                    self.out.confirm_write(n);
                    n
                }
            };
            if written > 0 {
                if self.staging.is_some() {
                    self.spill_staging()?;
                }
                return Ok(written);
            }
            window *= 2;
        }
    }

    /// Routes subsequent primitive writes through the LZ4 staging buffer.
    pub fn begin_compress(&mut self, method: CompressionMethod, block_size: usize) -> Result<()> {
        if self.staging.is_some() {
            return Err(Error::Internal("compression stage already open".into()));
        }
        self.staging = Some(Staging {
            method,
            block_size,
            buf: Vec::new(),
        });
        Ok(())
    }

    /// Cuts the final (possibly partial) frame and returns to raw writes.
    pub fn end_compress(&mut self) -> Result<()> {
        let staging = self
            .staging
            .take()
            .ok_or_else(|| Error::Internal("no compression stage to close".into()))?;
        if !staging.buf.is_empty() {
            write_frame(&mut self.out, staging.method, &staging.buf)?;
        }
        Ok(())
    }

    fn spill_staging(&mut self) -> Result<()> {
        let Some(staging) = self.staging.as_mut() else {
            return Ok(());
        };
        while staging.buf.len() >= staging.block_size {
            let method = staging.method;
            let block: Vec<u8> = staging.buf.drain(..staging.block_size).collect();
            write_frame(&mut self.out, method, &block)?;
        }
        Ok(())
    }

    /// Drops everything written since the last flush. Used when a message
    /// encoder fails partway so the peer never sees a torn message.
    pub fn abort_pending(&mut self) {
        self.staging = None;
        self.out.discard();
    }

    /// Drains all buffered bytes to the sink and flushes it.
    pub async fn flush(&mut self) -> Result<()> {
        if self.staging.is_some() {
            return Err(Error::Internal(
                "flush while a compression stage is active".into(),
            ));
        }
        self.out.flush();
        while self.out.readable() > 0 {
            let view = self.out.read_view();
            let n = with_deadline(self.deadline, self.sink.write(view)).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "socket closed while flushing",
                )));
            }
            self.out.confirm_read(n);
        }
        with_deadline(self.deadline, self.sink.flush()).await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        with_deadline(self.deadline, self.sink.shutdown()).await
    }

    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
