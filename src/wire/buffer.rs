use crate::error::{Error, Result};

/// Default writable window handed out when the caller gives no size hint.
pub const DEFAULT_WINDOW: usize = 4096;

/// Once the consumed prefix grows past this, the live region is copied back
/// to the front of the allocation.
const COMPACT_THRESHOLD: usize = 64 * 1024;

/// Growable contiguous byte region shared by the reader and writer paths.
///
/// Three offsets partition it: `read <= flush <= write`. Bytes between
/// `write` and the end of the region are an uncommitted scratch window;
/// bytes in `[flush, write)` are written but not yet visible to readers;
/// bytes in `[read, flush)` are readable. The region compacts instead of
/// wrapping, so readable bytes are always one contiguous slice.
#[derive(Debug)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    read: usize,
    flush: usize,
    write: usize,
    limit: usize,
}

impl ByteBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            read: 0,
            flush: 0,
            write: 0,
            limit,
        }
    }

    /// Bytes currently visible to the reader.
    pub fn readable(&self) -> usize {
        self.flush - self.read
    }

    /// Bytes written but not yet flushed.
    pub fn unflushed(&self) -> usize {
        self.write - self.flush
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Hands out a writable window of at least `hint` bytes (a default-sized
    /// one when `hint` is zero). Growing past the configured limit is an
    /// internal error: the peer is declaring sizes we refuse to buffer.
    pub fn get_memory(&mut self, hint: usize) -> Result<&mut [u8]> {
        let window = if hint == 0 { DEFAULT_WINDOW } else { hint };
        if self.buf.len() - self.write < window {
            self.reserve(window)?;
        }
        Ok(&mut self.buf[self.write..])
    }

    fn reserve(&mut self, window: usize) -> Result<()> {
        // Reclaim the consumed prefix before allocating more.
        if self.read > 0 {
            self.compact();
        }
        if self.buf.len() - self.write >= window {
            return Ok(());
        }
        let needed = self.write + window;
        if needed > self.limit {
            return Err(Error::Internal(format!(
                "byte buffer limit exceeded: need {needed}, cap {}",
                self.limit
            )));
        }
        let mut new_len = self.buf.len().max(DEFAULT_WINDOW).min(self.limit);
        while new_len < needed {
            new_len = (new_len * 2).min(self.limit);
        }
        self.buf.resize(new_len, 0);
        Ok(())
    }

    /// Commits `n` bytes of the window returned by [`get_memory`].
    ///
    /// [`get_memory`]: ByteBuffer::get_memory
    pub fn confirm_write(&mut self, n: usize) {
        assert!(
            self.write + n <= self.buf.len(),
            "confirm_write past the handed-out window"
        );
        self.write += n;
    }

    /// Makes everything written so far visible to the reader.
    pub fn flush(&mut self) {
        self.flush = self.write;
    }

    /// Drops unflushed bytes. Called when an encoder fails mid-write so a
    /// half-serialized message never reaches the wire.
    pub fn discard(&mut self) {
        self.write = self.flush;
    }

    /// The readable region `[read, flush)`.
    pub fn read_view(&self) -> &[u8] {
        &self.buf[self.read..self.flush]
    }

    /// Consumes `n` readable bytes.
    pub fn confirm_read(&mut self, n: usize) {
        assert!(self.read + n <= self.flush, "confirm_read past flushed bytes");
        self.read += n;
        if self.read == self.write {
            self.read = 0;
            self.flush = 0;
            self.write = 0;
        } else if self.read >= COMPACT_THRESHOLD {
            self.compact();
        }
    }

    fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        self.buf.copy_within(self.read..self.write, 0);
        self.write -= self.read;
        self.flush -= self.read;
        self.read = 0;
    }
}
