use std::io::{self, Write};

/// The size of every chunk a [`ChunkedBuffer`] allocates.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// A growable byte buffer made of fixed-size chunks.
///
/// Growing never copies bytes that have already been written, so arbitrarily large documents
/// can be built without repeated reallocation of one contiguous block. Values may straddle chunk
/// boundaries; every accessor handles the split.
#[derive(Clone, Default)]
pub struct ChunkedBuffer {
    chunks: Vec<Vec<u8>>,
    len: usize,
}

/// The position of a 4-byte length prefix that has been reserved but not yet written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthSlot(usize);

impl LengthSlot {
    /// The absolute position of the first byte of the slot.
    pub fn position(self) -> usize {
        self.0
    }
}

impl ChunkedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of chunks currently allocated.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Iterates over the written bytes one chunk at a time.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(Vec::as_slice)
    }

    pub fn push(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Appends `bytes`, spilling into new chunks as each one fills.
    pub fn write_bytes(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.chunks.last().is_none_or(|c| c.len() == CHUNK_SIZE) {
                self.chunks.push(Vec::with_capacity(CHUNK_SIZE));
            }
            let last = self.chunks.len() - 1;
            let chunk = &mut self.chunks[last];
            let n = bytes.len().min(CHUNK_SIZE - chunk.len());
            chunk.extend_from_slice(&bytes[..n]);
            self.len += n;
            bytes = &bytes[n..];
        }
    }

    /// Writes a zeroed 4-byte placeholder and returns its slot for a later
    /// [`ChunkedBuffer::backpatch`].
    pub fn reserve_length(&mut self) -> LengthSlot {
        let slot = LengthSlot(self.len);
        self.write_bytes(&[0; 4]);
        slot
    }

    /// Overwrites a reserved slot with `value` as a little-endian i32.
    pub fn backpatch(&mut self, slot: LengthSlot, value: i32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            let pos = slot.0 + i;
            self.chunks[pos / CHUNK_SIZE][pos % CHUNK_SIZE] = byte;
        }
    }

    /// Returns the byte at `pos`, if it has been written.
    pub fn get(&self, pos: usize) -> Option<u8> {
        if pos >= self.len {
            return None;
        }
        Some(self.chunks[pos / CHUNK_SIZE][pos % CHUNK_SIZE])
    }

    /// Copies the contents into one contiguous vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Writes the contents to `writer` chunk by chunk.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for chunk in &self.chunks {
            writer.write_all(chunk)?;
        }
        Ok(())
    }

    /// Shortens the buffer to `len` bytes, releasing chunks past the end.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let keep = len.div_ceil(CHUNK_SIZE);
        self.chunks.truncate(keep);
        if let Some(last) = self.chunks.last_mut() {
            last.truncate(len - (keep - 1) * CHUNK_SIZE);
        }
        self.len = len;
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }
}

impl std::fmt::Debug for ChunkedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedBuffer")
            .field("len", &self.len)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}
