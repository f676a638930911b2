//! LSB-first bit packing into GIF data sub-blocks.
//!
//! GIF image data is a sequence of sub-blocks, each a length byte (1-255)
//! followed by that many bytes, closed by a zero-length block. Codes are
//! packed starting at the least significant bit of each byte.

/// Largest payload of a single data sub-block.
pub const MAX_SUB_BLOCK: usize = 255;

/// Accumulates variable-width codes and emits them as GIF sub-blocks.
#[derive(Debug)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    fill: u32,
    block: [u8; MAX_SUB_BLOCK],
    block_len: usize,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            fill: 0,
            block: [0; MAX_SUB_BLOCK],
            block_len: 0,
        }
    }

    /// Append the low `width` bits of `code` (`width` <= 16).
    #[inline]
    pub fn write_bits(&mut self, code: u16, width: u8) {
        debug_assert!(width <= 16);
        let mask = (1u32 << width) - 1;
        self.acc |= (code as u32 & mask) << self.fill;
        self.fill += width as u32;

        while self.fill >= 8 {
            self.push_byte(self.acc as u8);
            self.acc >>= 8;
            self.fill -= 8;
        }
    }

    /// Number of bits waiting for a full byte.
    #[inline]
    pub fn pending_bits(&self) -> u32 {
        self.fill
    }

    /// Pad any partial byte with zero bits and emit it.
    pub fn align(&mut self) {
        if self.fill > 0 {
            self.push_byte(self.acc as u8);
            self.acc = 0;
            self.fill = 0;
        }
    }

    /// Flush everything and close the stream with a zero-length block.
    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.flush_block();
        self.out.push(0);
        self.out
    }

    #[inline]
    fn push_byte(&mut self, byte: u8) {
        self.block[self.block_len] = byte;
        self.block_len += 1;
        if self.block_len == MAX_SUB_BLOCK {
            self.flush_block();
        }
    }

    fn flush_block(&mut self) {
        if self.block_len > 0 {
            self.out.push(self.block_len as u8);
            self.out.extend_from_slice(&self.block[..self.block_len]);
            self.block_len = 0;
        }
    }
}

/// Concatenate the payloads of a sub-block sequence, stopping at the
/// zero-length terminator. Returns `None` if a block runs past the end.
pub fn unblock(data: &[u8]) -> Option<Vec<u8>> {
    let mut payload = Vec::with_capacity(data.len());
    let mut pos = 0;
    loop {
        let len = *data.get(pos)? as usize;
        pos += 1;
        if len == 0 {
            return Some(payload);
        }
        payload.extend_from_slice(data.get(pos..pos + len)?);
        pos += len;
    }
}
