//! GIF variable-code-width LZW compression.
//!
//! The dictionary maps `(prefix code, next index)` pairs to codes through an
//! open-addressed hash table (5003 slots, ~80% load at 4096 codes) with a
//! relatively prime secondary probe. The stream opens with a Clear code;
//! when all 4096 codes are taken another Clear is emitted and the table
//! starts over at the initial code width.

use tracing::trace;

use crate::{bitwriter::BitWriter, GifError, Result};

const MAX_BITS: u8 = 12;
const MAX_MAX_CODE: u16 = 1 << MAX_BITS;
const HSIZE: usize = 5003;
// Shift that spreads the 8-bit pixel over the 12-bit prefix code for the
// primary probe; derived from HSIZE.
const HASH_SHIFT: u32 = 4;

/// Stateful LZW compressor. One instance can encode any number of frames;
/// each [`encode`](Self::encode) call starts from an empty dictionary.
pub struct LzwEncoder {
    min_code_size: u8,
    htab: Vec<i32>,
    codetab: Vec<u16>,

    n_bits: u8,
    max_code: u16,
    free_ent: u16,
    clear_flag: bool,
}

impl LzwEncoder {
    /// Create a compressor for indices below `1 << min_code_size`.
    ///
    /// # Errors
    ///
    /// [`GifError::CompressorInit`] unless `min_code_size` is in `2..=8`.
    pub fn new(min_code_size: u8) -> Result<Self> {
        if !(2..=8).contains(&min_code_size) {
            return Err(GifError::CompressorInit(min_code_size));
        }
        Ok(Self {
            min_code_size,
            htab: vec![-1; HSIZE],
            codetab: vec![0; HSIZE],
            n_bits: min_code_size + 1,
            max_code: max_code(min_code_size + 1),
            free_ent: 0,
            clear_flag: false,
        })
    }

    #[inline]
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    #[inline]
    fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    #[inline]
    fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// Compress `indices` into GIF data sub-blocks, terminator included.
    ///
    /// The minimum code size byte that precedes image data in a GIF is not
    /// part of the output.
    ///
    /// # Errors
    ///
    /// [`GifError::IndexOutOfRange`] if an index does not fit the code size.
    pub fn encode(&mut self, indices: &[u8]) -> Result<Vec<u8>> {
        let clear_code = self.clear_code();
        if let Some(&index) = indices.iter().find(|&&i| i as u16 >= clear_code) {
            return Err(GifError::IndexOutOfRange {
                index,
                max: clear_code as usize,
            });
        }

        self.n_bits = self.min_code_size + 1;
        self.max_code = max_code(self.n_bits);
        self.free_ent = clear_code + 2;
        self.clear_flag = false;
        self.htab.fill(-1);

        let mut w = BitWriter::new();
        self.output(&mut w, clear_code);

        let mut pixels = indices.iter().copied();
        let Some(first) = pixels.next() else {
            self.output(&mut w, self.end_code());
            return Ok(w.finish());
        };
        let mut ent = first as u16;

        'pixels: for c in pixels {
            let fcode = ((c as i32) << MAX_BITS) + ent as i32;
            let mut i = ((c as usize) << HASH_SHIFT) ^ ent as usize;

            if self.htab[i] == fcode {
                ent = self.codetab[i];
                continue;
            }

            if self.htab[i] >= 0 {
                let disp = if i == 0 { 1 } else { HSIZE - i };
                loop {
                    i = if i >= disp { i - disp } else { i + HSIZE - disp };
                    if self.htab[i] == fcode {
                        ent = self.codetab[i];
                        continue 'pixels;
                    }
                    if self.htab[i] < 0 {
                        break;
                    }
                }
            }

            self.output(&mut w, ent);
            ent = c as u16;

            if self.free_ent < MAX_MAX_CODE {
                self.codetab[i] = self.free_ent;
                self.free_ent += 1;
                self.htab[i] = fcode;
            } else {
                self.clear_table(&mut w);
            }
        }

        self.output(&mut w, ent);
        self.output(&mut w, self.end_code());

        let out = w.finish();
        trace!(pixels = indices.len(), bytes = out.len(), "lzw encoded");
        Ok(out)
    }

    fn clear_table(&mut self, w: &mut BitWriter) {
        self.htab.fill(-1);
        self.free_ent = self.clear_code() + 2;
        self.clear_flag = true;
        self.output(w, self.clear_code());
    }

    /// Write `code` at the current width, then widen (or reset after a
    /// Clear) for the next one.
    fn output(&mut self, w: &mut BitWriter, code: u16) {
        w.write_bits(code, self.n_bits);

        if self.clear_flag {
            self.n_bits = self.min_code_size + 1;
            self.max_code = max_code(self.n_bits);
            self.clear_flag = false;
        } else if self.free_ent > self.max_code {
            self.n_bits += 1;
            self.max_code = if self.n_bits == MAX_BITS {
                MAX_MAX_CODE
            } else {
                max_code(self.n_bits)
            };
        }
    }
}

impl std::fmt::Debug for LzwEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzwEncoder")
            .field("min_code_size", &self.min_code_size)
            .finish_non_exhaustive()
    }
}

#[inline]
fn max_code(n_bits: u8) -> u16 {
    (1 << n_bits) - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwriter::unblock;

    fn decode(min_code_size: u8, blocks: &[u8]) -> Vec<u8> {
        let payload = unblock(blocks).expect("well-formed sub-blocks");
        weezl::decode::Decoder::new(weezl::BitOrder::Lsb, min_code_size)
            .decode(&payload)
            .expect("valid LZW stream")
    }

    fn noise(len: usize, mut seed: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn test_invalid_code_size() {
        assert!(matches!(LzwEncoder::new(1), Err(GifError::CompressorInit(1))));
        assert!(matches!(LzwEncoder::new(9), Err(GifError::CompressorInit(9))));
        assert!(LzwEncoder::new(2).is_ok());
    }

    #[test]
    fn test_known_small_stream() {
        // Clear(4) 0 6 0 End(5): widths 3, 3, 3, 3, 4
        let out = LzwEncoder::new(2).unwrap().encode(&[0, 0, 0, 0]).unwrap();
        assert_eq!(out, vec![2, 0x84, 0x51, 0]);
    }

    #[test]
    fn test_empty_input() {
        let out = LzwEncoder::new(8).unwrap().encode(&[]).unwrap();
        assert_eq!(out, vec![3, 0x00, 0x03, 0x02, 0]);
        assert!(decode(8, &out).is_empty());
    }

    #[test]
    fn test_index_out_of_range() {
        let err = LzwEncoder::new(2).unwrap().encode(&[0, 1, 4]).unwrap_err();
        assert!(matches!(err, GifError::IndexOutOfRange { index: 4, max: 4 }));
    }

    #[test]
    fn test_roundtrip_single_pixel() {
        let out = LzwEncoder::new(8).unwrap().encode(&[200]).unwrap();
        assert_eq!(decode(8, &out), vec![200]);
    }

    #[test]
    fn test_roundtrip_runs() {
        let mut data = vec![7u8; 10_000];
        data.extend(std::iter::repeat(3).take(5_000));
        let out = LzwEncoder::new(8).unwrap().encode(&data).unwrap();
        assert!(out.len() < data.len() / 10);
        assert_eq!(decode(8, &out), data);
    }

    #[test]
    fn test_roundtrip_noise_forces_table_reset() {
        // Far more than 4096 distinct strings, so the table fills repeatedly.
        let data = noise(100_000, 0x9e37_79b9);
        let out = LzwEncoder::new(8).unwrap().encode(&data).unwrap();
        assert_eq!(decode(8, &out), data);
    }

    #[test]
    fn test_roundtrip_small_code_size() {
        let data: Vec<u8> = noise(20_000, 42).into_iter().map(|b| b & 0x03).collect();
        let out = LzwEncoder::new(2).unwrap().encode(&data).unwrap();
        assert_eq!(decode(2, &out), data);
    }

    #[test]
    fn test_encoder_is_reusable() {
        let mut enc = LzwEncoder::new(8).unwrap();
        let a = noise(5_000, 1);
        let first = enc.encode(&a).unwrap();
        let _ = enc.encode(&noise(5_000, 2)).unwrap();
        assert_eq!(enc.encode(&a).unwrap(), first);
    }
}
