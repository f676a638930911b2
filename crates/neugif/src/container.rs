//! GIF89a block serialization.
//!
//! A stream produced by this crate is laid out as:
//!
//! ```text
//! Header "GIF89a"
//! Logical Screen Descriptor
//! Global Color Table            (first frame's palette)
//! NETSCAPE2.0 extension         (only when looping)
//! per frame:
//!     Graphic Control Extension
//!     Comment Extension         (optional)
//!     Image Descriptor
//!     Local Color Table         (every frame after the first)
//!     Image Data
//! Trailer 0x3B
//! ```
//!
//! All multi-byte fields are little-endian.

use crate::{bitwriter::MAX_SUB_BLOCK, palette::Palette};

pub const SIGNATURE: &[u8; 6] = b"GIF89a";
pub const TRAILER: u8 = 0x3B;

const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const COMMENT_LABEL: u8 = 0xFE;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const BLOCK_TERMINATOR: u8 = 0x00;

const NETSCAPE_ID: &[u8; 11] = b"NETSCAPE2.0";

/// Color table size field: 2^(7+1) = 256 entries.
const COLOR_TABLE_SIZE_FIELD: u8 = 7;

/// Global table present, 8-bit color resolution, unsorted, 256 entries.
const SCREEN_FLAGS: u8 = 0x80 | 0x70 | COLOR_TABLE_SIZE_FIELD;

/// Local table present, not interlaced, unsorted, 256 entries.
const LOCAL_TABLE_FLAGS: u8 = 0x80 | COLOR_TABLE_SIZE_FIELD;

/// Fields of a Graphic Control Extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphicControl {
    /// Disposal method code (0-7).
    pub disposal: u8,
    /// Delay before the next frame, in hundredths of a second.
    pub delay_cs: u16,
    /// Palette index rendered as transparent.
    pub transparent_index: Option<u8>,
}

impl GraphicControl {
    /// Packed byte: disposal in bits 2-4, transparency flag in bit 0.
    #[inline]
    pub fn packed(&self) -> u8 {
        ((self.disposal & 0x07) << 2) | u8::from(self.transparent_index.is_some())
    }
}

/// Appends GIF blocks to a byte buffer. The writer never rewrites bytes it
/// has already emitted.
#[derive(Debug)]
pub struct ContainerWriter<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> ContainerWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }

    pub fn header(&mut self) {
        self.out.extend_from_slice(SIGNATURE);
    }

    pub fn logical_screen(&mut self, width: u16, height: u16) {
        self.out.extend_from_slice(&width.to_le_bytes());
        self.out.extend_from_slice(&height.to_le_bytes());
        self.out.push(SCREEN_FLAGS);
        self.out.push(0); // background color index
        self.out.push(0); // pixel aspect ratio
    }

    /// Global or local color table; always 256 entries.
    pub fn color_table(&mut self, palette: &Palette) {
        self.out.extend_from_slice(palette.as_bytes());
    }

    /// NETSCAPE2.0 looping extension; `loops == 0` repeats forever.
    pub fn netscape_loop(&mut self, loops: u16) {
        self.out.push(EXTENSION_INTRODUCER);
        self.out.push(APPLICATION_LABEL);
        self.out.push(NETSCAPE_ID.len() as u8);
        self.out.extend_from_slice(NETSCAPE_ID);
        self.out.push(3); // sub-block size
        self.out.push(1); // loop sub-block id
        self.out.extend_from_slice(&loops.to_le_bytes());
        self.out.push(BLOCK_TERMINATOR);
    }

    pub fn graphic_control(&mut self, gce: &GraphicControl) {
        self.out.push(EXTENSION_INTRODUCER);
        self.out.push(GRAPHIC_CONTROL_LABEL);
        self.out.push(4); // block size
        self.out.push(gce.packed());
        self.out.extend_from_slice(&gce.delay_cs.to_le_bytes());
        self.out.push(gce.transparent_index.unwrap_or(0));
        self.out.push(BLOCK_TERMINATOR);
    }

    /// Comment extension, split into sub-blocks of at most 255 bytes.
    pub fn comment(&mut self, text: &[u8]) {
        self.out.push(EXTENSION_INTRODUCER);
        self.out.push(COMMENT_LABEL);
        for chunk in text.chunks(MAX_SUB_BLOCK) {
            self.out.push(chunk.len() as u8);
            self.out.extend_from_slice(chunk);
        }
        self.out.push(BLOCK_TERMINATOR);
    }

    /// Full-screen image descriptor at (0, 0).
    pub fn image_descriptor(&mut self, width: u16, height: u16, local_table: bool) {
        self.out.push(IMAGE_SEPARATOR);
        self.out.extend_from_slice(&0u16.to_le_bytes()); // left
        self.out.extend_from_slice(&0u16.to_le_bytes()); // top
        self.out.extend_from_slice(&width.to_le_bytes());
        self.out.extend_from_slice(&height.to_le_bytes());
        self.out.push(if local_table { LOCAL_TABLE_FLAGS } else { 0 });
    }

    /// Image data: the LZW minimum code size, then the already sub-blocked
    /// and terminated LZW stream.
    pub fn image_data(&mut self, min_code_size: u8, blocks: &[u8]) {
        self.out.push(min_code_size);
        self.out.extend_from_slice(blocks);
    }

    pub fn trailer(&mut self) {
        self.out.push(TRAILER);
    }
}
