//! # neugif
//!
//! A 100% Rust animated GIF encoder.
//!
//! ## Features
//!
//! - **Quantizer**: NeuQuant self-organizing-map color quantization, 256 colors per frame
//! - **Compressor**: GIF-flavoured variable-width LZW with 255-byte sub-blocks
//! - **Container**: byte-exact GIF89a writer (global/local color tables, looping, comments)
//!
//! ## Quick Start
//!
//! ```rust
//! use neugif::GifEncoder;
//!
//! let (width, height) = (4, 4);
//! let red = [255u8, 0, 0, 255].repeat(width * height);
//! let blue = [0u8, 0, 255, 255].repeat(width * height);
//!
//! let mut encoder = GifEncoder::new();
//! encoder.configure(width as u32, height as u32)?;
//! encoder.set_frame_rate(10.0)?;
//! encoder.set_repeat(0)?;
//!
//! encoder.start();
//! encoder.add_frame(&red)?;
//! encoder.add_frame(&blue)?;
//! encoder.finish();
//!
//! let gif = encoder.into_bytes();
//! assert!(gif.starts_with(b"GIF89a"));
//! assert_eq!(gif.last(), Some(&0x3B));
//! # Ok::<(), neugif::GifError>(())
//! ```
//!
//! Every frame gets its own palette: the first frame's palette becomes the
//! global color table and every later frame carries a local color table.

use thiserror::Error;

pub mod bitwriter;
pub mod container;
pub mod encoder;
pub mod lzw;
pub mod neuquant;
pub mod palette;
pub mod sampler;

pub use encoder::{DisposalMethod, EncoderSettings, EncoderState, GifEncoder, Repeat};
pub use lzw::LzwEncoder;
pub use neuquant::NeuQuant;
pub use palette::Palette;
pub use sampler::{FramePixels, IndexedFrame, PixelLayout};

/// Errors that can occur while encoding a GIF.
#[derive(Debug, Error)]
pub enum GifError {
    /// Invalid dimensions (zero, or too large for the 16-bit GIF fields)
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A setting was out of range or changed after the session was locked
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Frame buffer length disagrees with the locked width x height
    #[error("dimension mismatch: expected {expected} bytes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Frame buffer is not a whole number of pixels for its layout
    #[error("invalid input: {len} bytes is not a whole number of {bytes_per_pixel}-byte pixels")]
    InvalidInputType { len: usize, bytes_per_pixel: usize },

    /// The color quantizer could not be built from the training buffer
    #[error("quantizer init error: {0}")]
    QuantizerInit(String),

    /// The LZW compressor could not be built
    #[error("compressor init error: invalid minimum code size {0}")]
    CompressorInit(u8),

    /// A pixel index does not fit the compressor's code size
    #[error("pixel index {index} out of range for {max} colors")]
    IndexOutOfRange { index: u8, max: usize },

    /// `add_frame` was called before `start`
    #[error("encoder not started")]
    NotStarted,

    /// `add_frame` was called after `finish`
    #[error("encoder already finished")]
    AlreadyFinished,
}

/// Result type for GIF encoding operations.
pub type Result<T> = core::result::Result<T, GifError>;

/// Number of palette entries produced per frame.
pub const PALETTE_SIZE: usize = 256;

/// Largest width or height a GIF logical screen can describe.
pub(crate) const GIF_DIMENSION_LIMIT: u32 = u16::MAX as u32;
