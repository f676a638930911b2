//! Frame sampling and indexing.
//!
//! A frame arrives either as RGBA (straight from a canvas or image decoder)
//! or as an already sampled RGB buffer. [`FramePixels`] validates the buffer
//! against the session geometry, hands the quantizer a dense RGB stream and
//! later walks the same buffer again to produce one palette index per pixel.

use std::borrow::Cow;

use crate::{neuquant::NeuQuant, GifError, Result, PALETTE_SIZE};

/// Channel layout of a raw frame buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelLayout {
    /// 4 bytes per pixel: R, G, B, A. Alpha is ignored.
    #[default]
    Rgba,
    /// 3 bytes per pixel: R, G, B. Used for pre-sampled image data.
    Rgb,
}

impl PixelLayout {
    /// Bytes occupied by one pixel.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgba => 4,
            PixelLayout::Rgb => 3,
        }
    }
}

/// A frame buffer validated against the session's width and height.
#[derive(Clone, Copy, Debug)]
pub struct FramePixels<'a> {
    data: &'a [u8],
    layout: PixelLayout,
}

impl<'a> FramePixels<'a> {
    /// Validate `data` as a `width` x `height` frame in `layout`.
    ///
    /// # Errors
    ///
    /// * [`GifError::InvalidInputType`] if the length is not a whole number of pixels
    /// * [`GifError::DimensionMismatch`] if the pixel count differs from `width * height`
    pub fn new(data: &'a [u8], layout: PixelLayout, width: usize, height: usize) -> Result<Self> {
        let bytes_per_pixel = layout.bytes_per_pixel();
        if data.len() % bytes_per_pixel != 0 {
            return Err(GifError::InvalidInputType {
                len: data.len(),
                bytes_per_pixel,
            });
        }

        let expected = width * height * bytes_per_pixel;
        if data.len() != expected {
            return Err(GifError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { data, layout })
    }

    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / self.layout.bytes_per_pixel()
    }

    /// Dense RGB triples for quantizer training.
    ///
    /// RGB input is borrowed as is; RGBA input is copied with alpha dropped.
    pub fn to_rgb(&self) -> Cow<'a, [u8]> {
        match self.layout {
            PixelLayout::Rgb => Cow::Borrowed(self.data),
            PixelLayout::Rgba => Cow::Owned(
                self.data
                    .chunks_exact(4)
                    .flat_map(|c| [c[0], c[1], c[2]])
                    .collect(),
            ),
        }
    }

    /// Map every pixel to its nearest palette entry.
    pub fn index_with(&self, quantizer: &NeuQuant) -> IndexedFrame {
        let mut indices = Vec::with_capacity(self.pixel_count());
        let mut used = [false; PALETTE_SIZE];

        for px in self.data.chunks_exact(self.layout.bytes_per_pixel()) {
            let index = quantizer.nearest(px[0], px[1], px[2]);
            used[index as usize] = true;
            indices.push(index);
        }

        IndexedFrame { indices, used }
    }
}

/// One palette index per pixel plus the set of palette entries referenced.
#[derive(Clone, Debug)]
pub struct IndexedFrame {
    indices: Vec<u8>,
    used: [bool; PALETTE_SIZE],
}

impl IndexedFrame {
    /// Row-major palette indices.
    #[inline]
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Whether any pixel maps to palette entry `index`.
    #[inline]
    pub fn is_used(&self, index: u8) -> bool {
        self.used[index as usize]
    }

    pub fn used(&self) -> &[bool; PALETTE_SIZE] {
        &self.used
    }

    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_drops_alpha() {
        let rgba = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let frame = FramePixels::new(&rgba, PixelLayout::Rgba, 2, 1).unwrap();
        assert_eq!(frame.to_rgb().as_ref(), &[1, 2, 3, 5, 6, 7]);
        assert_eq!(frame.pixel_count(), 2);
    }

    #[test]
    fn test_rgb_is_borrowed() {
        let rgb = [9u8, 8, 7];
        let frame = FramePixels::new(&rgb, PixelLayout::Rgb, 1, 1).unwrap();
        assert!(matches!(frame.to_rgb(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let rgba = vec![0u8; 4 * 4 * 4];
        let err = FramePixels::new(&rgba, PixelLayout::Rgba, 4, 5).unwrap_err();
        assert!(matches!(
            err,
            GifError::DimensionMismatch {
                expected: 80,
                actual: 64
            }
        ));
    }

    #[test]
    fn test_partial_pixel_is_invalid_input() {
        let rgba = vec![0u8; 15];
        let err = FramePixels::new(&rgba, PixelLayout::Rgba, 2, 2).unwrap_err();
        assert!(matches!(err, GifError::InvalidInputType { len: 15, bytes_per_pixel: 4 }));
    }

    #[test]
    fn test_index_marks_used_entries() {
        let rgb: Vec<u8> = [[255u8, 0, 0], [0, 0, 255]]
            .iter()
            .cycle()
            .take(64)
            .flatten()
            .copied()
            .collect();
        let quantizer = NeuQuant::new(&rgb, 1).unwrap();
        let frame = FramePixels::new(&rgb, PixelLayout::Rgb, 8, 8).unwrap();
        let indexed = frame.index_with(&quantizer);

        assert_eq!(indexed.indices().len(), 64);
        assert!(indexed.used_count() >= 1);
        for &i in indexed.indices() {
            assert!(indexed.is_used(i));
        }
        assert_ne!(indexed.indices()[0], indexed.indices()[1]);
    }
}
