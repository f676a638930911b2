//! Animated GIF encoder session.
//!
//! A [`GifEncoder`] walks through `Unconfigured -> Started -> Finished`.
//! Size and settings may change freely until the first frame is written;
//! from then on they are locked for the rest of the session.

use tracing::debug;

use crate::{
    container::{ContainerWriter, GraphicControl},
    lzw::LzwEncoder,
    neuquant::NeuQuant,
    sampler::{FramePixels, PixelLayout},
    GifError, Result, GIF_DIMENSION_LIMIT,
};

/// LZW minimum code size for 256-color frames.
const LZW_MIN_CODE_SIZE: u8 = 8;

/// Accepted range for [`EncoderSettings::quality`].
pub const QUALITY_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

/// How a frame is treated before the next one is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// No disposal specified; the viewer decides.
    #[default]
    Any = 0,
    /// Leave the frame in place.
    Keep = 1,
    /// Restore the area to the background color.
    Background = 2,
    /// Restore the area to what was there before the frame.
    Previous = 3,
}

impl TryFrom<u8> for DisposalMethod {
    type Error = GifError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(DisposalMethod::Any),
            1 => Ok(DisposalMethod::Keep),
            2 => Ok(DisposalMethod::Background),
            3 => Ok(DisposalMethod::Previous),
            _ => Err(GifError::Configuration(format!(
                "invalid disposal method {code} (expected 0-3)"
            ))),
        }
    }
}

/// Animation looping behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repeat {
    /// No NETSCAPE2.0 extension; the animation plays once.
    #[default]
    Off,
    /// Loop forever.
    Infinite,
    /// Loop the given number of times.
    Finite(u16),
}

impl Repeat {
    /// Map the conventional integer form: -1 = off, 0 = forever, n = n times.
    pub fn from_count(count: i32) -> Result<Self> {
        match count {
            -1 => Ok(Repeat::Off),
            0 => Ok(Repeat::Infinite),
            n => u16::try_from(n).map(Repeat::Finite).map_err(|_| {
                GifError::Configuration(format!("invalid repeat count {n} (expected -1..=65535)"))
            }),
        }
    }

    /// Loop count written to the NETSCAPE2.0 extension, if any.
    #[inline]
    pub fn loop_count(self) -> Option<u16> {
        match self {
            Repeat::Off => None,
            Repeat::Infinite => Some(0),
            Repeat::Finite(n) => Some(n),
        }
    }
}

/// Session-wide encoder settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Quantizer sample factor (1-30). 1 trains on every pixel and gives the
    /// best colors; 30 is the fastest.
    pub quality: u32,
    /// Frame delay in hundredths of a second.
    pub delay_cs: u16,
    pub repeat: Repeat,
    /// `None` picks [`DisposalMethod::Background`] when a transparent color
    /// is set and [`DisposalMethod::Any`] otherwise.
    pub disposal: Option<DisposalMethod>,
    /// Color to render transparent; mapped to the nearest used palette entry
    /// of each frame.
    pub transparent: Option<[u8; 3]>,
    /// Text written as a comment extension with every frame.
    pub comment: Option<String>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            quality: 10,
            delay_cs: 0,
            repeat: Repeat::Off,
            disposal: None,
            transparent: None,
            comment: None,
        }
    }
}

impl EncoderSettings {
    pub fn validate(&self) -> Result<()> {
        validate_quality(self.quality)
    }

    /// Disposal code actually written to each Graphic Control Extension.
    pub fn effective_disposal(&self) -> DisposalMethod {
        self.disposal.unwrap_or(if self.transparent.is_some() {
            DisposalMethod::Background
        } else {
            DisposalMethod::Any
        })
    }
}

/// Lifecycle of an encode session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderState {
    /// Not started yet; nothing has been written.
    Unconfigured,
    /// Signature written; frames may be added.
    Started,
    /// Trailer written; the output is complete.
    Finished,
}

/// An animated GIF encode session writing into an in-memory buffer.
///
/// # Example
///
/// ```rust
/// use neugif::{GifEncoder, PixelLayout};
///
/// let mut encoder = GifEncoder::new();
/// encoder.configure(2, 1)?;
/// encoder.set_quality(1)?;
/// encoder.set_delay(100)?; // 100 ms
/// encoder.start();
/// encoder.add_frame_with_layout(&[255, 0, 0, 0, 0, 255], PixelLayout::Rgb)?;
/// encoder.finish();
/// assert_eq!(encoder.frame_count(), 1);
/// # Ok::<(), neugif::GifError>(())
/// ```
#[derive(Debug)]
pub struct GifEncoder {
    settings: EncoderSettings,
    size: Option<(u16, u16)>,
    state: EncoderState,
    frame_count: usize,
    out: Vec<u8>,
}

impl Default for GifEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GifEncoder {
    pub fn new() -> Self {
        Self {
            settings: EncoderSettings::default(),
            size: None,
            state: EncoderState::Unconfigured,
            frame_count: 0,
            out: Vec::new(),
        }
    }

    /// Create an encoder with every setting applied at once.
    pub fn with_settings(settings: EncoderSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::new()
        })
    }

    /// Set the frame size.
    ///
    /// # Errors
    ///
    /// * [`GifError::InvalidDimensions`] for a zero side or one above 65535
    /// * [`GifError::Configuration`] when changing the size after the first frame
    pub fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || width > GIF_DIMENSION_LIMIT || height > GIF_DIMENSION_LIMIT
        {
            return Err(GifError::InvalidDimensions { width, height });
        }
        let size = (width as u16, height as u16);
        if self.is_locked() && self.size != Some(size) {
            return Err(GifError::Configuration(format!(
                "frame size is locked at {}x{}",
                self.size.map_or(0, |s| s.0),
                self.size.map_or(0, |s| s.1)
            )));
        }
        self.size = Some(size);
        Ok(())
    }

    pub fn set_quality(&mut self, quality: u32) -> Result<()> {
        self.ensure_unlocked("quality")?;
        validate_quality(quality)?;
        self.settings.quality = quality;
        Ok(())
    }

    /// Frame delay in milliseconds, rounded to the nearest centisecond.
    pub fn set_delay(&mut self, millis: u32) -> Result<()> {
        self.ensure_unlocked("delay")?;
        let delay_cs = u16::try_from((millis as u64 + 5) / 10)
            .map_err(|_| GifError::Configuration(format!("delay {millis} ms is too long")))?;
        self.settings.delay_cs = delay_cs;
        Ok(())
    }

    /// Frame delay from a frame rate, rounded to the nearest centisecond.
    pub fn set_frame_rate(&mut self, fps: f32) -> Result<()> {
        self.ensure_unlocked("frame rate")?;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(GifError::Configuration(format!("invalid frame rate {fps}")));
        }
        let delay = (100.0 / fps).round();
        if delay > u16::MAX as f32 {
            return Err(GifError::Configuration(format!("frame rate {fps} is too low")));
        }
        self.settings.delay_cs = delay as u16;
        Ok(())
    }

    /// -1 disables looping, 0 loops forever, n loops n times.
    pub fn set_repeat(&mut self, count: i32) -> Result<()> {
        self.ensure_unlocked("repeat")?;
        self.settings.repeat = Repeat::from_count(count)?;
        Ok(())
    }

    pub fn set_disposal_method(&mut self, code: u8) -> Result<()> {
        self.ensure_unlocked("disposal method")?;
        self.settings.disposal = Some(DisposalMethod::try_from(code)?);
        Ok(())
    }

    pub fn set_transparent_color(&mut self, rgb: [u8; 3]) -> Result<()> {
        self.ensure_unlocked("transparent color")?;
        self.settings.transparent = Some(rgb);
        Ok(())
    }

    pub fn set_comment(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_unlocked("comment")?;
        let text = text.into();
        self.settings.comment = (!text.is_empty()).then_some(text);
        Ok(())
    }

    /// Write the GIF signature. Returns `false` only once the session has
    /// finished; starting an already started session does nothing.
    pub fn start(&mut self) -> bool {
        match self.state {
            EncoderState::Unconfigured => {
                ContainerWriter::new(&mut self.out).header();
                self.state = EncoderState::Started;
                debug!("gif session started");
                true
            }
            EncoderState::Started => true,
            EncoderState::Finished => false,
        }
    }

    /// Add an RGBA frame (4 bytes per pixel, alpha ignored).
    pub fn add_frame(&mut self, rgba: &[u8]) -> Result<()> {
        self.add_frame_with_layout(rgba, PixelLayout::Rgba)
    }

    /// Quantize, index, compress and append one frame.
    ///
    /// The frame is validated and fully encoded before anything is
    /// appended, so a failed call leaves the output untouched. Callers
    /// should still discard the encoder after any error.
    ///
    /// # Errors
    ///
    /// * [`GifError::NotStarted`] / [`GifError::AlreadyFinished`] outside the `Started` state
    /// * [`GifError::Configuration`] if no frame size has been set
    /// * [`GifError::DimensionMismatch`] / [`GifError::InvalidInputType`] for a bad buffer
    /// * [`GifError::QuantizerInit`] / [`GifError::CompressorInit`] if a codec cannot be built
    #[tracing::instrument(skip_all, level = "debug", fields(frame = self.frame_count))]
    pub fn add_frame_with_layout(&mut self, pixels: &[u8], layout: PixelLayout) -> Result<()> {
        match self.state {
            EncoderState::Unconfigured => return Err(GifError::NotStarted),
            EncoderState::Finished => return Err(GifError::AlreadyFinished),
            EncoderState::Started => {}
        }
        let (width, height) = self.size.ok_or_else(|| {
            GifError::Configuration("frame size not set; call configure first".to_string())
        })?;

        let frame = FramePixels::new(pixels, layout, width as usize, height as usize)?;
        let quantizer = NeuQuant::new(&frame.to_rgb(), self.settings.quality)?;
        let indexed = frame.index_with(&quantizer);
        let palette = quantizer.palette();
        let blocks = LzwEncoder::new(LZW_MIN_CODE_SIZE)?.encode(indexed.indices())?;

        let gce = GraphicControl {
            disposal: self.settings.effective_disposal() as u8,
            delay_cs: self.settings.delay_cs,
            transparent_index: self
                .settings
                .transparent
                .map(|rgb| palette.closest(rgb, Some(indexed.used()))),
        };
        let first = self.frame_count == 0;

        let mut w = ContainerWriter::new(&mut self.out);
        if first {
            w.logical_screen(width, height);
            w.color_table(palette);
            if let Some(loops) = self.settings.repeat.loop_count() {
                w.netscape_loop(loops);
            }
        }
        w.graphic_control(&gce);
        if let Some(comment) = &self.settings.comment {
            w.comment(comment.as_bytes());
        }
        w.image_descriptor(width, height, !first);
        if !first {
            w.color_table(palette);
        }
        w.image_data(LZW_MIN_CODE_SIZE, &blocks);

        self.frame_count += 1;
        debug!(
            colors = indexed.used_count(),
            compressed = blocks.len(),
            total = self.out.len(),
            "frame written"
        );
        Ok(())
    }

    /// Write the trailer. Returns `false` if the session was not started
    /// or has already finished.
    pub fn finish(&mut self) -> bool {
        if self.state != EncoderState::Started {
            return false;
        }
        ContainerWriter::new(&mut self.out).trailer();
        self.state = EncoderState::Finished;
        debug!(frames = self.frame_count, bytes = self.out.len(), "gif session finished");
        true
    }

    /// Bytes written so far; a complete GIF once [`finish`](Self::finish) returned `true`.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn state(&self) -> EncoderState {
        self.state
    }

    #[inline]
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    #[inline]
    pub fn size(&self) -> Option<(u16, u16)> {
        self.size
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.frame_count > 0
    }

    fn ensure_unlocked(&self, what: &str) -> Result<()> {
        if self.is_locked() {
            return Err(GifError::Configuration(format!(
                "cannot change {what} after the first frame"
            )));
        }
        Ok(())
    }
}

fn validate_quality(quality: u32) -> Result<()> {
    if !QUALITY_RANGE.contains(&quality) {
        return Err(GifError::Configuration(format!(
            "quality {quality} out of range {}..={}",
            QUALITY_RANGE.start(),
            QUALITY_RANGE.end()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat(width * height)
    }

    fn started(width: u32, height: u32) -> GifEncoder {
        let mut enc = GifEncoder::new();
        enc.configure(width, height).unwrap();
        assert!(enc.start());
        enc
    }

    #[test]
    fn test_lifecycle() {
        let mut enc = GifEncoder::new();
        assert_eq!(enc.state(), EncoderState::Unconfigured);
        assert!(!enc.finish());
        assert!(enc.bytes().is_empty());

        enc.configure(2, 2).unwrap();
        assert!(enc.start());
        assert!(enc.start());
        assert_eq!(enc.bytes(), b"GIF89a");

        enc.add_frame(&solid(2, 2, [0, 0, 0, 255])).unwrap();
        assert!(enc.finish());
        assert!(!enc.finish());
        assert!(!enc.start());
        assert_eq!(enc.state(), EncoderState::Finished);
        assert_eq!(enc.bytes().last(), Some(&0x3B));
        assert_eq!(enc.frame_count(), 1);
    }

    #[test]
    fn test_add_frame_requires_start() {
        let mut enc = GifEncoder::new();
        enc.configure(1, 1).unwrap();
        assert!(matches!(enc.add_frame(&[0, 0, 0, 0]), Err(GifError::NotStarted)));

        enc.start();
        enc.finish();
        assert!(matches!(enc.add_frame(&[0, 0, 0, 0]), Err(GifError::AlreadyFinished)));
    }

    #[test]
    fn test_add_frame_requires_size() {
        let mut enc = GifEncoder::new();
        enc.start();
        assert!(matches!(enc.add_frame(&[0, 0, 0, 0]), Err(GifError::Configuration(_))));
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut enc = GifEncoder::new();
        assert!(matches!(
            enc.configure(0, 4),
            Err(GifError::InvalidDimensions { width: 0, height: 4 })
        ));
        assert!(enc.configure(4, 0).is_err());
        assert!(enc.configure(70_000, 4).is_err());
        assert!(enc.configure(65_535, 1).is_ok());
    }

    #[test]
    fn test_geometry_locks_after_first_frame() {
        let mut enc = started(2, 2);
        enc.configure(3, 3).unwrap();
        enc.configure(2, 2).unwrap();
        enc.add_frame(&solid(2, 2, [9, 9, 9, 255])).unwrap();

        assert!(enc.configure(2, 2).is_ok());
        assert!(matches!(enc.configure(4, 4), Err(GifError::Configuration(_))));
        assert!(enc.set_quality(5).is_err());
        assert!(enc.set_delay(100).is_err());
        assert!(enc.set_repeat(0).is_err());
        assert!(enc.set_comment("late").is_err());
        assert_eq!(enc.size(), Some((2, 2)));
    }

    #[test]
    fn test_dimension_mismatch_leaves_output_untouched() {
        let mut enc = started(4, 4);
        let before = enc.bytes().to_vec();
        let err = enc.add_frame(&solid(4, 3, [1, 2, 3, 255])).unwrap_err();
        assert!(matches!(err, GifError::DimensionMismatch { expected: 64, actual: 48 }));
        assert_eq!(enc.bytes(), before.as_slice());
        assert_eq!(enc.frame_count(), 0);
    }

    #[test]
    fn test_rgb_layout() {
        let mut enc = started(2, 2);
        enc.add_frame_with_layout(&[10u8; 12], PixelLayout::Rgb).unwrap();
        assert!(matches!(
            enc.add_frame_with_layout(&[10u8; 13], PixelLayout::Rgb),
            Err(GifError::InvalidInputType { len: 13, bytes_per_pixel: 3 })
        ));
    }

    #[test]
    fn test_quality_range() {
        let mut enc = GifEncoder::new();
        assert!(enc.set_quality(0).is_err());
        assert!(enc.set_quality(31).is_err());
        enc.set_quality(1).unwrap();
        enc.set_quality(30).unwrap();
        assert_eq!(enc.settings().quality, 30);
        assert!(GifEncoder::with_settings(EncoderSettings {
            quality: 0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_delay_rounding() {
        let mut enc = GifEncoder::new();
        enc.set_delay(104).unwrap();
        assert_eq!(enc.settings().delay_cs, 10);
        enc.set_delay(105).unwrap();
        assert_eq!(enc.settings().delay_cs, 11);
        enc.set_frame_rate(30.0).unwrap();
        assert_eq!(enc.settings().delay_cs, 3);
        enc.set_frame_rate(10.0).unwrap();
        assert_eq!(enc.settings().delay_cs, 10);
        assert!(enc.set_frame_rate(0.0).is_err());
        assert!(enc.set_frame_rate(f32::NAN).is_err());
        assert!(enc.set_delay(u32::MAX).is_err());
    }

    #[test]
    fn test_repeat_mapping() {
        assert_eq!(Repeat::from_count(-1).unwrap(), Repeat::Off);
        assert_eq!(Repeat::from_count(0).unwrap(), Repeat::Infinite);
        assert_eq!(Repeat::from_count(3).unwrap(), Repeat::Finite(3));
        assert!(Repeat::from_count(-2).is_err());
        assert!(Repeat::from_count(70_000).is_err());
        assert_eq!(Repeat::Infinite.loop_count(), Some(0));
        assert_eq!(Repeat::Off.loop_count(), None);
    }

    #[test]
    fn test_disposal() {
        assert!(DisposalMethod::try_from(4).is_err());
        let mut settings = EncoderSettings::default();
        assert_eq!(settings.effective_disposal(), DisposalMethod::Any);
        settings.transparent = Some([0, 0, 0]);
        assert_eq!(settings.effective_disposal(), DisposalMethod::Background);
        settings.disposal = Some(DisposalMethod::Keep);
        assert_eq!(settings.effective_disposal(), DisposalMethod::Keep);
    }

    #[test]
    fn test_empty_comment_is_cleared() {
        let mut enc = GifEncoder::new();
        enc.set_comment("hello").unwrap();
        assert_eq!(enc.settings().comment.as_deref(), Some("hello"));
        enc.set_comment("").unwrap();
        assert_eq!(enc.settings().comment, None);
    }
}
