//! Shared types for the streaming edge detection pipeline.

use serde::{Deserialize, Serialize};

use crate::gradient::AngleStrategy;

/// Re-export `GrayImage` so downstream crates can reference
/// reassembled frames without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded
/// frames to the stream adapters without depending on `image` directly.
pub use image::RgbaImage;

/// Intensity of a confirmed edge pixel.
pub const STRONG: u8 = 255;

/// Intensity of a non-edge pixel.
pub const BACKGROUND: u8 = 0;

/// A packed 32-bit pixel travelling through the pipeline channel.
///
/// The payload is RGBA with red in the least significant byte and
/// alpha in the most significant byte. Once the luminance stage has run,
/// only the intensity (byte 0, mirrored into bytes 1 and 2) is
/// meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pixel {
    /// Packed RGBA payload.
    pub data: u32,
    /// First pixel of a frame. Resets every stage's raster cursor.
    pub start_of_frame: bool,
    /// Last pixel of a row.
    pub end_of_row: bool,
}

impl Pixel {
    /// Create an untagged pixel from a packed payload.
    #[must_use]
    pub const fn new(data: u32) -> Self {
        Self {
            data,
            start_of_frame: false,
            end_of_row: false,
        }
    }

    /// Pack four channel bytes into a pixel.
    #[must_use]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(u32::from_le_bytes([r, g, b, a]))
    }

    /// Create an opaque gray pixel with the given intensity.
    #[must_use]
    pub const fn gray(intensity: u8) -> Self {
        Self::from_rgba(intensity, intensity, intensity, u8::MAX)
    }

    /// Return the same pixel with the raster flags replaced.
    #[must_use]
    pub const fn with_flags(self, start_of_frame: bool, end_of_row: bool) -> Self {
        Self {
            data: self.data,
            start_of_frame,
            end_of_row,
        }
    }

    /// The four channel bytes `[r, g, b, a]`.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        self.data.to_le_bytes()
    }

    /// The processed intensity carried in the lowest byte.
    #[must_use]
    pub const fn intensity(self) -> u8 {
        self.data.to_le_bytes()[0]
    }

    /// Replace the color channels with `value`, keeping alpha and flags.
    #[must_use]
    pub const fn with_intensity(self, value: u8) -> Self {
        let alpha = self.data & 0xFF00_0000;
        let v = value as u32;
        Self {
            data: alpha | (v << 16) | (v << 8) | v,
            start_of_frame: self.start_of_frame,
            end_of_row: self.end_of_row,
        }
    }
}

/// Position of a pixel within its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Column, counted from the left edge.
    pub x: u32,
    /// Row, counted from the top edge.
    pub y: u32,
}

impl Coordinate {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Frame dimensions in pixels, fixed before the first pixel arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameDimensions {
    /// Create new frame dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels in one frame.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Reject frames with a zero dimension.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if either dimension is zero.
    pub fn validate(self) -> Result<(), StreamError> {
        if self.width == 0 || self.height == 0 {
            return Err(StreamError::InvalidConfig(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height,
            )));
        }
        Ok(())
    }
}

/// Local edge strength and direction at one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradientSample {
    /// Gradient magnitude at full range. A Sobel response of 8-bit
    /// input exceeds 255 on any sharp edge.
    pub magnitude: u16,
    /// Gradient direction in whole degrees. Any sign.
    pub angle: i16,
}

impl GradientSample {
    /// The magnitude saturated to 8 bits.
    #[must_use]
    pub const fn saturated(self) -> u8 {
        let [low, high] = self.magnitude.to_le_bytes();
        if high == 0 { low } else { u8::MAX }
    }
}

/// Output element of the gradient stage.
///
/// The pixel carries the raster flags and, as its intensity, the
/// saturated magnitude. Suppression compares the full magnitude, so
/// neighbors on a high-contrast edge do not tie at 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradientPixel {
    /// Pixel whose intensity is the saturated gradient magnitude.
    pub pixel: Pixel,
    /// Gradient magnitude at full range.
    pub magnitude: u16,
    /// Gradient direction in whole degrees.
    pub angle: i16,
}

impl GradientPixel {
    /// Tag `sample` with the raster flags of `pixel`.
    #[must_use]
    pub const fn new(pixel: Pixel, sample: GradientSample) -> Self {
        Self {
            pixel: pixel.with_intensity(sample.saturated()),
            magnitude: sample.magnitude,
            angle: sample.angle,
        }
    }

    /// The magnitude/angle pair carried by this element.
    #[must_use]
    pub const fn sample(self) -> GradientSample {
        GradientSample {
            magnitude: self.magnitude,
            angle: self.angle,
        }
    }
}

/// Configuration for the edge detection pipeline.
///
/// Threshold and weak-marker values differ between deployments, so they
/// are configuration rather than constants. Use [`EdgeConfig::validate`]
/// before building stages; [`crate::EdgePipeline::new`] does so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Which gradient magnitude/angle estimator the gradient stage uses.
    pub angle_strategy: AngleStrategy,

    /// Suppressed magnitudes at or above this value are at least WEAK.
    ///
    /// Must be at least 1 so that startup placeholders (magnitude 0)
    /// classify as background.
    pub low_threshold: u8,

    /// Suppressed magnitudes at or above this value are STRONG.
    ///
    /// Must be strictly greater than `low_threshold`.
    pub high_threshold: u8,

    /// Marker intensity for WEAK pixels between the threshold and
    /// hysteresis stages. Must differ from [`BACKGROUND`] and [`STRONG`].
    pub weak_value: u8,
}

impl EdgeConfig {
    /// Default gradient estimator.
    pub const DEFAULT_ANGLE_STRATEGY: AngleStrategy = AngleStrategy::Reference;
    /// Default low threshold.
    pub const DEFAULT_LOW_THRESHOLD: u8 = 20;
    /// Default high threshold.
    pub const DEFAULT_HIGH_THRESHOLD: u8 = 80;
    /// Default WEAK marker intensity.
    pub const DEFAULT_WEAK_VALUE: u8 = 75;

    /// Check the threshold invariants.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] when `low_threshold` is zero,
    /// `low_threshold >= high_threshold`, or `weak_value` collides with
    /// the background or strong intensity.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.low_threshold == 0 {
            return Err(StreamError::InvalidConfig(
                "low_threshold must be at least 1".to_string(),
            ));
        }
        if self.low_threshold >= self.high_threshold {
            return Err(StreamError::InvalidConfig(format!(
                "low_threshold ({}) must be below high_threshold ({})",
                self.low_threshold, self.high_threshold,
            )));
        }
        if self.weak_value == BACKGROUND || self.weak_value == STRONG {
            return Err(StreamError::InvalidConfig(format!(
                "weak_value must differ from {BACKGROUND} and {STRONG}, got {}",
                self.weak_value,
            )));
        }
        Ok(())
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            angle_strategy: Self::DEFAULT_ANGLE_STRATEGY,
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            weak_value: Self::DEFAULT_WEAK_VALUE,
        }
    }
}

/// Errors raised while streaming pixels through the pipeline.
///
/// A stream error is fatal for the frame in flight. Stages stay faulted
/// until the next `start_of_frame` pixel or an explicit reset.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The input channel produced no pixels at all.
    #[error("input pixel stream is empty")]
    EmptyStream,

    /// A pixel arrived with no frame open.
    #[error("pixel received before any start-of-frame marker")]
    MissingStartOfFrame,

    /// `end_of_row` arrived before the configured width was reached.
    #[error("row {row} ended at column {column}, expected width {width}")]
    RowLengthMismatch {
        /// Row being scanned.
        row: u32,
        /// Column that carried the early `end_of_row`.
        column: u32,
        /// Configured frame width.
        width: u32,
    },

    /// The last column of a row arrived without `end_of_row`.
    #[error("row {row} reached width {width} without an end-of-row marker")]
    MissingEndOfRow {
        /// Row being scanned.
        row: u32,
        /// Configured frame width.
        width: u32,
    },

    /// `start_of_frame` arrived while a frame was still open.
    #[error("frame interrupted by start-of-frame at row {row}, column {column}")]
    FrameInterrupted {
        /// Row the open frame had reached.
        row: u32,
        /// Column the open frame had reached.
        column: u32,
    },

    /// The stream ended while a frame was still open.
    #[error("stream ended after {rows} of {height} rows")]
    TruncatedFrame {
        /// Complete rows received for the last frame.
        rows: u32,
        /// Configured frame height.
        height: u32,
    },

    /// The configuration violates an invariant.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Image bytes handed to the frame adapter were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The frame adapter could not decode the image bytes.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

/// Serde-compatible proxy for `StreamError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant carries the error's display string instead.
#[derive(Serialize, Deserialize)]
enum StreamErrorProxy {
    EmptyStream,
    MissingStartOfFrame,
    RowLengthMismatch { row: u32, column: u32, width: u32 },
    MissingEndOfRow { row: u32, width: u32 },
    FrameInterrupted { row: u32, column: u32 },
    TruncatedFrame { rows: u32, height: u32 },
    InvalidConfig(String),
    EmptyInput,
    ImageDecode(String),
}

impl Serialize for StreamError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::EmptyStream => StreamErrorProxy::EmptyStream,
            Self::MissingStartOfFrame => StreamErrorProxy::MissingStartOfFrame,
            Self::RowLengthMismatch { row, column, width } => StreamErrorProxy::RowLengthMismatch {
                row: *row,
                column: *column,
                width: *width,
            },
            Self::MissingEndOfRow { row, width } => StreamErrorProxy::MissingEndOfRow {
                row: *row,
                width: *width,
            },
            Self::FrameInterrupted { row, column } => StreamErrorProxy::FrameInterrupted {
                row: *row,
                column: *column,
            },
            Self::TruncatedFrame { rows, height } => StreamErrorProxy::TruncatedFrame {
                rows: *rows,
                height: *height,
            },
            Self::InvalidConfig(s) => StreamErrorProxy::InvalidConfig(s.clone()),
            Self::EmptyInput => StreamErrorProxy::EmptyInput,
            Self::ImageDecode(e) => StreamErrorProxy::ImageDecode(e.to_string()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreamError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = StreamErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            StreamErrorProxy::EmptyStream => Self::EmptyStream,
            StreamErrorProxy::MissingStartOfFrame => Self::MissingStartOfFrame,
            StreamErrorProxy::RowLengthMismatch { row, column, width } => {
                Self::RowLengthMismatch { row, column, width }
            }
            StreamErrorProxy::MissingEndOfRow { row, width } => {
                Self::MissingEndOfRow { row, width }
            }
            StreamErrorProxy::FrameInterrupted { row, column } => {
                Self::FrameInterrupted { row, column }
            }
            StreamErrorProxy::TruncatedFrame { rows, height } => {
                Self::TruncatedFrame { rows, height }
            }
            StreamErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            StreamErrorProxy::EmptyInput => Self::EmptyInput,
            StreamErrorProxy::ImageDecode(msg) => {
                // Wrap the message in a generic decoding error since
                // we cannot reconstruct an image::ImageError.
                Self::ImageDecode(image::ImageError::IoError(std::io::Error::other(msg)))
            }
        })
    }
}
