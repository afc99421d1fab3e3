//! streamcanny-pipeline: Streaming Canny edge detection (sans-IO).
//!
//! Detects edges in raster video one pixel at a time, holding only a few
//! image rows per stage. Pixels flow through:
//! luminance -> Gaussian smoothing -> Sobel gradient -> non-maximum
//! suppression -> double threshold -> hysteresis -> border correction.
//!
//! Every stage consumes exactly one element and emits exactly one, so
//! the output stream has the same length and raster flags as the input.
//! Windowed stages delay the raster by their radius; the assembled
//! [`EdgePipeline`] reports the total as [`EdgePipeline::latency`].
//!
//! The pipeline itself operates on in-memory pixel iterators. The
//! [`frame`] module decodes image bytes with the `image` crate and
//! reassembles output frames; reading and writing files lives in
//! `streamcanny-bench`.

pub mod border;
pub mod diagnostics;
pub mod frame;
pub mod gradient;
pub mod hysteresis;
pub mod luminance;
pub mod pipeline;
pub mod raster;
pub mod smoothing;
pub mod stage;
pub mod suppression;
pub mod threshold;
pub mod types;
pub mod window;

pub use gradient::{AngleStrategy, GradientEstimator};
pub use pipeline::EdgePipeline;
pub use stage::Stage;
pub use types::{
    BACKGROUND, Coordinate, EdgeConfig, FrameDimensions, GradientPixel, GradientSample, GrayImage,
    Pixel, RgbaImage, STRONG, StreamError,
};

/// Decode an image and detect its edges in a single frame.
///
/// Convenience wrapper over [`frame::decode_rgba`], [`EdgePipeline::run`]
/// and [`frame::FrameSink`]. The returned image is the raw output frame:
/// pixel `(x, y)` holds the decision for source pixel
/// `(x - latency, y - latency)`.
///
/// # Errors
///
/// Returns [`StreamError::EmptyInput`] or [`StreamError::ImageDecode`]
/// for unusable bytes, and [`StreamError::InvalidConfig`] for an invalid
/// configuration.
pub fn detect_edges(image_bytes: &[u8], config: &EdgeConfig) -> Result<GrayImage, StreamError> {
    let image = frame::decode_rgba(image_bytes)?;
    let dims = FrameDimensions::new(image.width(), image.height());
    let mut pipeline = EdgePipeline::new(dims, *config)?;
    let output = pipeline.run(frame::frame_to_stream(&image))?;

    let mut sink = frame::FrameSink::new(dims);
    sink.extend(output);
    let mut frames = sink.finish()?;
    frames.pop().ok_or(StreamError::EmptyStream)
}
