//! 5×5 Gaussian smoothing.

use crate::raster::RasterCursor;
use crate::stage::Stage;
use crate::types::{FrameDimensions, Pixel, StreamError};
use crate::window::{Neighborhood, SlidingWindow};

/// Integer approximation of a Gaussian with σ ≈ 1.
pub const GAUSSIAN_KERNEL: [[i32; 5]; 5] = [
    [1, 4, 7, 4, 1],
    [4, 16, 26, 16, 4],
    [7, 26, 41, 26, 7],
    [4, 16, 26, 16, 4],
    [1, 4, 7, 4, 1],
];

/// Sum of [`GAUSSIAN_KERNEL`].
pub const GAUSSIAN_DIVISOR: i32 = 273;

/// Weighted average of the in-bounds cells around the centre.
///
/// The divisor stays at [`GAUSSIAN_DIVISOR`] even when cells are
/// missing, so the two leading rows and columns of a frame come out
/// darker than the image.
#[must_use]
pub fn gaussian(hood: &Neighborhood<'_, u8, 5>) -> u8 {
    let sum = hood.correlate(&GAUSSIAN_KERNEL);
    u8::try_from(sum / GAUSSIAN_DIVISOR).unwrap_or(u8::MAX)
}

/// Smooths the luminance channel with [`GAUSSIAN_KERNEL`].
///
/// Output is delayed by two rows and two columns. Until the first full
/// centre is available the raw intensity passes through unchanged.
#[derive(Debug, Clone)]
pub struct SmoothingStage {
    cursor: RasterCursor,
    window: SlidingWindow<u8, 5>,
}

impl SmoothingStage {
    /// Create a stage at the head of the pipeline.
    #[must_use]
    pub fn new(dims: FrameDimensions) -> Self {
        Self::with_origin(dims, 0)
    }

    /// Create a stage whose input is valid from slot `(origin, origin)`.
    #[must_use]
    pub fn with_origin(dims: FrameDimensions, origin: u32) -> Self {
        Self {
            cursor: RasterCursor::new(dims),
            window: SlidingWindow::new(dims, origin),
        }
    }
}

impl Stage for SmoothingStage {
    type Input = Pixel;
    type Output = Pixel;

    fn process(&mut self, input: Pixel) -> Result<Pixel, StreamError> {
        let at = self
            .cursor
            .advance(input.start_of_frame, input.end_of_row)?;
        let hood = self.window.ingest(input.intensity(), at);
        let value = if hood.is_ready() {
            gaussian(&hood)
        } else {
            input.intensity()
        };
        Ok(input.with_intensity(value))
    }

    fn latency(&self) -> u32 {
        SlidingWindow::<u8, 5>::RADIUS
    }

    fn border_reach(&self) -> u32 {
        SlidingWindow::<u8, 5>::RADIUS
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.window.clear();
    }

    fn name(&self) -> &'static str {
        "smoothing"
    }
}
