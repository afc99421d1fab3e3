//! 3×3 Sobel gradient with selectable magnitude/angle estimation.
//!
//! Two estimators are available through [`AngleStrategy`]:
//!
//! - **Reference**: floating-point `hypot` and `atan2`, rounded to whole
//!   units.
//! - **Fixed point**: CORDIC vectoring with shifts and adds only, the
//!   form a hardware datapath would use.
//!
//! The fixed-point angle is the arctangent of the slope rather than a
//! full four-quadrant direction, so its range is about ±99°. Once
//! suppression folds angles into `[0, 180)` both estimators land in the
//! same direction bucket for the edges that matter.

use serde::{Deserialize, Serialize};

use crate::raster::RasterCursor;
use crate::stage::Stage;
use crate::types::{FrameDimensions, GradientPixel, GradientSample, Pixel, StreamError};
use crate::window::{Neighborhood, SlidingWindow};

/// Horizontal Sobel kernel; positive toward the right column.
pub const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel; positive toward the upper row.
pub const SOBEL_Y: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Number of CORDIC micro-rotations.
pub const CORDIC_ITERATIONS: usize = 10;

/// Whole-degree rotation applied at CORDIC iteration `j` (`atan(2^-j)`,
/// truncated).
pub const CORDIC_ANGLE_STEPS: [i16; CORDIC_ITERATIONS] = [45, 27, 14, 7, 3, 2, 1, 0, 0, 0];

/// Available gradient estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleStrategy {
    /// Floating-point magnitude and four-quadrant angle.
    #[default]
    Reference,
    /// Shift-and-add CORDIC approximation.
    FixedPoint,
}

impl AngleStrategy {
    /// All variants in display order.
    pub const ALL: [Self; 2] = [Self::Reference, Self::FixedPoint];
}

impl std::fmt::Display for AngleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "Reference"),
            Self::FixedPoint => write!(f, "Fixed point"),
        }
    }
}

/// Converts a Sobel response pair into magnitude and angle.
pub trait GradientEstimator {
    /// Estimate the gradient for horizontal response `ix` and vertical
    /// response `iy`.
    fn estimate(&self, ix: i32, iy: i32) -> GradientSample;
}

impl GradientEstimator for AngleStrategy {
    fn estimate(&self, ix: i32, iy: i32) -> GradientSample {
        match self {
            Self::Reference => reference_gradient(ix, iy),
            Self::FixedPoint => cordic_gradient(ix, iy),
        }
    }
}

/// Rounded Euclidean magnitude and `atan2` angle in whole degrees,
/// `-180..=180`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn reference_gradient(ix: i32, iy: i32) -> GradientSample {
    let (fx, fy) = (f64::from(ix), f64::from(iy));
    let magnitude = fx.hypot(fy).round().min(f64::from(u16::MAX)) as u16;
    let angle = fy.atan2(fx).to_degrees().round() as i16;
    GradientSample { magnitude, angle }
}

/// CORDIC vectoring estimate.
///
/// Rotates `(ix, iy)` toward the x axis, accumulating the rotation in
/// degrees. The final `|x|` carries the CORDIC gain (about 1.647), which
/// is undone by multiplying with `0.609375` using shifts.
#[must_use]
pub fn cordic_gradient(ix: i32, iy: i32) -> GradientSample {
    let (mut x, mut y) = (ix, iy);
    let mut angle: i16 = 0;
    for (shift, step) in CORDIC_ANGLE_STEPS.iter().enumerate() {
        let (dx, dy) = (y >> shift, x >> shift);
        if (x >= 0) != (y >= 0) {
            x -= dx;
            y += dy;
            angle -= step;
        } else {
            x += dx;
            y -= dy;
            angle += step;
        }
    }
    let v = x.unsigned_abs();
    let scaled = (v >> 1) + (v >> 2) - (v >> 3) - (v >> 4) + (v >> 5) + (v >> 6);
    GradientSample {
        magnitude: u16::try_from(scaled).unwrap_or(u16::MAX),
        angle,
    }
}

/// Horizontal and vertical Sobel responses over the in-bounds cells.
#[must_use]
pub fn sobel(hood: &Neighborhood<'_, u8, 3>) -> (i32, i32) {
    (hood.correlate(&SOBEL_X), hood.correlate(&SOBEL_Y))
}

/// Computes the gradient of the smoothed intensity.
///
/// The output pixel's intensity carries the saturated magnitude; the
/// full magnitude and the angle travel alongside. Placeholder output is
/// magnitude 0, angle 0.
#[derive(Debug, Clone)]
pub struct GradientStage {
    cursor: RasterCursor,
    window: SlidingWindow<u8, 3>,
    strategy: AngleStrategy,
}

impl GradientStage {
    /// Create a stage whose input is valid from slot `(origin, origin)`.
    #[must_use]
    pub fn new(dims: FrameDimensions, origin: u32, strategy: AngleStrategy) -> Self {
        Self {
            cursor: RasterCursor::new(dims),
            window: SlidingWindow::new(dims, origin),
            strategy,
        }
    }

    /// The estimator chosen at construction.
    #[must_use]
    pub const fn strategy(&self) -> AngleStrategy {
        self.strategy
    }
}

impl Stage for GradientStage {
    type Input = Pixel;
    type Output = GradientPixel;

    fn process(&mut self, input: Pixel) -> Result<GradientPixel, StreamError> {
        let at = self
            .cursor
            .advance(input.start_of_frame, input.end_of_row)?;
        let hood = self.window.ingest(input.intensity(), at);
        let sample = if hood.is_ready() {
            let (ix, iy) = sobel(&hood);
            self.strategy.estimate(ix, iy)
        } else {
            GradientSample::default()
        };
        Ok(GradientPixel::new(input, sample))
    }

    fn latency(&self) -> u32 {
        SlidingWindow::<u8, 3>::RADIUS
    }

    fn border_reach(&self) -> u32 {
        SlidingWindow::<u8, 3>::RADIUS
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.window.clear();
    }

    fn name(&self) -> &'static str {
        "gradient"
    }
}
