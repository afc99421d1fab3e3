//! RGB to luminance conversion.

use crate::stage::Stage;
use crate::types::{Pixel, StreamError};

/// Integer luminance approximating `0.281 R + 0.563 G + 0.094 B`.
///
/// Uses shifts and adds only: `R/4 + R/32 + G/2 + G/16 + B/16 + B/32`.
/// The weights sum to `0.9375` and each term is floored, so pure white
/// maps to 234 and the result never exceeds 255.
#[must_use]
pub const fn luminance(pixel: Pixel) -> u8 {
    let [r, g, b, _] = pixel.channels();
    let (r, g, b) = (r as u16, g as u16, b as u16);
    let y = (r >> 2) + (r >> 5) + (g >> 1) + (g >> 4) + (b >> 4) + (b >> 5);
    #[allow(clippy::cast_possible_truncation)]
    {
        y as u8
    }
}

/// Stateless stage replacing a pixel's color with its luminance.
///
/// The intensity is written to the red, green and blue bytes; alpha and
/// the raster flags pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuminanceStage;

impl LuminanceStage {
    /// Create the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Stage for LuminanceStage {
    type Input = Pixel;
    type Output = Pixel;

    fn process(&mut self, input: Pixel) -> Result<Pixel, StreamError> {
        Ok(input.with_intensity(luminance(input)))
    }

    fn name(&self) -> &'static str {
        "luminance"
    }
}
