//! Border correction: blank the slots that hold no trustworthy edge.

use crate::raster::RasterCursor;
use crate::stage::Stage;
use crate::types::{BACKGROUND, FrameDimensions, Pixel, StreamError};

/// Forces every slot whose row or column is below `margin` to background.
#[derive(Debug, Clone)]
pub struct BorderCorrectionStage {
    cursor: RasterCursor,
    margin: u32,
}

impl BorderCorrectionStage {
    /// Create the stage for a given margin.
    #[must_use]
    pub const fn new(dims: FrameDimensions, margin: u32) -> Self {
        Self {
            cursor: RasterCursor::new(dims),
            margin,
        }
    }

    /// Rows and columns blanked at the top-left of every frame.
    #[must_use]
    pub const fn margin(&self) -> u32 {
        self.margin
    }

    /// Whether the pixel just processed completed a frame.
    #[must_use]
    pub fn frame_complete(&self) -> bool {
        self.cursor.is_complete()
    }

    /// Whether a frame has started and not yet completed.
    #[must_use]
    pub fn is_mid_frame(&self) -> bool {
        self.cursor.is_mid_frame()
    }

    /// Complete rows received for the current frame.
    #[must_use]
    pub const fn rows_received(&self) -> u32 {
        self.cursor.rows_received()
    }
}

impl Stage for BorderCorrectionStage {
    type Input = Pixel;
    type Output = Pixel;

    fn process(&mut self, input: Pixel) -> Result<Pixel, StreamError> {
        let at = self
            .cursor
            .advance(input.start_of_frame, input.end_of_row)?;
        if at.x < self.margin || at.y < self.margin {
            Ok(input.with_intensity(BACKGROUND))
        } else {
            Ok(input)
        }
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }

    fn name(&self) -> &'static str {
        "border"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blanks_leading_rows_and_columns_only() {
        let (width, height, margin) = (5, 4, 2);
        let mut stage = BorderCorrectionStage::new(FrameDimensions::new(width, height), margin);
        for y in 0..height {
            for x in 0..width {
                let pixel = Pixel::gray(255).with_flags(x == 0 && y == 0, x == width - 1);
                let out = stage.process(pixel).unwrap().intensity();
                let expected = if x < margin || y < margin { 0 } else { 255 };
                assert_eq!(out, expected, "slot ({x}, {y})");
            }
        }
    }

    #[test]
    fn margin_wider_than_frame_blanks_everything() {
        let mut stage = BorderCorrectionStage::new(FrameDimensions::new(2, 1), 8);
        let a = stage
            .process(Pixel::gray(255).with_flags(true, false))
            .unwrap();
        let b = stage
            .process(Pixel::gray(255).with_flags(false, true))
            .unwrap();
        assert_eq!((a.intensity(), b.intensity()), (0, 0));
    }

    #[test]
    fn alpha_survives_blanking() {
        let mut stage = BorderCorrectionStage::new(FrameDimensions::new(1, 1), 1);
        let out = stage
            .process(Pixel::from_rgba(9, 9, 9, 0x42).with_flags(true, true))
            .unwrap();
        assert_eq!(out.channels(), [0, 0, 0, 0x42]);
    }
}
