//! Single-pass, window-local hysteresis.
//!
//! A weak pixel is promoted when one of its eight neighbors is strong at
//! the moment the pixel reaches the window centre. The decision is
//! written back so pixels further down and to the right see it, which
//! lets promotion ripple forward along an edge. It never ripples back
//! up: a weak chain whose only strong anchor lies below-left of it is
//! discarded. Closing that gap needs global connectivity, which a
//! fixed-memory stream cannot provide.

use crate::raster::RasterCursor;
use crate::stage::Stage;
use crate::types::{BACKGROUND, FrameDimensions, Pixel, STRONG, StreamError};
use crate::window::{Neighborhood, SlidingWindow};

/// What happened to the weak pixels seen since the last
/// [`HysteresisStage::take_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HysteresisStats {
    /// Weak pixels promoted to strong.
    pub promoted: u64,
    /// Weak pixels dropped to background.
    pub discarded: u64,
}

/// Whether any in-bounds 8-neighbor of the centre is strong.
#[must_use]
pub fn touches_strong(hood: &Neighborhood<'_, u8, 3>) -> bool {
    hood.cells()
        .any(|(d_row, d_col, v)| (d_row, d_col) != (0, 0) && v == STRONG)
}

/// Resolves weak pixels and emits a binary edge map.
#[derive(Debug, Clone)]
pub struct HysteresisStage {
    cursor: RasterCursor,
    window: SlidingWindow<u8, 3>,
    weak: u8,
    stats: HysteresisStats,
}

impl HysteresisStage {
    /// Create a stage whose input is valid from slot `(origin, origin)`,
    /// treating `weak` as the weak marker.
    #[must_use]
    pub fn new(dims: FrameDimensions, origin: u32, weak: u8) -> Self {
        Self {
            cursor: RasterCursor::new(dims),
            window: SlidingWindow::new(dims, origin),
            weak,
            stats: HysteresisStats::default(),
        }
    }

    /// Return the counters accumulated so far and zero them.
    pub fn take_stats(&mut self) -> HysteresisStats {
        std::mem::take(&mut self.stats)
    }
}

impl Stage for HysteresisStage {
    type Input = Pixel;
    type Output = Pixel;

    fn process(&mut self, input: Pixel) -> Result<Pixel, StreamError> {
        let at = self
            .cursor
            .advance(input.start_of_frame, input.end_of_row)?;
        let hood = self.window.ingest(input.intensity(), at);
        let value = match hood.center() {
            Some(STRONG) => STRONG,
            Some(v) if v == self.weak => {
                let resolved = if touches_strong(&hood) {
                    self.stats.promoted += 1;
                    STRONG
                } else {
                    self.stats.discarded += 1;
                    BACKGROUND
                };
                self.window.overwrite_center(resolved);
                resolved
            }
            _ => BACKGROUND,
        };
        Ok(input.with_intensity(value))
    }

    fn latency(&self) -> u32 {
        SlidingWindow::<u8, 3>::RADIUS
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.window.clear();
        self.stats = HysteresisStats::default();
    }

    fn name(&self) -> &'static str {
        "hysteresis"
    }
}
