//! Double thresholding into background, weak and strong pixels.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;
use crate::types::{BACKGROUND, Pixel, STRONG, StreamError};

/// Classification of a suppressed gradient magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeClass {
    /// Below the low threshold.
    Background,
    /// Between the thresholds; kept only if connected to a strong pixel.
    Weak,
    /// At or above the high threshold.
    Strong,
}

/// Classify `value` against the `[low, high)` weak band.
#[must_use]
pub const fn classify(value: u8, low: u8, high: u8) -> EdgeClass {
    if value >= high {
        EdgeClass::Strong
    } else if value >= low {
        EdgeClass::Weak
    } else {
        EdgeClass::Background
    }
}

/// Stateless stage mapping magnitudes to `0`, the weak marker, or `255`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdStage {
    low: u8,
    high: u8,
    weak: u8,
}

impl ThresholdStage {
    /// Create the stage. Thresholds are assumed already validated.
    #[must_use]
    pub const fn new(low: u8, high: u8, weak: u8) -> Self {
        Self { low, high, weak }
    }

    /// Marker intensity for a given class.
    #[must_use]
    pub const fn marker(&self, class: EdgeClass) -> u8 {
        match class {
            EdgeClass::Background => BACKGROUND,
            EdgeClass::Weak => self.weak,
            EdgeClass::Strong => STRONG,
        }
    }
}

impl Stage for ThresholdStage {
    type Input = Pixel;
    type Output = Pixel;

    fn process(&mut self, input: Pixel) -> Result<Pixel, StreamError> {
        let class = classify(input.intensity(), self.low, self.high);
        Ok(input.with_intensity(self.marker(class)))
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}
