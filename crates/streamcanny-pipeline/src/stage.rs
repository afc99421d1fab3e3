//! The contract shared by every pipeline stage.

use crate::types::StreamError;

/// One step of the pixel pipeline: consume one element, emit one element.
///
/// Stages are driven in lockstep by [`crate::EdgePipeline`], so every
/// stage sees exactly one input per output and never buffers more than
/// its fixed neighborhood.
pub trait Stage {
    /// Element consumed per step.
    type Input;
    /// Element emitted per step.
    type Output;

    /// Process one element.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when the element's raster flags are
    /// inconsistent with the configured frame dimensions.
    fn process(&mut self, input: Self::Input) -> Result<Self::Output, StreamError>;

    /// Rows (and columns) by which this stage delays its input raster.
    fn latency(&self) -> u32 {
        0
    }

    /// How far from the image border this stage's output is distorted
    /// by missing neighbors.
    fn border_reach(&self) -> u32 {
        0
    }

    /// Drop all buffered state, as if no pixel had been received.
    fn reset(&mut self) {}

    /// Short name used in logs and diagnostics.
    fn name(&self) -> &'static str;
}
