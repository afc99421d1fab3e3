//! The assembled edge detector: every stage chained in order.
//!
//! [`EdgePipeline`] owns one instance of each stage and drives them in
//! lockstep, one pixel in and one pixel out:
//!
//! ```rust
//! # use streamcanny_pipeline::{EdgeConfig, EdgePipeline, FrameDimensions, StreamError};
//! # use streamcanny_pipeline::frame::gray_frame_to_stream;
//! # fn run() -> Result<(), StreamError> {
//! let image = image::GrayImage::from_fn(16, 16, |x, _| image::Luma([if x < 8 { 0 } else { 255 }]));
//! let dims = FrameDimensions::new(16, 16);
//! let mut pipeline = EdgePipeline::new(dims, EdgeConfig::default())?;
//! let edges = pipeline.run(gray_frame_to_stream(&image))?;
//! assert_eq!(edges.len(), 256);
//! # Ok(())
//! # }
//! ```
//!
//! Output slot `(x, y)` holds the edge decision for image pixel
//! `(x - latency, y - latency)`; the first [`EdgePipeline::margin`] rows
//! and columns of every output frame are blanked.
//!
//! # Threads
//!
//! [`EdgePipeline::run_threaded`] puts every stage on its own scoped
//! thread, connected by bounded channels. Each stage still sees the
//! same elements in the same order, so its output is identical to
//! [`EdgePipeline::run`].

use std::sync::mpsc::{Receiver, sync_channel};
use std::thread::{Scope, ScopedJoinHandle};

use log::{debug, warn};

use crate::border::BorderCorrectionStage;
use crate::diagnostics::{Clock, FrameCounts, FrameDiagnostics, RunDiagnostics};
use crate::gradient::GradientStage;
use crate::hysteresis::HysteresisStage;
use crate::luminance::LuminanceStage;
use crate::smoothing::SmoothingStage;
use crate::stage::Stage;
use crate::suppression::SuppressionStage;
use crate::threshold::ThresholdStage;
use crate::types::{EdgeConfig, FrameDimensions, Pixel, STRONG, StreamError};

/// Capacity of each inter-stage channel in the threaded runner.
pub const CHANNEL_DEPTH: usize = 64;

/// A streaming Canny edge detector for frames of fixed dimensions.
#[derive(Debug, Clone)]
pub struct EdgePipeline {
    dims: FrameDimensions,
    config: EdgeConfig,
    luminance: LuminanceStage,
    smoothing: SmoothingStage,
    gradient: GradientStage,
    suppression: SuppressionStage,
    threshold: ThresholdStage,
    hysteresis: HysteresisStage,
    border: BorderCorrectionStage,
    latency: u32,
    counts: FrameCounts,
    frames_completed: u64,
    completed: Option<FrameCounts>,
}

impl EdgePipeline {
    /// Build the stage chain for frames of `dims`.
    ///
    /// Each windowed stage is told how far its input lags the raw
    /// stream, so it can tell real samples from upstream placeholders.
    /// The border margin is the total lag plus the number of rows and
    /// columns whose values are distorted by cells missing at the frame
    /// edge.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] for zero dimensions or
    /// thresholds that fail [`EdgeConfig::validate`].
    pub fn new(dims: FrameDimensions, config: EdgeConfig) -> Result<Self, StreamError> {
        dims.validate()?;
        config.validate()?;

        let luminance = LuminanceStage::new();
        let smoothing = SmoothingStage::new(dims);
        let mut origin = smoothing.latency();
        let gradient = GradientStage::new(dims, origin, config.angle_strategy);
        origin += gradient.latency();
        let suppression = SuppressionStage::new(dims, origin);
        origin += suppression.latency();
        let threshold = ThresholdStage::new(
            config.low_threshold,
            config.high_threshold,
            config.weak_value,
        );
        origin += threshold.latency();
        let hysteresis = HysteresisStage::new(dims, origin, config.weak_value);
        let latency = origin + hysteresis.latency();

        let reach = smoothing.border_reach()
            + gradient.border_reach()
            + suppression.border_reach()
            + threshold.border_reach()
            + hysteresis.border_reach();
        let margin = latency + reach;
        let border = BorderCorrectionStage::new(dims, margin);

        debug!(
            "edge pipeline {}x{}: strategy={:?} low={} high={} weak={} latency={latency} margin={margin}",
            dims.width,
            dims.height,
            config.angle_strategy,
            config.low_threshold,
            config.high_threshold,
            config.weak_value,
        );

        Ok(Self {
            dims,
            config,
            luminance,
            smoothing,
            gradient,
            suppression,
            threshold,
            hysteresis,
            border,
            latency,
            counts: FrameCounts::default(),
            frames_completed: 0,
            completed: None,
        })
    }

    /// Frame dimensions fixed at construction.
    #[must_use]
    pub const fn dimensions(&self) -> FrameDimensions {
        self.dims
    }

    /// Configuration fixed at construction.
    #[must_use]
    pub const fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Rows and columns by which the output raster trails the input.
    #[must_use]
    pub const fn latency(&self) -> u32 {
        self.latency
    }

    /// Leading rows and columns forced to background in every frame.
    #[must_use]
    pub const fn margin(&self) -> u32 {
        self.border.margin()
    }

    /// Number of frames completed since construction.
    #[must_use]
    pub const fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Whether a frame has started and not yet completed.
    #[must_use]
    pub fn is_mid_frame(&self) -> bool {
        self.border.is_mid_frame()
    }

    /// Push one pixel through every stage.
    ///
    /// # Errors
    ///
    /// Returns the raster error raised by the first stage that detects
    /// inconsistent flags. All stages are then reset, so the stream can
    /// resume at the next `start_of_frame`.
    pub fn process(&mut self, pixel: Pixel) -> Result<Pixel, StreamError> {
        match self.step(pixel) {
            Ok(out) => Ok(out),
            Err(e) => {
                warn!("edge stream fault: {e}");
                self.reset();
                Err(e)
            }
        }
    }

    fn step(&mut self, pixel: Pixel) -> Result<Pixel, StreamError> {
        if pixel.start_of_frame {
            self.counts = FrameCounts::default();
            self.hysteresis.take_stats();
        }

        let p = self.luminance.process(pixel)?;
        let p = self.smoothing.process(p)?;
        let g = self.gradient.process(p)?;
        let p = self.suppression.process(g)?;
        let p = self.threshold.process(p)?;
        self.tally_threshold(p.intensity());
        let p = self.hysteresis.process(p)?;
        let out = self.border.process(p)?;

        self.counts.pixel_count += 1;
        if out.intensity() == STRONG {
            self.counts.edge_pixel_count += 1;
        }
        if out.end_of_row && self.border.frame_complete() {
            self.finish_frame();
        }
        Ok(out)
    }

    fn tally_threshold(&mut self, value: u8) {
        if value == STRONG {
            self.counts.strong_count += 1;
        } else if value == self.config.weak_value {
            self.counts.weak_count += 1;
        }
    }

    fn finish_frame(&mut self) {
        let stats = self.hysteresis.take_stats();
        self.counts.promoted_count = stats.promoted;
        self.counts.discarded_count = stats.discarded;
        debug!(
            "frame {} complete: strong={} weak={} promoted={} discarded={} edges={}",
            self.frames_completed,
            self.counts.strong_count,
            self.counts.weak_count,
            self.counts.promoted_count,
            self.counts.discarded_count,
            self.counts.edge_pixel_count,
        );
        self.completed = Some(self.counts);
        self.frames_completed += 1;
    }

    /// Counts for the frame completed by the most recent pixel, if any.
    ///
    /// Each completed frame is reported once.
    pub fn take_completed_frame(&mut self) -> Option<FrameCounts> {
        self.completed.take()
    }

    /// Process a whole stream of back-to-back frames.
    ///
    /// # Errors
    ///
    /// - [`StreamError::EmptyStream`] if `input` yields nothing.
    /// - [`StreamError::TruncatedFrame`] if the stream stops mid-frame.
    /// - Any raster error from [`process`](Self::process).
    pub fn run<I>(&mut self, input: I) -> Result<Vec<Pixel>, StreamError>
    where
        I: IntoIterator<Item = Pixel>,
    {
        let output = input
            .into_iter()
            .map(|pixel| self.process(pixel))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_end(&output)?;
        Ok(output)
    }

    /// Like [`run`](Self::run), also timing each frame with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_diagnostics<I, C>(
        &mut self,
        input: I,
        clock: &C,
    ) -> Result<(Vec<Pixel>, RunDiagnostics), StreamError>
    where
        I: IntoIterator<Item = Pixel>,
        C: Clock,
    {
        let run_start = clock.now();
        let mut frame_start = clock.now();
        let mut frames = Vec::new();
        let mut output = Vec::new();

        for pixel in input {
            if pixel.start_of_frame {
                frame_start = clock.now();
            }
            output.push(self.process(pixel)?);
            if let Some(counts) = self.take_completed_frame() {
                frames.push(FrameDiagnostics {
                    index: self.frames_completed - 1,
                    counts,
                    duration: clock.elapsed(&frame_start),
                });
            }
        }
        self.check_end(&output)?;

        let diagnostics = RunDiagnostics {
            dimensions: self.dims,
            config: self.config,
            latency: self.latency,
            margin: self.margin(),
            frames,
            total_duration: clock.elapsed(&run_start),
        };
        Ok((output, diagnostics))
    }

    /// Process a stream with every stage on its own thread.
    ///
    /// Stages are connected by bounded channels of [`CHANNEL_DEPTH`]
    /// elements. Per-frame counts are not collected, but
    /// [`frames_completed`](Self::frames_completed) advances by the
    /// number of frames in the output.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run). When several stages fail, the error
    /// from the earliest stage is returned.
    pub fn run_threaded<I>(&mut self, input: I) -> Result<Vec<Pixel>, StreamError>
    where
        I: IntoIterator<Item = Pixel>,
    {
        let result = std::thread::scope(|scope| {
            let (feed, rx) = sync_channel(CHANNEL_DEPTH);
            let (rx, luminance) = spawn_stage(scope, &mut self.luminance, rx);
            let (rx, smoothing) = spawn_stage(scope, &mut self.smoothing, rx);
            let (rx, gradient) = spawn_stage(scope, &mut self.gradient, rx);
            let (rx, suppression) = spawn_stage(scope, &mut self.suppression, rx);
            let (rx, threshold) = spawn_stage(scope, &mut self.threshold, rx);
            let (rx, hysteresis) = spawn_stage(scope, &mut self.hysteresis, rx);
            let (rx, border) = spawn_stage(scope, &mut self.border, rx);
            let collector = scope.spawn(move || rx.iter().collect::<Vec<Pixel>>());

            for pixel in input {
                if feed.send(pixel).is_err() {
                    break;
                }
            }
            drop(feed);

            let handles = [
                luminance,
                smoothing,
                gradient,
                suppression,
                threshold,
                hysteresis,
                border,
            ];
            let mut first_error = None;
            for handle in handles {
                let outcome = handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
                if let Err(e) = outcome {
                    first_error.get_or_insert(e);
                }
            }
            let output = collector
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            first_error.map_or(Ok(output), Err)
        });

        match result {
            Ok(output) => {
                self.check_end(&output)?;
                let frames = output.iter().filter(|p| p.start_of_frame).count();
                self.frames_completed += frames as u64;
                Ok(output)
            }
            Err(e) => {
                warn!("edge stream fault: {e}");
                self.reset();
                Err(e)
            }
        }
    }

    fn check_end(&mut self, output: &[Pixel]) -> Result<(), StreamError> {
        if output.is_empty() {
            return Err(StreamError::EmptyStream);
        }
        if self.border.is_mid_frame() {
            let err = StreamError::TruncatedFrame {
                rows: self.border.rows_received(),
                height: self.dims.height,
            };
            warn!("edge stream fault: {err}");
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    /// Return every stage to its initial state.
    pub fn reset(&mut self) {
        self.luminance.reset();
        self.smoothing.reset();
        self.gradient.reset();
        self.suppression.reset();
        self.threshold.reset();
        self.hysteresis.reset();
        self.border.reset();
        self.counts = FrameCounts::default();
        self.completed = None;
    }
}

/// Run `stage` on a scoped thread, reading from `rx`.
///
/// The thread stops at the first error, or when either neighbor hangs up.
fn spawn_stage<'scope, 'env, S>(
    scope: &'scope Scope<'scope, 'env>,
    stage: &'scope mut S,
    rx: Receiver<S::Input>,
) -> (
    Receiver<S::Output>,
    ScopedJoinHandle<'scope, Result<(), StreamError>>,
)
where
    S: Stage + Send,
    S::Input: Send + 'scope,
    S::Output: Send + 'scope,
{
    let (tx, out) = sync_channel(CHANNEL_DEPTH);
    let handle = scope.spawn(move || {
        for input in rx {
            let output = stage.process(input).inspect_err(|e| {
                debug!("{} stage stopped: {e}", stage.name());
            })?;
            if tx.send(output).is_err() {
                break;
            }
        }
        Ok(())
    });
    (out, handle)
}
