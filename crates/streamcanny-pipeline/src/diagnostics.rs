//! Run diagnostics: per-frame timing and edge counts.
//!
//! Every call to [`EdgePipeline::run_with_diagnostics`](crate::EdgePipeline::run_with_diagnostics)
//! collects one [`FrameDiagnostics`] per completed frame alongside the
//! output pixels. The counts are the ones worth watching while tuning
//! thresholds: how many pixels the double threshold marks weak or
//! strong, and what hysteresis does with the weak ones.
//!
//! Timestamps come from a [`Clock`], so callers choose the time source.
//! [`WebClock`] uses the `web-time` crate, which is `performance.now()`
//! on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{EdgeConfig, FrameDimensions};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A source of timestamps.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Pixel counts gathered while one frame streams through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounts {
    /// Pixels received.
    pub pixel_count: u64,
    /// Pixels the double threshold marked strong.
    pub strong_count: u64,
    /// Pixels the double threshold marked weak.
    pub weak_count: u64,
    /// Weak pixels promoted by hysteresis.
    pub promoted_count: u64,
    /// Weak pixels hysteresis dropped.
    pub discarded_count: u64,
    /// Strong pixels in the final, border-corrected output.
    pub edge_pixel_count: u64,
}

/// Diagnostics for one completed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Zero-based position of the frame in the stream.
    pub index: u64,
    /// Counts gathered during the frame.
    pub counts: FrameCounts,
    /// Wall-clock time from the frame's first pixel to its last.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl FrameDiagnostics {
    /// Percentage of output pixels that are edges.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edge_density(&self) -> f64 {
        if self.counts.pixel_count == 0 {
            0.0
        } else {
            self.counts.edge_pixel_count as f64 / self.counts.pixel_count as f64 * 100.0
        }
    }
}

/// Diagnostics collected over a whole stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Frame geometry the pipeline was built for.
    pub dimensions: FrameDimensions,
    /// Configuration in effect.
    pub config: EdgeConfig,
    /// Rows and columns by which output trails input.
    pub latency: u32,
    /// Rows and columns blanked by border correction.
    pub margin: u32,
    /// One entry per completed frame.
    pub frames: Vec<FrameDiagnostics>,
    /// Wall-clock duration of the whole run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunDiagnostics {
    /// Sum of the per-frame counts.
    #[must_use]
    pub fn totals(&self) -> FrameCounts {
        self.frames
            .iter()
            .fold(FrameCounts::default(), |acc, f| FrameCounts {
                pixel_count: acc.pixel_count + f.counts.pixel_count,
                strong_count: acc.strong_count + f.counts.strong_count,
                weak_count: acc.weak_count + f.counts.weak_count,
                promoted_count: acc.promoted_count + f.counts.promoted_count,
                discarded_count: acc.discarded_count + f.counts.discarded_count,
                edge_pixel_count: acc.edge_pixel_count + f.counts.edge_pixel_count,
            })
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Edge Stream Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Frame: {}x{} ({} pixels)",
            self.dimensions.width,
            self.dimensions.height,
            self.dimensions.pixel_count(),
        ));
        lines.push(format!(
            "Strategy: {}  |  low={} high={} weak={}",
            self.config.angle_strategy,
            self.config.low_threshold,
            self.config.high_threshold,
            self.config.weak_value,
        ));
        lines.push(format!(
            "Latency: {} rows/cols  |  Border margin: {}",
            self.latency, self.margin,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<8} {:>10} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "Frame", "Duration", "Strong", "Weak", "Promoted", "Dropped", "Edges"
        ));
        lines.push("-".repeat(70));

        for frame in &self.frames {
            let c = &frame.counts;
            lines.push(format!(
                "{:<8} {:>8.3}ms {:>9} {:>9} {:>9} {:>9} {:>9}",
                frame.index,
                duration_ms(frame.duration),
                c.strong_count,
                c.weak_count,
                c.promoted_count,
                c.discarded_count,
                c.edge_pixel_count,
            ));
        }

        if let Some(last) = self.frames.last() {
            lines.push(String::new());
            lines.push(format!(
                "Frames: {}  |  Last frame edge density: {:.1}%",
                self.frames.len(),
                last.edge_density(),
            ));
        } else {
            lines.push("No complete frames".to_string());
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
