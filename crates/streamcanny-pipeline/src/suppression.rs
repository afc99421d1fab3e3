//! Non-maximum suppression along the gradient direction.

use crate::raster::RasterCursor;
use crate::stage::Stage;
use crate::types::{FrameDimensions, GradientPixel, GradientSample, Pixel, StreamError};
use crate::window::{Neighborhood, SlidingWindow};

/// Gradient direction quantised to the four lines through a 3×3 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Around 0°: compare left and right.
    Horizontal,
    /// Around 45°: compare up-right and down-left.
    Diagonal45,
    /// Around 90°: compare up and down.
    Vertical,
    /// Around 135°: compare up-left and down-right.
    Diagonal135,
}

impl Direction {
    /// Bucket an angle in whole degrees.
    ///
    /// Bucket edges sit at 22.5°, 67.5°, 112.5° and 157.5°; comparisons
    /// are done on doubled angles to stay in integers.
    #[must_use]
    pub const fn from_angle(angle: i16) -> Self {
        let doubled = normalize_angle(angle) * 2;
        if doubled < 45 {
            Self::Horizontal
        } else if doubled < 135 {
            Self::Diagonal45
        } else if doubled < 225 {
            Self::Vertical
        } else if doubled < 315 {
            Self::Diagonal135
        } else {
            Self::Horizontal
        }
    }

    /// The two `(d_row, d_col)` neighbors lying along this direction.
    ///
    /// Rows grow downward while gradient angles grow counter-clockwise,
    /// so the 45° line runs through the upper-right cell.
    #[must_use]
    pub const fn neighbor_offsets(self) -> [(i32, i32); 2] {
        match self {
            Self::Horizontal => [(0, -1), (0, 1)],
            Self::Diagonal45 => [(-1, 1), (1, -1)],
            Self::Vertical => [(-1, 0), (1, 0)],
            Self::Diagonal135 => [(-1, -1), (1, 1)],
        }
    }
}

/// Magnitude assumed for a neighbor outside the frame.
pub const MISSING_NEIGHBOR: u16 = 255;

/// Fold an angle in degrees into `[0, 180)`.
#[must_use]
pub const fn normalize_angle(angle: i16) -> i16 {
    angle.rem_euclid(180)
}

/// The centre magnitude, saturated to 8 bits, if it is a local maximum
/// along its gradient direction, else 0.
///
/// Maxima are decided on the full magnitude. A neighbor outside the
/// frame counts as [`MISSING_NEIGHBOR`].
#[must_use]
pub fn suppress(hood: &Neighborhood<'_, GradientSample, 3>) -> u8 {
    let Some(centre) = hood.center() else {
        return 0;
    };
    let [a, b] = Direction::from_angle(centre.angle).neighbor_offsets();
    let neighbor = |(d_row, d_col): (i32, i32)| {
        let sample = hood.get(d_row, d_col);
        sample.map_or(MISSING_NEIGHBOR, |s| s.magnitude)
    };
    if centre.magnitude >= neighbor(a) && centre.magnitude >= neighbor(b) {
        centre.saturated()
    } else {
        0
    }
}

/// Thins gradient ridges to one pixel.
#[derive(Debug, Clone)]
pub struct SuppressionStage {
    cursor: RasterCursor,
    window: SlidingWindow<GradientSample, 3>,
}

impl SuppressionStage {
    /// Create a stage whose input is valid from slot `(origin, origin)`.
    #[must_use]
    pub fn new(dims: FrameDimensions, origin: u32) -> Self {
        Self {
            cursor: RasterCursor::new(dims),
            window: SlidingWindow::new(dims, origin),
        }
    }
}

impl Stage for SuppressionStage {
    type Input = GradientPixel;
    type Output = Pixel;

    fn process(&mut self, input: GradientPixel) -> Result<Pixel, StreamError> {
        let pixel = input.pixel;
        let at = self
            .cursor
            .advance(pixel.start_of_frame, pixel.end_of_row)?;
        let hood = self.window.ingest(input.sample(), at);
        let value = if hood.is_ready() { suppress(&hood) } else { 0 };
        Ok(pixel.with_intensity(value))
    }

    fn latency(&self) -> u32 {
        SlidingWindow::<GradientSample, 3>::RADIUS
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.window.clear();
    }

    fn name(&self) -> &'static str {
        "suppression"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Run a `width`×`height` field of samples through the stage.
    fn run(width: u32, height: u32, field: impl Fn(u32, u32) -> GradientSample) -> Vec<u8> {
        let mut stage = SuppressionStage::new(FrameDimensions::new(width, height), 0);
        let mut out = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let flags = Pixel::default().with_flags(x == 0 && y == 0, x == width - 1);
                let input = GradientPixel::new(flags, field(x, y));
                out.push(stage.process(input).unwrap().intensity());
            }
        }
        out
    }

    const fn sample(magnitude: u16, angle: i16) -> GradientSample {
        GradientSample { magnitude, angle }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(Direction::from_angle(0), Direction::Horizontal);
        assert_eq!(Direction::from_angle(22), Direction::Horizontal);
        assert_eq!(Direction::from_angle(23), Direction::Diagonal45);
        assert_eq!(Direction::from_angle(67), Direction::Diagonal45);
        assert_eq!(Direction::from_angle(68), Direction::Vertical);
        assert_eq!(Direction::from_angle(112), Direction::Vertical);
        assert_eq!(Direction::from_angle(113), Direction::Diagonal135);
        assert_eq!(Direction::from_angle(157), Direction::Diagonal135);
        assert_eq!(Direction::from_angle(158), Direction::Horizontal);
        assert_eq!(Direction::from_angle(180), Direction::Horizontal);
    }

    #[test]
    fn negative_angles_fold_onto_the_same_line() {
        assert_eq!(normalize_angle(-45), 135);
        assert_eq!(normalize_angle(-180), 0);
        assert_eq!(Direction::from_angle(-90), Direction::Vertical);
        assert_eq!(Direction::from_angle(-135), Direction::Diagonal45);
        assert_eq!(Direction::from_angle(99), Direction::Vertical);
    }

    #[test]
    fn ridge_keeps_only_its_crest() {
        // Horizontal gradient with a crest at column 2.
        let profile = [10, 40, 90, 40, 10];
        let out = run(5, 3, |x, _| sample(profile[x as usize], 0));
        // Slot (x + 1, 2) holds row 1 of the field.
        let row: Vec<u8> = (1..5).map(|x| out[2 * 5 + x]).collect();
        assert_eq!(row, vec![0, 0, 90, 0]);
    }

    #[test]
    fn missing_neighbor_counts_as_255() {
        // Slot (1, 1) holds field (0, 0): its left neighbor is missing.
        let out = run(3, 3, |_, _| sample(200, 0));
        assert_eq!(out[3 + 1], 0);
        // Slot (2, 1) holds field (1, 0): both neighbors are present.
        assert_eq!(out[3 + 2], 200);
        let out = run(3, 3, |_, _| sample(255, 0));
        assert_eq!(out[3 + 1], 255);
        let out = run(3, 3, |_, _| sample(1000, 0));
        assert_eq!(out[3 + 1], 255);
    }

    #[test]
    fn saturated_plateau_thins_on_full_magnitude() {
        // Sobel responses across a smoothed 0 to 255 step: every one
        // of them saturates at 8 bits.
        let profile = [284, 592, 592, 288, 60];
        let out = run(5, 3, |x, _| sample(profile[x as usize], 0));
        let row: Vec<u8> = (1..5).map(|x| out[2 * 5 + x]).collect();
        assert_eq!(row, vec![0, 255, 255, 0]);
    }

    #[test]
    fn diagonal_direction_uses_upper_right_neighbor() {
        // A 45° gradient at (1, 1); the up-right cell (2, 0) is larger.
        let field = |x: u32, y: u32| match (x, y) {
            (1, 1) => sample(100, 45),
            (2, 0) => sample(150, 45),
            _ => sample(0, 45),
        };
        let out = run(3, 3, field);
        assert_eq!(out[2 * 3 + 2], 0);

        // The up-left cell does not matter for a 45° gradient.
        let field = |x: u32, y: u32| match (x, y) {
            (1, 1) => sample(100, 45),
            (0, 0) => sample(150, 45),
            _ => sample(0, 45),
        };
        let out = run(3, 3, field);
        assert_eq!(out[2 * 3 + 2], 100);
    }

    #[test]
    fn ties_are_kept() {
        let out = run(3, 3, |_, _| sample(50, 90));
        assert_eq!(out[2 * 3 + 2], 50);
    }
}
