//! Raster bookkeeping: turn a flagged pixel sequence into frame coordinates.
//!
//! Every stateful stage owns a [`RasterCursor`]. The cursor resets on
//! `start_of_frame`, advances one column per pixel, and wraps to the next
//! row on `end_of_row`. It cross-checks the flags against the configured
//! frame dimensions and fails at the first inconsistency instead of
//! letting row/column counters drift.

use crate::types::{Coordinate, FrameDimensions, StreamError};

/// Where a cursor stands relative to the frame it is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// No frame has started yet.
    Idle,
    /// A frame is partially received.
    InFrame,
    /// The last pixel of the frame has been received.
    Complete,
    /// A raster error occurred; only `start_of_frame` can recover.
    Faulted,
}

/// Tracks the `(x, y)` position of the pixel currently being processed.
#[derive(Debug, Clone)]
pub struct RasterCursor {
    dims: FrameDimensions,
    x: u32,
    y: u32,
    state: CursorState,
}

impl RasterCursor {
    /// Create a cursor for frames of the given dimensions.
    #[must_use]
    pub const fn new(dims: FrameDimensions) -> Self {
        Self {
            dims,
            x: 0,
            y: 0,
            state: CursorState::Idle,
        }
    }

    /// Frame dimensions this cursor validates against.
    #[must_use]
    pub const fn dimensions(&self) -> FrameDimensions {
        self.dims
    }

    /// Number of complete rows received for the current frame.
    #[must_use]
    pub const fn rows_received(&self) -> u32 {
        self.y
    }

    /// Whether a frame has been opened and not yet completed.
    #[must_use]
    pub fn is_mid_frame(&self) -> bool {
        self.state == CursorState::InFrame
    }

    /// Whether the last frame was received in full.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == CursorState::Complete
    }

    /// Forget any frame in progress.
    pub fn reset(&mut self) {
        self.x = 0;
        self.y = 0;
        self.state = CursorState::Idle;
    }

    /// Account for one pixel and return its coordinate.
    ///
    /// # Errors
    ///
    /// - [`StreamError::FrameInterrupted`] when `start_of_frame` arrives
    ///   mid-frame.
    /// - [`StreamError::MissingStartOfFrame`] when a pixel arrives with no
    ///   frame open.
    /// - [`StreamError::RowLengthMismatch`] / [`StreamError::MissingEndOfRow`]
    ///   when `end_of_row` disagrees with the configured width.
    ///
    /// After an error the cursor is faulted until the next
    /// `start_of_frame`.
    pub fn advance(
        &mut self,
        start_of_frame: bool,
        end_of_row: bool,
    ) -> Result<Coordinate, StreamError> {
        if start_of_frame {
            if self.state == CursorState::InFrame {
                let err = StreamError::FrameInterrupted {
                    row: self.y,
                    column: self.x,
                };
                self.state = CursorState::Faulted;
                return Err(err);
            }
            self.x = 0;
            self.y = 0;
            self.state = CursorState::InFrame;
        } else if self.state != CursorState::InFrame {
            self.state = CursorState::Faulted;
            return Err(StreamError::MissingStartOfFrame);
        }

        let at = Coordinate::new(self.x, self.y);
        let last_column = self.dims.width.saturating_sub(1);

        if end_of_row && at.x != last_column {
            self.state = CursorState::Faulted;
            return Err(StreamError::RowLengthMismatch {
                row: at.y,
                column: at.x,
                width: self.dims.width,
            });
        }
        if !end_of_row && at.x == last_column {
            self.state = CursorState::Faulted;
            return Err(StreamError::MissingEndOfRow {
                row: at.y,
                width: self.dims.width,
            });
        }

        if end_of_row {
            self.x = 0;
            self.y += 1;
            if self.y == self.dims.height {
                self.state = CursorState::Complete;
            }
        } else {
            self.x += 1;
        }

        Ok(at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Feed one full, well-formed frame and collect the coordinates.
    fn walk_frame(cursor: &mut RasterCursor) -> Vec<Coordinate> {
        let dims = cursor.dimensions();
        let mut out = Vec::new();
        for y in 0..dims.height {
            for x in 0..dims.width {
                let sof = x == 0 && y == 0;
                let eor = x == dims.width - 1;
                out.push(cursor.advance(sof, eor).unwrap());
            }
        }
        out
    }

    #[test]
    fn coordinates_follow_raster_order() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(3, 2));
        let coords = walk_frame(&mut cursor);
        let expected: Vec<Coordinate> = [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]
            .iter()
            .map(|&(x, y)| Coordinate::new(x, y))
            .collect();
        assert_eq!(coords, expected);
        assert!(cursor.is_complete());
    }

    #[test]
    fn start_of_frame_after_complete_frame_restarts_at_origin() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 2));
        walk_frame(&mut cursor);
        let first = walk_frame(&mut cursor);
        assert_eq!(first[0], Coordinate::new(0, 0));
        assert!(cursor.is_complete());
    }

    #[test]
    fn pixel_without_start_of_frame_is_rejected() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 2));
        let result = cursor.advance(false, false);
        assert!(matches!(result, Err(StreamError::MissingStartOfFrame)));
    }

    #[test]
    fn pixel_after_complete_frame_without_start_is_rejected() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 1));
        walk_frame(&mut cursor);
        let result = cursor.advance(false, false);
        assert!(matches!(result, Err(StreamError::MissingStartOfFrame)));
    }

    #[test]
    fn early_end_of_row_is_rejected() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(4, 2));
        cursor.advance(true, false).unwrap();
        let result = cursor.advance(false, true);
        assert!(matches!(
            result,
            Err(StreamError::RowLengthMismatch {
                row: 0,
                column: 1,
                width: 4
            })
        ));
    }

    #[test]
    fn missing_end_of_row_is_rejected() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 2));
        cursor.advance(true, false).unwrap();
        let result = cursor.advance(false, false);
        assert!(matches!(
            result,
            Err(StreamError::MissingEndOfRow { row: 0, width: 2 })
        ));
    }

    #[test]
    fn start_of_frame_mid_frame_is_rejected() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(3, 3));
        cursor.advance(true, false).unwrap();
        cursor.advance(false, false).unwrap();
        let result = cursor.advance(true, false);
        assert!(matches!(
            result,
            Err(StreamError::FrameInterrupted { row: 0, column: 2 })
        ));
    }

    #[test]
    fn faulted_cursor_recovers_on_start_of_frame() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 1));
        assert!(cursor.advance(false, false).is_err());
        assert!(cursor.advance(false, true).is_err());
        assert_eq!(cursor.advance(true, false).unwrap(), Coordinate::new(0, 0));
    }

    #[test]
    fn single_column_frame_needs_end_of_row_on_every_pixel() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(1, 3));
        assert_eq!(cursor.advance(true, true).unwrap(), Coordinate::new(0, 0));
        assert_eq!(cursor.advance(false, true).unwrap(), Coordinate::new(0, 1));
        assert_eq!(cursor.advance(false, true).unwrap(), Coordinate::new(0, 2));
        assert!(cursor.is_complete());
    }

    #[test]
    fn mid_frame_state_is_reported() {
        let mut cursor = RasterCursor::new(FrameDimensions::new(2, 2));
        assert!(!cursor.is_mid_frame());
        cursor.advance(true, false).unwrap();
        assert!(cursor.is_mid_frame());
        cursor.advance(false, true).unwrap();
        assert_eq!(cursor.rows_received(), 1);
    }
}
