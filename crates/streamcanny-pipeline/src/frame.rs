//! Adapters between whole images and the pixel stream.
//!
//! The pipeline itself never sees an image: it consumes flagged pixels
//! in raster order. These helpers produce such a stream from an
//! [`RgbaImage`] or [`GrayImage`], and [`FrameSink`] reassembles the
//! output stream into images again.

use image::Luma;
use log::debug;

use crate::types::{FrameDimensions, GrayImage, Pixel, RgbaImage, StreamError};

/// Decode raw image bytes (PNG, JPEG, BMP, WebP) into RGBA.
///
/// # Errors
///
/// Returns [`StreamError::EmptyInput`] if `bytes` is empty.
/// Returns [`StreamError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, StreamError> {
    if bytes.is_empty() {
        return Err(StreamError::EmptyInput);
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Stream an RGBA image as one frame of packed pixels.
///
/// `start_of_frame` is set on the first pixel and `end_of_row` on the
/// last pixel of each row.
pub fn frame_to_stream(image: &RgbaImage) -> impl Iterator<Item = Pixel> + '_ {
    let last = image.width().saturating_sub(1);
    image.enumerate_pixels().map(move |(x, y, p)| {
        let [r, g, b, a] = p.0;
        Pixel::from_rgba(r, g, b, a).with_flags(x == 0 && y == 0, x == last)
    })
}

/// Stream a grayscale image as one frame of opaque gray pixels.
pub fn gray_frame_to_stream(image: &GrayImage) -> impl Iterator<Item = Pixel> + '_ {
    let last = image.width().saturating_sub(1);
    image
        .enumerate_pixels()
        .map(move |(x, y, p)| Pixel::gray(p.0[0]).with_flags(x == 0 && y == 0, x == last))
}

/// Reassembles an output pixel stream into grayscale frames.
///
/// Pixels before the first `start_of_frame` are ignored, as are pixels
/// after a frame completes and before the next one starts. A
/// `start_of_frame` in the middle of a frame abandons the partial frame.
/// The sink follows the configured geometry rather than the
/// `end_of_row` flags; rows whose last pixel lacks the flag are counted.
#[derive(Debug, Clone)]
pub struct FrameSink {
    dims: FrameDimensions,
    skip: usize,
    current: Option<GrayImage>,
    x: u32,
    y: u32,
    frames: Vec<GrayImage>,
    skipped: usize,
    abandoned: usize,
    missing_end_of_row: u64,
}

impl FrameSink {
    /// Create a sink for frames of `dims`.
    #[must_use]
    pub const fn new(dims: FrameDimensions) -> Self {
        Self {
            dims,
            skip: 0,
            current: None,
            x: 0,
            y: 0,
            frames: Vec::new(),
            skipped: 0,
            abandoned: 0,
            missing_end_of_row: 0,
        }
    }

    /// Discard the first `count` completed frames.
    ///
    /// Useful when the same image is streamed repeatedly and only the
    /// later repetitions are of interest.
    #[must_use]
    pub fn skip_frames(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    /// Accept one output pixel.
    pub fn push(&mut self, pixel: Pixel) {
        if pixel.start_of_frame {
            if self.current.is_some() {
                self.abandoned += 1;
            }
            self.current = Some(GrayImage::new(self.dims.width, self.dims.height));
            self.x = 0;
            self.y = 0;
        }
        let Some(frame) = self.current.as_mut() else {
            return;
        };

        frame.put_pixel(self.x, self.y, Luma([pixel.intensity()]));
        if self.x + 1 < self.dims.width {
            self.x += 1;
            return;
        }

        if !pixel.end_of_row {
            self.missing_end_of_row += 1;
        }
        self.x = 0;
        self.y += 1;
        if self.y == self.dims.height {
            self.complete_frame();
        }
    }

    fn complete_frame(&mut self) {
        let Some(frame) = self.current.take() else {
            return;
        };
        if self.skipped < self.skip {
            self.skipped += 1;
            debug!("frame sink: skipped frame {}", self.skipped);
        } else {
            self.frames.push(frame);
        }
    }

    /// Accept every pixel of `pixels`.
    pub fn extend<I: IntoIterator<Item = Pixel>>(&mut self, pixels: I) {
        for pixel in pixels {
            self.push(pixel);
        }
    }

    /// Frames completed so far, excluding skipped ones.
    #[must_use]
    pub fn frames(&self) -> &[GrayImage] {
        &self.frames
    }

    /// Rows whose last pixel lacked `end_of_row`.
    #[must_use]
    pub const fn missing_end_of_row(&self) -> u64 {
        self.missing_end_of_row
    }

    /// Partial frames dropped because a new frame started.
    #[must_use]
    pub const fn abandoned_frames(&self) -> usize {
        self.abandoned
    }

    /// Consume the sink and return the completed frames.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::TruncatedFrame`] when a frame was started
    /// but not completed.
    pub fn finish(self) -> Result<Vec<GrayImage>, StreamError> {
        if self.current.is_some() {
            return Err(StreamError::TruncatedFrame {
                rows: self.y,
                height: self.dims.height,
            });
        }
        Ok(self.frames)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_rgba(&[]), Err(StreamError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(StreamError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes() {
        let img = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let decoded = decode_rgba(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn stream_flags_follow_raster() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let pixels: Vec<Pixel> = frame_to_stream(&img).collect();
        assert_eq!(pixels.len(), 6);
        assert!(pixels[0].start_of_frame);
        assert!(pixels[1..].iter().all(|p| !p.start_of_frame));
        let eor: Vec<bool> = pixels.iter().map(|p| p.end_of_row).collect();
        assert_eq!(eor, [false, false, true, false, false, true]);
        assert_eq!(pixels[4].channels(), [1, 2, 3, 4]);
    }

    #[test]
    fn gray_stream_is_opaque() {
        let img = GrayImage::from_pixel(2, 1, Luma([42]));
        let pixels: Vec<Pixel> = gray_frame_to_stream(&img).collect();
        assert_eq!(pixels[1].channels(), [42, 42, 42, 255]);
        assert!(pixels[1].end_of_row);
    }

    #[test]
    fn sink_round_trips_a_frame() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x + 4 * y) as u8]));
        let mut sink = FrameSink::new(FrameDimensions::new(4, 3));
        sink.extend(gray_frame_to_stream(&img));
        assert_eq!(sink.missing_end_of_row(), 0);
        assert_eq!(sink.finish().unwrap(), vec![img]);
    }

    #[test]
    fn sink_skips_leading_frames() {
        let a = GrayImage::from_pixel(2, 2, Luma([1]));
        let b = GrayImage::from_pixel(2, 2, Luma([2]));
        let mut sink = FrameSink::new(FrameDimensions::new(2, 2)).skip_frames(1);
        sink.extend(gray_frame_to_stream(&a).chain(gray_frame_to_stream(&b)));
        assert_eq!(sink.finish().unwrap(), vec![b]);
    }

    #[test]
    fn sink_ignores_pixels_before_start_of_frame() {
        let img = GrayImage::from_pixel(2, 2, Luma([9]));
        let mut sink = FrameSink::new(FrameDimensions::new(2, 2));
        sink.push(Pixel::gray(200));
        sink.extend(gray_frame_to_stream(&img));
        assert_eq!(sink.frames(), &[img]);
    }

    #[test]
    fn sink_counts_missing_end_of_row() {
        let mut sink = FrameSink::new(FrameDimensions::new(2, 2));
        sink.push(Pixel::gray(0).with_flags(true, false));
        sink.push(Pixel::gray(0));
        sink.push(Pixel::gray(0));
        sink.push(Pixel::gray(0).with_flags(false, true));
        assert_eq!(sink.missing_end_of_row(), 1);
        assert_eq!(sink.finish().unwrap().len(), 1);
    }

    #[test]
    fn sink_reports_partial_frame() {
        let img = GrayImage::from_pixel(3, 3, Luma([5]));
        let mut sink = FrameSink::new(FrameDimensions::new(3, 3));
        sink.extend(gray_frame_to_stream(&img).take(4));
        assert!(matches!(
            sink.finish(),
            Err(StreamError::TruncatedFrame { rows: 1, height: 3 })
        ));
    }

    #[test]
    fn restart_abandons_partial_frame() {
        let img = GrayImage::from_pixel(2, 2, Luma([5]));
        let mut sink = FrameSink::new(FrameDimensions::new(2, 2));
        let partial = gray_frame_to_stream(&img).take(3);
        sink.extend(partial.chain(gray_frame_to_stream(&img)));
        assert_eq!(sink.abandoned_frames(), 1);
        assert_eq!(sink.finish().unwrap().len(), 1);
    }
}
