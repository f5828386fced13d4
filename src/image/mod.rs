//! Pixel buffers, views and geometry helpers.
//!
//! `ImageView` is a borrowed 2D view into an interleaved `u8` buffer with an
//! explicit stride. The stride counts pixels (not samples) between the starts
//! of consecutive rows, so a stride larger than the width represents padded
//! rows. ROI slices are zero-copy views into the same backing slice and retain
//! the original stride.

use crate::util::{StitchError, StitchResult};

mod buffer;
#[cfg(feature = "image-io")]
pub mod io;

pub use buffer::PixelBuffer;

/// Largest supported number of interleaved channels per pixel.
pub const MAX_CHANNELS: usize = 4;

pub(crate) fn check_channels(channels: usize) -> StitchResult<()> {
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(StitchError::InvalidConfig("channel count must be 1..=4"));
    }
    Ok(())
}

/// A single pixel value with 1 to 4 channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    samples: [u8; MAX_CHANNELS],
    channels: usize,
}

impl Color {
    /// Opaque white in three channels.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Black in three channels.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Builds a color from a slice of 1 to 4 samples.
    pub fn new(samples: &[u8]) -> StitchResult<Self> {
        check_channels(samples.len())?;
        let mut out = [0u8; MAX_CHANNELS];
        out[..samples.len()].copy_from_slice(samples);
        Ok(Self {
            samples: out,
            channels: samples.len(),
        })
    }

    /// Single-channel color.
    pub const fn gray(v: u8) -> Self {
        Self {
            samples: [v, 0, 0, 0],
            channels: 1,
        }
    }

    /// Three-channel color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            samples: [r, g, b, 0],
            channels: 3,
        }
    }

    /// Four-channel color.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            samples: [r, g, b, a],
            channels: 4,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples of this color, one per channel.
    pub fn as_slice(&self) -> &[u8] {
        &self.samples[..self.channels]
    }

    pub(crate) fn matches(&self, pixel: &[u8]) -> bool {
        self.as_slice() == pixel
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> usize {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> usize {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the overlap of two rectangles, or `None` if it has no area.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Borrowed interleaved image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> ImageView<'a> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> StitchResult<Self> {
        Self::new(data, width, height, width, channels)
    }

    /// Creates a view with an explicit stride in pixels.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> StitchResult<Self> {
        check_channels(channels)?;
        let needed = required_len(width, height, stride, channels)?;
        if data.len() < needed {
            return Err(StitchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in pixels between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the samples of pixel `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x)?
            .checked_mul(self.channels)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns the samples of row `y`, `width * channels` long.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?.checked_mul(self.channels)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, rect: Rect) -> StitchResult<ImageView<'a>> {
        let Rect {
            x,
            y,
            width,
            height,
        } = rect;
        if rect.is_empty() {
            return Err(StitchError::InvalidDimensions { width, height });
        }
        let out_of_bounds = StitchError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = (y * self.stride + x) * self.channels;
        let data = self
            .data
            .get(start..)
            .ok_or(StitchError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride, self.channels)
    }

    /// Copies the view into a contiguous owned buffer.
    pub fn to_buffer(&self) -> PixelBuffer {
        let mut data = Vec::with_capacity(self.width * self.height * self.channels);
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                data.extend_from_slice(row);
            }
        }
        PixelBuffer::from_parts(data, self.width, self.height, self.channels)
    }
}

fn required_len(
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
) -> StitchResult<usize> {
    if width == 0 || height == 0 {
        return Err(StitchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(StitchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .and_then(|v| v.checked_mul(channels))
        .ok_or(StitchError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::{Color, ImageView, Rect};

    #[test]
    fn rect_intersection_clips_to_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(6, 8, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(6, 8, 4, 2)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 3, 3)), None);
    }

    #[test]
    fn color_rejects_too_many_channels() {
        assert!(Color::new(&[1, 2, 3, 4, 5]).is_err());
        assert!(Color::new(&[]).is_err());
        assert_eq!(Color::new(&[1, 2, 3]).unwrap(), Color::rgb(1, 2, 3));
    }

    #[test]
    fn roi_rows_respect_channels_and_stride() {
        // 3x2 RGB image with a stride of 4 pixels.
        let data: Vec<u8> = (0u8..24).collect();
        let view = ImageView::new(&data, 3, 2, 4, 3).unwrap();
        assert_eq!(view.row(1).unwrap(), &[12u8, 13, 14, 15, 16, 17, 18, 19, 20]);

        let roi = view.roi(Rect::new(1, 1, 2, 1)).unwrap();
        assert_eq!(roi.row(0).unwrap(), &[15u8, 16, 17, 18, 19, 20]);
        assert_eq!(roi.get(1, 0).unwrap(), &[18u8, 19, 20]);
        assert!(roi.get(2, 0).is_none());
        assert_eq!(roi.to_buffer().data(), &[15u8, 16, 17, 18, 19, 20]);
    }
}
