//! Owned contiguous pixel buffer.

use super::{check_channels, Color, ImageView, Rect};
use crate::util::{StitchError, StitchResult};

/// Owned row-major interleaved `u8` image.
///
/// Unlike [`ImageView`], a buffer may have zero area; clipped reads that miss
/// the image entirely produce such an empty buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl PixelBuffer {
    /// Wraps `data` after checking it holds exactly `width * height * channels` samples.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> StitchResult<Self> {
        check_channels(channels)?;
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(StitchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(StitchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(StitchError::InvalidDimensions { width, height });
        }
        Ok(Self::from_parts(data, width, height, channels))
    }

    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Allocates a buffer with every pixel set to `fill`.
    pub fn filled(width: usize, height: usize, fill: Color) -> Self {
        let channels = fill.channels();
        let mut data = Vec::with_capacity(width * height * channels);
        for _ in 0..width * height {
            data.extend_from_slice(fill.as_slice());
        }
        Self::from_parts(data, width, height, channels)
    }

    /// Zero-area buffer with the given channel count.
    pub fn empty(channels: usize) -> Self {
        Self::from_parts(Vec::new(), 0, 0, channels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw interleaved samples in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the samples of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }

    /// Overwrites pixel `(x, y)`; returns `false` when out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) -> bool {
        if x >= self.width || y >= self.height || color.channels() != self.channels {
            return false;
        }
        let start = (y * self.width + x) * self.channels;
        self.data[start..start + self.channels].copy_from_slice(color.as_slice());
        true
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let len = self.width * self.channels;
        self.data.get(y * len..(y + 1) * len)
    }

    pub(crate) fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let len = self.width * self.channels;
        self.data.get_mut(y * len..(y + 1) * len)
    }

    /// Borrowed view of the whole buffer; fails for empty buffers.
    pub fn view(&self) -> StitchResult<ImageView<'_>> {
        ImageView::from_slice(&self.data, self.width, self.height, self.channels)
    }

    /// Copies `rect` out of the buffer. The rectangle must lie inside the image.
    pub fn crop(&self, rect: Rect) -> StitchResult<PixelBuffer> {
        Ok(self.view()?.roi(rect)?.to_buffer())
    }

    /// Copies `src` into this buffer at `(x, y)`. The target area must lie inside.
    pub(crate) fn blit(&mut self, src: &PixelBuffer, x: usize, y: usize) -> StitchResult<()> {
        if src.channels != self.channels {
            return Err(StitchError::ChannelMismatch {
                expected: self.channels,
                got: src.channels,
            });
        }
        if x + src.width > self.width || y + src.height > self.height {
            return Err(StitchError::RoiOutOfBounds {
                x,
                y,
                width: src.width,
                height: src.height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let channels = self.channels;
        for sy in 0..src.height {
            let (Some(src_row), Some(dst_row)) = (src.row(sy), self.row_mut(y + sy)) else {
                continue;
            };
            dst_row[x * channels..(x + src.width) * channels].copy_from_slice(src_row);
        }
        Ok(())
    }
}
