//! Growable composite canvas.
//!
//! The canvas origin is fixed at its top-left corner; growth only ever adds
//! columns on the right and rows at the bottom. Growing allocates a fresh
//! buffer, leaving the previous one untouched for readers that still hold it.
//! Reads and writes take signed anchors and are clipped to the current bounds.

use crate::image::{Color, ImageView, PixelBuffer, Rect};
use crate::util::{StitchError, StitchResult};
use std::sync::Arc;

/// Overlap between a placed region and the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Overlap in canvas coordinates.
    pub canvas: Rect,
    /// The same overlap in the placed region's own coordinates.
    pub source: Rect,
}

/// Composite image with a background (sentinel) color for unpainted area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    pixels: PixelBuffer,
    background: Color,
}

impl Canvas {
    /// Allocates a `width x height` canvas filled with `background`.
    pub fn new(width: usize, height: usize, background: Color) -> Self {
        Self {
            pixels: PixelBuffer::filled(width, height, background),
            background,
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    pub fn channels(&self) -> usize {
        self.pixels.channels()
    }

    /// The sentinel color marking unpainted pixels.
    pub fn background(&self) -> Color {
        self.background
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn into_pixels(self) -> PixelBuffer {
        self.pixels
    }

    pub fn view(&self) -> StitchResult<ImageView<'_>> {
        self.pixels.view()
    }

    /// True if the canvas already spans `width x height` from its origin.
    pub fn covers(&self, width: usize, height: usize) -> bool {
        self.width() >= width && self.height() >= height
    }

    /// Returns a copy with `tile` copied into the exact center.
    ///
    /// Odd remainders round toward the top-left. A tile larger than the
    /// canvas first grows the copy to fit it.
    pub fn center_place(&self, tile: &PixelBuffer) -> StitchResult<Canvas> {
        self.check_channels(tile.channels())?;
        let mut out = self
            .expanded(tile.width(), tile.height())
            .unwrap_or_else(|| self.clone());
        let x = (out.width() - tile.width()) / 2;
        let y = (out.height() - tile.height()) / 2;
        out.pixels.blit(tile, x, y)?;
        Ok(out)
    }

    /// Grows the canvas to at least `width x height`.
    ///
    /// Returns the same `Arc` when no growth is needed. Otherwise a new buffer
    /// is filled with the background and the old content copied to the origin.
    pub fn expand(self: &Arc<Self>, width: usize, height: usize) -> Arc<Canvas> {
        match self.expanded(width, height) {
            Some(grown) => Arc::new(grown),
            None => Arc::clone(self),
        }
    }

    fn expanded(&self, width: usize, height: usize) -> Option<Canvas> {
        if self.covers(width, height) {
            return None;
        }
        let new_width = self.width().max(width);
        let new_height = self.height().max(height);
        let mut pixels = PixelBuffer::filled(new_width, new_height, self.background);
        // Same channel count and strictly larger bounds, so the copy cannot fail.
        pixels.blit(&self.pixels, 0, 0).ok()?;
        Some(Canvas {
            pixels,
            background: self.background,
        })
    }

    /// Clips a `width x height` region anchored at `(x, y)` to the canvas.
    pub fn clip(&self, x: i64, y: i64, width: usize, height: usize) -> Option<Placement> {
        let (cx, sx, w) = clip_axis(x, width, self.width())?;
        let (cy, sy, h) = clip_axis(y, height, self.height())?;
        Some(Placement {
            canvas: Rect::new(cx, cy, w, h),
            source: Rect::new(sx, sy, w, h),
        })
    }

    /// Writes `region` at `(x, y)`, dropping pixels outside the canvas.
    ///
    /// Never resizes; returns the number of pixels written.
    pub fn write_region(&mut self, x: i64, y: i64, region: &PixelBuffer) -> StitchResult<usize> {
        self.check_channels(region.channels())?;
        let Some(placement) = self.clip(x, y, region.width(), region.height()) else {
            return Ok(0);
        };
        let visible = if placement.source == Rect::new(0, 0, region.width(), region.height()) {
            region.clone()
        } else {
            region.crop(placement.source)?
        };
        self.pixels
            .blit(&visible, placement.canvas.x, placement.canvas.y)?;
        Ok(placement.canvas.area())
    }

    /// Copies the part of `width x height` at `(x, y)` that lies inside the canvas.
    ///
    /// A region entirely outside yields an empty buffer.
    pub fn read_region(&self, x: i64, y: i64, width: usize, height: usize) -> PixelBuffer {
        match self.clip(x, y, width, height) {
            Some(placement) => self
                .pixels
                .crop(placement.canvas)
                .unwrap_or_else(|_| PixelBuffer::empty(self.channels())),
            None => PixelBuffer::empty(self.channels()),
        }
    }

    fn check_channels(&self, got: usize) -> StitchResult<()> {
        if got != self.channels() {
            return Err(StitchError::ChannelMismatch {
                expected: self.channels(),
                got,
            });
        }
        Ok(())
    }
}

/// Returns `(canvas_start, source_start, len)` of a 1D overlap.
fn clip_axis(start: i64, len: usize, bound: usize) -> Option<(usize, usize, usize)> {
    let end = start.checked_add(i64::try_from(len).ok()?)?;
    let lo = start.max(0);
    let hi = end.min(i64::try_from(bound).ok()?);
    if hi <= lo {
        return None;
    }
    Some((lo as usize, (lo - start) as usize, (hi - lo) as usize))
}
