//! Seams between the engine and its collaborators.
//!
//! Tiles come in through [`TileSource`]; updated canvases go out through
//! [`FrameSink`]. Readers on other threads use a [`CanvasReader`], which hands
//! out the most recently published canvas under a short lock.

use crate::canvas::Canvas;
use crate::image::{PixelBuffer, Rect};
use crate::util::StitchResult;
use std::sync::{Arc, Mutex, PoisonError};

/// A captured tile plus an optional matching crop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub pixels: PixelBuffer,
    /// Crop inside the tile used for correlation; its top-left corner is the
    /// offset subtracted from the match location.
    pub sub_region: Option<Rect>,
}

impl Tile {
    pub fn new(pixels: PixelBuffer) -> Self {
        Self {
            pixels,
            sub_region: None,
        }
    }

    pub fn with_sub_region(mut self, rect: Rect) -> Self {
        self.sub_region = Some(rect);
        self
    }
}

/// Produces tiles on demand.
pub trait TileSource {
    /// Captures the next tile.
    ///
    /// `Ok(None)` means the source is exhausted; any error is treated by the
    /// engine as a skipped cycle.
    fn capture_tile(&mut self) -> StitchResult<Option<Tile>>;
}

impl<F> TileSource for F
where
    F: FnMut() -> StitchResult<Option<Tile>>,
{
    fn capture_tile(&mut self) -> StitchResult<Option<Tile>> {
        self()
    }
}

/// Receives the canvas after every cycle that changed it.
pub trait FrameSink {
    fn on_frame_updated(&mut self, canvas: Arc<Canvas>);
}

impl<F> FrameSink for F
where
    F: FnMut(Arc<Canvas>),
{
    fn on_frame_updated(&mut self, canvas: Arc<Canvas>) {
        self(canvas)
    }
}

/// Sink that drops every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_frame_updated(&mut self, _canvas: Arc<Canvas>) {}
}

/// Cloneable handle to the latest published canvas.
#[derive(Clone, Debug, Default)]
pub struct CanvasReader {
    slot: Arc<Mutex<Option<Arc<Canvas>>>>,
}

impl CanvasReader {
    /// Returns the latest published canvas, if any.
    pub fn latest(&self) -> Option<Arc<Canvas>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, canvas: Arc<Canvas>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(canvas);
    }
}
