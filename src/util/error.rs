//! Error types for tilemosaic.

use thiserror::Error;

/// Result alias for tilemosaic operations.
pub type StitchResult<T> = std::result::Result<T, StitchError>;

/// Errors that can occur while matching, merging or driving the engine.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StitchError {
    /// Width or height is zero or overflows the address space.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too small for the requested layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region falls outside the image.
    #[error("roi {x},{y} {width}x{height} outside image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Two buffers or colors disagree on channel count.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },
    /// Two buffers that must have identical size do not.
    #[error("dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// The matching key is larger than the canvas in at least one axis.
    #[error("template {tpl_width}x{tpl_height} exceeds canvas {img_width}x{img_height}")]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The clipped overlap between a tile and the canvas is empty.
    #[error("invalid region: {reason}")]
    InvalidRegion { reason: &'static str },
    /// Tile acquisition failed.
    #[error("capture failed: {reason}")]
    CaptureFailure { reason: String },
    /// `start` was called before a canvas exists.
    #[error("engine not initialized")]
    EngineNotInitialized,
    /// The operation is not allowed in the current engine state.
    #[error("operation `{op}` not allowed while {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },
    /// The configuration is inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// Image decode or encode failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}
