//! Tilemosaic builds a composite image from small captured tiles.
//!
//! Each tile is located inside the growing canvas with zero-mean normalized
//! cross-correlation, the canvas is extended to the right or bottom when the
//! tile runs past its edge, and the tile is merged with one of a closed set
//! of [`MergePolicy`] variants. Only integer translations are considered.
//! Row-parallel matching is available via the `rayon` feature and PNG
//! load/save via `image-io`.

mod candidate;
pub mod canvas;
pub mod engine;
pub mod image;
pub mod kernel;
pub mod matcher;
pub mod merge;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use image::io;

pub use candidate::nms::nms_2d;
pub use candidate::topk::{Peak, TopK};
pub use canvas::{Canvas, Placement};
pub use engine::schedule::{
    CancelToken, Clock, EngineRunner, RunnerHandle, ScheduleReport, Scheduler, SystemClock,
};
pub use engine::{
    CanvasReader, CycleOutcome, EngineState, EngineStats, FrameSink, MosaicConfig, MosaicEngine,
    NullSink, SkipReason, Tile, TileSource,
};
pub use image::{Color, ImageView, PixelBuffer, Rect};
pub use matcher::{CorrelationMatcher, MatchResult, MatcherConfig, PERFECT_MATCH};
pub use merge::MergePolicy;
pub use template::TemplatePlan;
pub use util::{StitchError, StitchResult};
