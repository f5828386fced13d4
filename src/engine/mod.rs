//! Mosaic engine: locate each tile on the canvas and merge it in.
//!
//! The engine owns the canvas and is its only writer. One cycle captures a
//! tile, matches its key (sub-region or whole tile) against the canvas,
//! subtracts the sub-region offset to get the anchor, grows the canvas if the
//! footprint runs past the right or bottom edge, merges and publishes.
//! Nothing that goes wrong inside a cycle escapes it: every failure becomes a
//! logged [`SkipReason`] and the canvas stays as it was.

mod config;
mod io;
pub mod schedule;

pub use config::MosaicConfig;
pub use io::{CanvasReader, FrameSink, NullSink, Tile, TileSource};

use crate::canvas::Canvas;
use crate::image::{ImageView, PixelBuffer, Rect};
use crate::matcher::CorrelationMatcher;
use crate::merge::MergePolicy;
use crate::trace::{trace_debug, trace_error, trace_event, trace_span, trace_warn};
use crate::util::{StitchError, StitchResult};
use std::sync::Arc;

/// Lifecycle of a [`MosaicEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::Running => "running",
            EngineState::Stopped => "stopped",
        }
    }
}

/// Why a cycle left the canvas unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// The tile source failed.
    CaptureFailure(String),
    /// Best match scored below the threshold.
    LowConfidence { score: f32 },
    /// The sub-region or tile footprint has no area after clipping.
    InvalidRegion(&'static str),
    /// The matching key is larger than the canvas.
    TemplateTooLarge,
    /// Any other error raised while matching or merging.
    Failed(String),
}

/// Result of one engine cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// The tile was merged at `anchor`; `changed` is false when the merge
    /// reproduced the existing pixels and the canvas did not grow.
    Merged {
        anchor: (i64, i64),
        score: f32,
        grew: bool,
        changed: bool,
    },
    Skipped(SkipReason),
    /// The tile source has no more tiles.
    Exhausted,
    /// The engine is not running; nothing was attempted.
    Halted,
}

/// Running totals since the engine was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub cycles: u64,
    pub merges: u64,
    pub growths: u64,
    pub capture_failures: u64,
    pub low_confidence: u64,
    pub invalid_regions: u64,
    pub failures: u64,
}

/// Incremental mosaic builder.
pub struct MosaicEngine {
    config: MosaicConfig,
    matcher: CorrelationMatcher,
    state: EngineState,
    canvas: Option<Arc<Canvas>>,
    reader: CanvasReader,
    stats: EngineStats,
}

impl MosaicEngine {
    /// Creates an uninitialized engine after validating `config`.
    pub fn new(config: MosaicConfig) -> StitchResult<Self> {
        config.validate()?;
        Ok(Self {
            matcher: CorrelationMatcher::new(config.matcher),
            config,
            state: EngineState::Uninitialized,
            canvas: None,
            reader: CanvasReader::default(),
            stats: EngineStats::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Handle for readers on other threads.
    pub fn reader(&self) -> CanvasReader {
        self.reader.clone()
    }

    /// The current canvas, shared with any reader that already holds it.
    pub fn canvas(&self) -> Option<Arc<Canvas>> {
        self.canvas.clone()
    }

    /// Creates the canvas and centers `first_tile` into it.
    pub fn initialize(&mut self, first_tile: &Tile) -> StitchResult<()> {
        if self.state == EngineState::Running {
            return Err(self.invalid_state("initialize"));
        }
        let blank = Canvas::new(
            self.config.canvas_width,
            self.config.canvas_height,
            self.config.background,
        );
        let canvas = Arc::new(blank.center_place(&first_tile.pixels)?);
        trace_event!(
            "canvas_initialized",
            width = canvas.width(),
            height = canvas.height(),
            tile_w = first_tile.pixels.width(),
            tile_h = first_tile.pixels.height()
        );
        self.commit(canvas);
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Enters `Running`. Requires a canvas.
    pub fn start(&mut self) -> StitchResult<()> {
        if self.canvas.is_none() {
            return Err(StitchError::EngineNotInitialized);
        }
        self.state = EngineState::Running;
        trace_event!("engine_started", cycles = self.stats.cycles);
        Ok(())
    }

    /// Leaves `Running`. Cycles are atomic, so there is never a partial merge to undo.
    pub fn stop(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Stopped;
            trace_event!("engine_stopped", cycles = self.stats.cycles);
        }
    }

    /// Swaps the merge policy between runs.
    pub fn reconfigure_merge(&mut self, policy: MergePolicy) -> StitchResult<()> {
        if self.state == EngineState::Running {
            return Err(self.invalid_state("reconfigure_merge"));
        }
        self.config.check_merge(&policy)?;
        self.config.merge = policy;
        Ok(())
    }

    /// Copy of the current canvas pixels for external encoding.
    pub fn save_snapshot(&self) -> StitchResult<PixelBuffer> {
        self.canvas
            .as_ref()
            .map(|canvas| canvas.pixels().clone())
            .ok_or(StitchError::EngineNotInitialized)
    }

    /// Captures one tile from `source` and processes it.
    pub fn run_cycle(
        &mut self,
        source: &mut dyn TileSource,
        sink: &mut dyn FrameSink,
    ) -> CycleOutcome {
        if self.state != EngineState::Running {
            return CycleOutcome::Halted;
        }
        match source.capture_tile() {
            Ok(Some(tile)) => self.process_tile(&tile, sink),
            Ok(None) => CycleOutcome::Exhausted,
            Err(err) => {
                self.stats.cycles += 1;
                self.stats.capture_failures += 1;
                let reason = err.to_string();
                trace_warn!("capture_failed", reason = reason.as_str());
                CycleOutcome::Skipped(SkipReason::CaptureFailure(reason))
            }
        }
    }

    /// Processes an already captured tile as one cycle.
    pub fn process_tile(&mut self, tile: &Tile, sink: &mut dyn FrameSink) -> CycleOutcome {
        if self.state != EngineState::Running {
            return CycleOutcome::Halted;
        }
        self.stats.cycles += 1;
        let _span = trace_span!("cycle", index = self.stats.cycles).entered();

        match self.merge_tile(tile) {
            Ok(Merge::Applied {
                canvas,
                anchor,
                score,
                grew,
                changed,
            }) => {
                self.stats.merges += 1;
                if grew {
                    self.stats.growths += 1;
                }
                if changed {
                    self.commit(Arc::clone(&canvas));
                    sink.on_frame_updated(canvas);
                }
                trace_event!(
                    "tile_merged",
                    x = anchor.0,
                    y = anchor.1,
                    score = score,
                    grew = grew,
                    changed = changed
                );
                CycleOutcome::Merged {
                    anchor,
                    score,
                    grew,
                    changed,
                }
            }
            Ok(Merge::LowConfidence { score }) => {
                self.stats.low_confidence += 1;
                trace_event!(
                    "low_confidence",
                    score = score,
                    threshold = self.config.threshold
                );
                CycleOutcome::Skipped(SkipReason::LowConfidence { score })
            }
            Err(StitchError::InvalidRegion { reason }) => {
                self.stats.invalid_regions += 1;
                trace_warn!("invalid_region", reason = reason);
                CycleOutcome::Skipped(SkipReason::InvalidRegion(reason))
            }
            Err(err @ StitchError::TemplateTooLarge { .. }) => {
                self.stats.failures += 1;
                let reason = err.to_string();
                trace_error!("template_too_large", reason = reason.as_str());
                CycleOutcome::Skipped(SkipReason::TemplateTooLarge)
            }
            Err(err) => {
                self.stats.failures += 1;
                let reason = err.to_string();
                trace_error!("cycle_failed", reason = reason.as_str());
                CycleOutcome::Skipped(SkipReason::Failed(reason))
            }
        }
    }

    /// Matches, grows and merges on a private copy; `self.canvas` is left alone.
    fn merge_tile(&self, tile: &Tile) -> StitchResult<Merge> {
        let current = self
            .canvas
            .as_ref()
            .ok_or(StitchError::EngineNotInitialized)?;
        if tile.pixels.channels() != current.channels() {
            return Err(StitchError::ChannelMismatch {
                expected: current.channels(),
                got: tile.pixels.channels(),
            });
        }

        let tile_view = tile.pixels.view().map_err(|_| StitchError::InvalidRegion {
            reason: "empty tile",
        })?;
        let (key, offset) = self.matching_key(tile, tile_view)?;
        let result = self.matcher.match_template(current.view()?, key)?;
        if !result.is_actionable(self.config.threshold) {
            return Ok(Merge::LowConfidence {
                score: result.confidence,
            });
        }

        let anchor = (
            result.x as i64 - offset.0 as i64,
            result.y as i64 - offset.1 as i64,
        );
        let (tile_w, tile_h) = tile.pixels.dims();
        let required_w = (anchor.0 + tile_w as i64).max(0) as usize;
        let required_h = (anchor.1 + tile_h as i64).max(0) as usize;
        trace_debug!(
            "placement",
            match_x = result.x,
            match_y = result.y,
            anchor_x = anchor.0,
            anchor_y = anchor.1,
            required_w = required_w,
            required_h = required_h
        );

        let mut canvas = Arc::clone(current);
        let mut grew = false;
        if !canvas.covers(required_w, required_h) {
            let margin = self.config.growth_margin;
            let grow_w = if required_w > canvas.width() {
                required_w + margin
            } else {
                canvas.width()
            };
            let grow_h = if required_h > canvas.height() {
                required_h + margin
            } else {
                canvas.height()
            };
            canvas = canvas.expand(grow_w, grow_h);
            grew = true;
            trace_event!(
                "canvas_grown",
                width = canvas.width(),
                height = canvas.height()
            );
        }

        let placement =
            canvas
                .clip(anchor.0, anchor.1, tile_w, tile_h)
                .ok_or(StitchError::InvalidRegion {
                    reason: "tile does not overlap canvas",
                })?;
        let dest_x = placement.canvas.x as i64;
        let dest_y = placement.canvas.y as i64;
        let dest = canvas.read_region(
            dest_x,
            dest_y,
            placement.canvas.width,
            placement.canvas.height,
        );
        let src = tile.pixels.crop(placement.source)?;
        let merged = self.config.merge.apply(&dest, &src)?;

        let changed = grew || merged != dest;
        if changed {
            // Copies unless the canvas was just grown and is still private.
            Arc::make_mut(&mut canvas).write_region(dest_x, dest_y, &merged)?;
        }
        Ok(Merge::Applied {
            canvas,
            anchor,
            score: result.confidence,
            grew,
            changed,
        })
    }

    /// Picks the tile's own sub-region, else the configured one, else the
    /// whole tile. Returns the key view and its offset inside the tile.
    fn matching_key<'a>(
        &self,
        tile: &Tile,
        tile_view: ImageView<'a>,
    ) -> StitchResult<(ImageView<'a>, (usize, usize))> {
        let Some(region) = tile.sub_region.or(self.config.match_region) else {
            return Ok((tile_view, (0, 0)));
        };
        let bounds = Rect::new(0, 0, tile_view.width(), tile_view.height());
        let clipped = region
            .intersect(&bounds)
            .ok_or(StitchError::InvalidRegion {
                reason: "matching sub-region outside tile",
            })?;
        Ok((tile_view.roi(clipped)?, (clipped.x, clipped.y)))
    }

    fn commit(&mut self, canvas: Arc<Canvas>) {
        self.reader.publish(Arc::clone(&canvas));
        self.canvas = Some(canvas);
    }

    fn invalid_state(&self, op: &'static str) -> StitchError {
        StitchError::InvalidState {
            op,
            state: self.state.as_str(),
        }
    }
}

enum Merge {
    Applied {
        canvas: Arc<Canvas>,
        anchor: (i64, i64),
        score: f32,
        grew: bool,
        changed: bool,
    },
    LowConfidence {
        score: f32,
    },
}
