//! Engine configuration.

use crate::image::{Color, Rect};
use crate::matcher::MatcherConfig;
use crate::merge::MergePolicy;
use crate::util::{StitchError, StitchResult};
use std::time::Duration;

/// Configuration for [`MosaicEngine`](crate::MosaicEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct MosaicConfig {
    /// Initial canvas width in pixels.
    pub canvas_width: usize,
    /// Initial canvas height in pixels.
    pub canvas_height: usize,
    /// Sentinel color of unpainted canvas area; also fixes the channel count.
    pub background: Color,
    /// Minimum match confidence for a tile to be merged.
    pub threshold: f32,
    /// Merge policy applied to accepted tiles.
    pub merge: MergePolicy,
    /// Matching crop used for tiles that carry no sub-region of their own.
    pub match_region: Option<Rect>,
    /// Extra pixels added in each axis that has to grow.
    pub growth_margin: usize,
    /// Target period between cycle starts.
    pub interval: Duration,
    pub matcher: MatcherConfig,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            canvas_width: 512,
            canvas_height: 512,
            background: Color::WHITE,
            threshold: 0.8,
            merge: MergePolicy::PreserveExisting {
                sentinel: Color::WHITE,
            },
            match_region: None,
            growth_margin: 0,
            interval: Duration::from_millis(300),
            matcher: MatcherConfig::default(),
        }
    }
}

impl MosaicConfig {
    /// Sets the background and keeps a `PreserveExisting` sentinel in step with it.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        if let MergePolicy::PreserveExisting { sentinel } = &mut self.merge {
            *sentinel = background;
        }
        self
    }

    /// Checks the configuration for internal consistency.
    pub fn validate(&self) -> StitchResult<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(StitchError::InvalidConfig("canvas size must be non-zero"));
        }
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(StitchError::InvalidConfig("threshold must lie in [-1, 1]"));
        }
        if let Some(region) = self.match_region {
            if region.is_empty() {
                return Err(StitchError::InvalidConfig("match region must be non-empty"));
            }
        }
        self.check_merge(&self.merge)
    }

    /// Checks `policy` against this canvas: channel count, and a
    /// `PreserveExisting` sentinel equal to the background fill.
    pub(crate) fn check_merge(&self, policy: &MergePolicy) -> StitchResult<()> {
        policy.validate(self.background.channels())?;
        match policy {
            MergePolicy::PreserveExisting { sentinel } if *sentinel != self.background => Err(
                StitchError::InvalidConfig("preserve_existing sentinel must equal the background"),
            ),
            _ => Ok(()),
        }
    }
}
