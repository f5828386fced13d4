//! Correlation matcher: locate a template inside a canvas.
//!
//! The matcher scores every integer translation of the template with
//! zero-mean NCC and reports the global maximum. Ties resolve to the first
//! placement in row-major order, so results are deterministic.

use crate::candidate::nms::nms_2d;
use crate::candidate::topk::Peak;
#[cfg(feature = "rayon")]
use crate::kernel::rayon::NccRayon;
use crate::kernel::scalar::NccScalar;
use crate::kernel::{Kernel, ScanParams};
use crate::template::{TemplatePlan, DEFAULT_MIN_VAR};
use crate::trace::{trace_debug, trace_span};
use crate::util::{StitchError, StitchResult};
use crate::ImageView;

/// Score assigned to an exact reproduction of the template.
pub const PERFECT_MATCH: f32 = 0.999;

/// Matcher tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatcherConfig {
    /// Variance below which templates and windows count as flat.
    pub min_var: f64,
    /// Scan rows in parallel (requires the `rayon` feature, ignored otherwise).
    pub parallel: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_var: DEFAULT_MIN_VAR,
            parallel: false,
        }
    }
}

/// Best template placement and its confidence in `[-1, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    pub x: usize,
    pub y: usize,
    pub confidence: f32,
}

impl MatchResult {
    /// True when the confidence meets `threshold`.
    pub fn is_actionable(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

impl From<Peak> for MatchResult {
    fn from(peak: Peak) -> Self {
        Self {
            x: peak.x,
            y: peak.y,
            confidence: peak.score,
        }
    }
}

/// Pure NCC template matcher.
#[derive(Clone, Debug, Default)]
pub struct CorrelationMatcher {
    cfg: MatcherConfig,
}

impl CorrelationMatcher {
    pub fn new(cfg: MatcherConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }

    /// Returns the best placement of `template` inside `canvas`.
    ///
    /// Fails with `TemplateTooLarge` when the template exceeds the canvas in
    /// either axis and `ChannelMismatch` when channel counts differ.
    pub fn match_template(
        &self,
        canvas: ImageView<'_>,
        template: ImageView<'_>,
    ) -> StitchResult<MatchResult> {
        let peaks = self.scan(canvas, template, 1)?;
        peaks
            .into_iter()
            .next()
            .map(MatchResult::from)
            .ok_or(StitchError::InvalidRegion {
                reason: "no valid placement",
            })
    }

    /// Returns up to `k` distinct peaks, strongest first, at least
    /// `nms_radius + 1` pixels apart (Chebyshev).
    pub fn match_topk(
        &self,
        canvas: ImageView<'_>,
        template: ImageView<'_>,
        k: usize,
        nms_radius: usize,
    ) -> StitchResult<Vec<MatchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        // Over-collect so suppression still leaves k survivors in most cases.
        let collect = k.saturating_mul((2 * nms_radius + 1).pow(2)).max(k);
        let peaks = self.scan(canvas, template, collect)?;
        let mut kept = nms_2d(peaks, nms_radius);
        kept.truncate(k);
        Ok(kept.into_iter().map(MatchResult::from).collect())
    }

    fn scan(
        &self,
        canvas: ImageView<'_>,
        template: ImageView<'_>,
        topk: usize,
    ) -> StitchResult<Vec<Peak>> {
        let _span = trace_span!(
            "match_template",
            canvas_w = canvas.width(),
            canvas_h = canvas.height(),
            tpl_w = template.width(),
            tpl_h = template.height()
        )
        .entered();

        if template.width() > canvas.width() || template.height() > canvas.height() {
            return Err(StitchError::TemplateTooLarge {
                tpl_width: template.width(),
                tpl_height: template.height(),
                img_width: canvas.width(),
                img_height: canvas.height(),
            });
        }
        let plan = TemplatePlan::from_view(template, self.cfg.min_var)?;
        let params = ScanParams {
            topk,
            min_var: self.cfg.min_var,
            min_score: f32::NEG_INFINITY,
        };

        let peaks = self.run_kernel(canvas, &plan, params)?;
        if let Some(best) = peaks.first() {
            trace_debug!(
                "match_peak",
                x = best.x,
                y = best.y,
                score = best.score,
                flat = plan.is_flat()
            );
        }
        Ok(peaks)
    }

    #[cfg(feature = "rayon")]
    fn run_kernel(
        &self,
        canvas: ImageView<'_>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> StitchResult<Vec<Peak>> {
        if self.cfg.parallel {
            NccRayon::scan_full(canvas, plan, params)
        } else {
            NccScalar::scan_full(canvas, plan, params)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run_kernel(
        &self,
        canvas: ImageView<'_>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> StitchResult<Vec<Peak>> {
        NccScalar::scan_full(canvas, plan, params)
    }
}

#[cfg(test)]
mod tests {
    use super::{CorrelationMatcher, PERFECT_MATCH};
    use crate::image::{PixelBuffer, Rect};
    use crate::util::StitchError;

    fn textured(width: usize, height: usize) -> PixelBuffer {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
                data.extend_from_slice(&[v as u8, (v as u8).wrapping_mul(3), (x + y) as u8]);
            }
        }
        PixelBuffer::new(data, width, height, 3).unwrap()
    }

    #[test]
    fn finds_embedded_patch() {
        let canvas = textured(40, 30);
        let patch = canvas.crop(Rect::new(17, 9, 8, 6)).unwrap();
        let matcher = CorrelationMatcher::default();
        let result = matcher
            .match_template(canvas.view().unwrap(), patch.view().unwrap())
            .unwrap();
        assert_eq!((result.x, result.y), (17, 9));
        assert!(result.confidence >= PERFECT_MATCH);
    }

    #[test]
    fn rejects_template_larger_than_canvas() {
        let canvas = textured(5, 5);
        let tpl = textured(6, 2);
        let err = CorrelationMatcher::default()
            .match_template(canvas.view().unwrap(), tpl.view().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            StitchError::TemplateTooLarge {
                tpl_width: 6,
                tpl_height: 2,
                img_width: 5,
                img_height: 5,
            }
        );
    }

    #[test]
    fn topk_reports_the_exact_match_first() {
        let canvas = textured(32, 32);
        let patch = canvas.crop(Rect::new(4, 20, 6, 6)).unwrap();
        let results = CorrelationMatcher::default()
            .match_topk(canvas.view().unwrap(), patch.view().unwrap(), 3, 2)
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!((results[0].x, results[0].y), (4, 20));
        assert!(results[1].confidence <= results[0].confidence);
        let dx = results[1].x.abs_diff(results[0].x);
        let dy = results[1].y.abs_diff(results[0].y);
        assert!(dx.max(dy) > 2);
    }
}
