//! Correlation kernel implementations.

use crate::candidate::topk::Peak;
use crate::template::TemplatePlan;
use crate::util::{StitchError, StitchResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Maximum number of peaks to retain.
    pub topk: usize,
    /// Minimum variance for a canvas window to be scored by NCC.
    pub min_var: f64,
    /// Minimum score threshold (discard below this value).
    pub min_score: f32,
}

/// Full-range scan over every valid placement.
pub trait Kernel {
    /// Scans the full valid placement range and returns top-K peaks.
    fn scan_full(
        image: ImageView<'_>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> StitchResult<Vec<Peak>>;
}

/// Returns the largest valid placement `(max_x, max_y)` for `plan` in `image`.
pub(crate) fn placement_range(
    image: &ImageView<'_>,
    plan: &TemplatePlan,
) -> StitchResult<(usize, usize)> {
    if image.channels() != plan.channels() {
        return Err(StitchError::ChannelMismatch {
            expected: image.channels(),
            got: plan.channels(),
        });
    }
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(StitchError::TemplateTooLarge {
            tpl_width,
            tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
