//! Rayon-parallel NCC kernel (feature-gated).
//!
//! Rows of placements are scored in parallel; each row keeps its own top-K and
//! the per-row results are merged with the same ordering as the scalar scan,
//! so both kernels return identical peaks.

use crate::candidate::topk::{Peak, TopK};
use crate::kernel::scalar::score_window;
use crate::kernel::{placement_range, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::StitchResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel zero-mean NCC kernel.
pub struct NccRayon;

impl Kernel for NccRayon {
    fn scan_full(
        image: ImageView<'_>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> StitchResult<Vec<Peak>> {
        let (max_x, max_y) = placement_range(&image, plan)?;
        if params.topk == 0 {
            return Ok(Vec::new());
        }

        let row_results: Vec<Vec<Peak>> = (0..=max_y)
            .into_par_iter()
            .map(|y| {
                let mut row_topk = TopK::new(params.topk);
                for x in 0..=max_x {
                    let score = score_window(image, plan, x, y, params.min_var);
                    if score >= params.min_score {
                        row_topk.push(Peak { x, y, score });
                    }
                }
                row_topk.into_sorted_desc()
            })
            .collect();

        let mut topk = TopK::new(params.topk);
        for peaks in row_results {
            topk.extend(peaks);
        }
        Ok(topk.into_sorted_desc())
    }
}
