//! Scalar reference kernel for NCC evaluation.

use crate::candidate::topk::{Peak, TopK};
use crate::image::MAX_CHANNELS;
use crate::kernel::{placement_range, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::StitchResult;
use crate::ImageView;

/// Scalar zero-mean NCC kernel.
pub struct NccScalar;

/// Scores one placement. Always finite for in-range placements.
///
/// Textured templates use pooled multi-channel NCC clamped to `[-1, 1]`; a
/// flat window under a textured template scores `0`. Flat templates score
/// `1 - rms / 255` so only an identical flat window reaches `1`.
pub(crate) fn score_window(
    image: ImageView<'_>,
    plan: &TemplatePlan,
    x: usize,
    y: usize,
    min_var: f64,
) -> f32 {
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    let channels = plan.channels();
    if image.width() < tpl_width || image.height() < tpl_height {
        return f32::NEG_INFINITY;
    }
    if x > image.width() - tpl_width || y > image.height() - tpl_height {
        return f32::NEG_INFINITY;
    }
    let row_len = tpl_width * channels;
    let x0 = x * channels;

    if plan.is_flat() {
        let samples = plan.samples();
        let mut ssd = 0.0f64;
        for ty in 0..tpl_height {
            let Some(img_row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            let window = &img_row[x0..x0 + row_len];
            let tpl_row = &samples[ty * row_len..(ty + 1) * row_len];
            for (&a, &b) in window.iter().zip(tpl_row) {
                let d = a as f64 - b as f64;
                ssd += d * d;
            }
        }
        let norm = ssd / (samples.len() as f64 * 255.0 * 255.0);
        return (1.0 - norm.sqrt()) as f32;
    }

    let zero_mean = plan.zero_mean();
    let mut dot = 0.0f64;
    let mut sum_i = [0.0f64; MAX_CHANNELS];
    let mut sum_i2 = [0.0f64; MAX_CHANNELS];
    for ty in 0..tpl_height {
        let Some(img_row) = image.row(y + ty) else {
            return f32::NEG_INFINITY;
        };
        let window = &img_row[x0..x0 + row_len];
        let tpl_row = &zero_mean[ty * row_len..(ty + 1) * row_len];
        for (i, (&v, &t)) in window.iter().zip(tpl_row).enumerate() {
            let c = i % channels;
            let v = v as f64;
            dot += t as f64 * v;
            sum_i[c] += v;
            sum_i2[c] += v * v;
        }
    }

    let n = (tpl_width * tpl_height) as f64;
    let var_i: f64 = (0..channels)
        .map(|c| sum_i2[c] - sum_i[c] * sum_i[c] / n)
        .sum();
    if var_i <= min_var {
        return 0.0;
    }

    let score = dot / (plan.var_t() * var_i).sqrt();
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

impl Kernel for NccScalar {
    fn scan_full(
        image: ImageView<'_>,
        plan: &TemplatePlan,
        params: ScanParams,
    ) -> StitchResult<Vec<Peak>> {
        let (max_x, max_y) = placement_range(&image, plan)?;
        if params.topk == 0 {
            return Ok(Vec::new());
        }

        let mut topk = TopK::new(params.topk);
        for y in 0..=max_y {
            for x in 0..=max_x {
                let score = score_window(image, plan, x, y, params.min_var);
                if score >= params.min_score {
                    topk.push(Peak { x, y, score });
                }
            }
        }
        Ok(topk.into_sorted_desc())
    }
}
