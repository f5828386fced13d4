//! Template plan precomputation for multi-channel NCC.

use crate::image::{ImageView, MAX_CHANNELS};
use crate::util::{StitchError, StitchResult};

/// Variance below which a template or window is treated as flat.
pub const DEFAULT_MIN_VAR: f64 = 1e-6;

/// Precomputed statistics and zero-mean buffer for template matching.
///
/// Per-channel means are subtracted from `zero_mean`; `var_t` is the sum of squared deviations
/// over every sample, so the NCC denominator pools all channels.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    channels: usize,
    var_t: f64,
    flat: bool,
    zero_mean: Vec<f32>,
    samples: Vec<u8>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_>, min_var: f64) -> StitchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let channels = tpl.channels();
        let count = width
            .checked_mul(height)
            .ok_or(StitchError::InvalidDimensions { width, height })?;

        let mut samples = Vec::with_capacity(count * channels);
        for y in 0..height {
            let row = tpl.row(y).ok_or(StitchError::BufferTooSmall {
                needed: (y + 1) * tpl.stride() * channels,
                got: tpl.as_slice().len(),
            })?;
            samples.extend_from_slice(row);
        }

        let mut sums = [0.0f64; MAX_CHANNELS];
        for px in samples.chunks_exact(channels) {
            for (sum, &v) in sums.iter_mut().zip(px) {
                *sum += v as f64;
            }
        }
        let mut means = [0.0f64; MAX_CHANNELS];
        for c in 0..channels {
            means[c] = sums[c] / count as f64;
        }

        let mut var_t = 0.0f64;
        let mut zero_mean = Vec::with_capacity(samples.len());
        for px in samples.chunks_exact(channels) {
            for (c, &v) in px.iter().enumerate() {
                let d = v as f64 - means[c];
                var_t += d * d;
                zero_mean.push(d as f32);
            }
        }

        Ok(Self {
            width,
            height,
            channels,
            var_t,
            flat: var_t <= min_var,
            zero_mean,
            samples,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sum of squared deviations from the per-channel means.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// True when the template has no usable variance.
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    /// Zero-mean template samples in row-major interleaved order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }

    /// Raw template samples in row-major interleaved order.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::{TemplatePlan, DEFAULT_MIN_VAR};
    use crate::image::ImageView;

    #[test]
    fn plan_matches_known_stats() {
        let data = [0u8, 10, 1, 10, 2, 10, 3, 10];
        let view = ImageView::from_slice(&data, 2, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view, DEFAULT_MIN_VAR).unwrap();

        // Channel means are 1.5 and 10.0; the second channel is constant.
        assert!((plan.var_t() - 5.0).abs() < 1e-12);
        assert!(!plan.is_flat());
        let expected = [-1.5f32, 0.0, -0.5, 0.0, 0.5, 0.0, 1.5, 0.0];
        for (value, expected) in plan.zero_mean().iter().zip(expected.iter()) {
            assert!((value - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_template_is_flat() {
        let data = [0u8; 12];
        let view = ImageView::from_slice(&data, 2, 2, 3).unwrap();
        let plan = TemplatePlan::from_view(view, DEFAULT_MIN_VAR).unwrap();
        assert!(plan.is_flat());
    }
}
