//! Pixel merge policies.
//!
//! Every policy is a pure function of an existing canvas region (`dest`) and
//! the incoming tile region (`src`) of identical size, returning a freshly
//! allocated result.

use crate::image::{Color, PixelBuffer};
use crate::util::{StitchError, StitchResult};

/// How incoming tile pixels combine with pixels already on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MergePolicy {
    /// Incoming pixels replace existing ones.
    Overwrite,
    /// Incoming pixels only fill pixels still equal to `sentinel`.
    PreserveExisting { sentinel: Color },
    /// `dest * (1 - alpha) + src * alpha`, per channel, rounded.
    AlphaBlend { alpha: f32 },
    /// Incoming pixels equal to `key` are transparent.
    KeyColorMask { key: Color },
}

impl MergePolicy {
    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MergePolicy::Overwrite => "overwrite",
            MergePolicy::PreserveExisting { .. } => "preserve_existing",
            MergePolicy::AlphaBlend { .. } => "alpha_blend",
            MergePolicy::KeyColorMask { .. } => "key_color_mask",
        }
    }

    /// Checks policy parameters against the canvas channel count.
    pub fn validate(&self, channels: usize) -> StitchResult<()> {
        match *self {
            MergePolicy::Overwrite => Ok(()),
            MergePolicy::AlphaBlend { alpha } => {
                if alpha > 0.0 && alpha <= 1.0 {
                    Ok(())
                } else {
                    Err(StitchError::InvalidConfig("alpha must lie in (0, 1]"))
                }
            }
            MergePolicy::PreserveExisting { sentinel: color }
            | MergePolicy::KeyColorMask { key: color } => {
                if color.channels() == channels {
                    Ok(())
                } else {
                    Err(StitchError::ChannelMismatch {
                        expected: channels,
                        got: color.channels(),
                    })
                }
            }
        }
    }

    /// Merges `src` over `dest`; both must share dimensions and channels.
    pub fn apply(&self, dest: &PixelBuffer, src: &PixelBuffer) -> StitchResult<PixelBuffer> {
        if dest.dims() != src.dims() {
            return Err(StitchError::DimensionMismatch {
                left: dest.dims(),
                right: src.dims(),
            });
        }
        if dest.channels() != src.channels() {
            return Err(StitchError::ChannelMismatch {
                expected: dest.channels(),
                got: src.channels(),
            });
        }
        self.validate(dest.channels())?;

        let channels = dest.channels();
        let data = match *self {
            MergePolicy::Overwrite => src.data().to_vec(),
            MergePolicy::PreserveExisting { sentinel } => {
                select_pixels(dest, src, channels, |d, _| sentinel.matches(d))
            }
            MergePolicy::KeyColorMask { key } => {
                select_pixels(dest, src, channels, |_, s| !key.matches(s))
            }
            MergePolicy::AlphaBlend { alpha } => {
                let alpha = alpha as f64;
                dest.data()
                    .iter()
                    .zip(src.data())
                    .map(|(&d, &s)| blend_sample(d, s, alpha))
                    .collect()
            }
        };
        PixelBuffer::new(data, dest.width(), dest.height(), channels)
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy::PreserveExisting {
            sentinel: Color::WHITE,
        }
    }
}

/// Per pixel: takes `src` where `take_src(dest_px, src_px)` holds, else `dest`.
fn select_pixels<F>(dest: &PixelBuffer, src: &PixelBuffer, channels: usize, take_src: F) -> Vec<u8>
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    let mut out = Vec::with_capacity(dest.data().len());
    for (d, s) in dest
        .data()
        .chunks_exact(channels)
        .zip(src.data().chunks_exact(channels))
    {
        out.extend_from_slice(if take_src(d, s) { s } else { d });
    }
    out
}

fn blend_sample(dest: u8, src: u8, alpha: f64) -> u8 {
    let v = dest as f64 * (1.0 - alpha) + src as f64 * alpha;
    v.round().clamp(0.0, 255.0) as u8
}
