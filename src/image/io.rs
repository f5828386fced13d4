//! Lossless load and save helpers via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. The output format is
//! picked from the file extension; use `.png` for a lossless dump.

use crate::image::{check_channels, PixelBuffer};
use crate::util::{StitchError, StitchResult};
use image::{DynamicImage, ExtendedColorType};
use std::path::Path;

fn io_error(err: image::ImageError) -> StitchError {
    StitchError::ImageIo {
        reason: err.to_string(),
    }
}

/// Converts a decoded image, keeping its channel count (1 to 4).
pub fn buffer_from_dynamic_image(img: &DynamicImage) -> StitchResult<PixelBuffer> {
    convert_dynamic_image(img, img.color().channel_count() as usize)
}

/// Converts a decoded image to exactly `channels` samples per pixel.
///
/// Alpha is dropped or added as opaque; color is reduced to luma for 1 or 2
/// channels.
pub fn convert_dynamic_image(img: &DynamicImage, channels: usize) -> StitchResult<PixelBuffer> {
    check_channels(channels)?;
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = match channels {
        1 => img.to_luma8().into_raw(),
        2 => img.to_luma_alpha8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        _ => img.to_rgba8().into_raw(),
    };
    PixelBuffer::new(data, width, height, channels)
}

/// Decodes an image file into a pixel buffer.
pub fn load_buffer<P: AsRef<Path>>(path: P) -> StitchResult<PixelBuffer> {
    let img = image::open(path).map_err(io_error)?;
    buffer_from_dynamic_image(&img)
}

/// Decodes an image file and converts it to `channels` samples per pixel.
pub fn load_buffer_as<P: AsRef<Path>>(path: P, channels: usize) -> StitchResult<PixelBuffer> {
    let img = image::open(path).map_err(io_error)?;
    convert_dynamic_image(&img, channels)
}

/// Writes the buffer uncompressed-equivalent (lossless) to `path`.
pub fn save_buffer<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> StitchResult<()> {
    if buffer.is_empty() {
        return Err(StitchError::InvalidDimensions {
            width: buffer.width(),
            height: buffer.height(),
        });
    }
    let color = match buffer.channels() {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::Rgba8,
    };
    image::save_buffer(
        path,
        buffer.data(),
        buffer.width() as u32,
        buffer.height() as u32,
        color,
    )
    .map_err(io_error)
}
