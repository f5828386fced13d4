//! Tile source replaying image files from a directory.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tilemosaic::io::load_buffer_as;
use tilemosaic::{Rect, StitchError, StitchResult, Tile, TileSource};

/// Yields one tile per PNG file, in file name order.
///
/// `capture_region` plays the role of the on-screen capture rectangle: it is
/// cropped out of every file before the tile is handed to the engine. Every
/// file is converted to `channels` samples per pixel, so RGBA screenshots feed
/// an RGB canvas.
pub struct FileTileSource {
    files: VecDeque<PathBuf>,
    capture_region: Option<Rect>,
    channels: usize,
}

impl FileTileSource {
    pub fn from_dir(
        dir: &Path,
        capture_region: Option<Rect>,
        channels: usize,
    ) -> std::io::Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        files.sort();
        Ok(Self {
            files: files.into(),
            capture_region,
            channels,
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }

    fn load(&self, path: &Path) -> StitchResult<Tile> {
        let capture_failure = |reason: String| StitchError::CaptureFailure {
            reason: format!("{}: {reason}", path.display()),
        };
        let image = load_buffer_as(path, self.channels)
            .map_err(|err| capture_failure(err.to_string()))?;
        let pixels = match self.capture_region {
            Some(region) => {
                let bounds = Rect::new(0, 0, image.width(), image.height());
                let clipped = region
                    .intersect(&bounds)
                    .ok_or_else(|| capture_failure("capture region outside image".into()))?;
                image
                    .crop(clipped)
                    .map_err(|err| capture_failure(err.to_string()))?
            }
            None => image,
        };
        Ok(Tile::new(pixels))
    }
}

impl TileSource for FileTileSource {
    fn capture_tile(&mut self) -> StitchResult<Option<Tile>> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        self.load(&path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::FileTileSource;
    use std::fs;
    use tilemosaic::io::save_buffer;
    use tilemosaic::{
        Color, MosaicConfig, MosaicEngine, PixelBuffer, Rect, StitchError, TileSource,
    };

    #[test]
    fn replays_sorted_png_files_and_reports_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        save_buffer(
            &PixelBuffer::filled(6, 5, Color::BLACK),
            dir.path().join("b.png"),
        )
        .unwrap();
        save_buffer(
            &PixelBuffer::filled(6, 5, Color::WHITE),
            dir.path().join("a.png"),
        )
        .unwrap();
        fs::write(dir.path().join("c.png"), b"not an image").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source =
            FileTileSource::from_dir(dir.path(), Some(Rect::new(1, 1, 3, 2)), 3).unwrap();
        assert_eq!(source.remaining(), 3);

        let first = source.capture_tile().unwrap().unwrap();
        assert_eq!(first.pixels, PixelBuffer::filled(3, 2, Color::WHITE));
        let second = source.capture_tile().unwrap().unwrap();
        assert_eq!(second.pixels, PixelBuffer::filled(3, 2, Color::BLACK));
        assert!(matches!(
            source.capture_tile(),
            Err(StitchError::CaptureFailure { .. })
        ));
        assert!(source.capture_tile().unwrap().is_none());
    }

    #[test]
    fn rgba_files_are_converted_for_an_rgb_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let mut rgba = PixelBuffer::filled(6, 5, Color::rgba(3, 21, 89, 255));
        rgba.set_pixel(2, 2, Color::rgba(200, 100, 50, 128));
        save_buffer(&rgba, dir.path().join("shot.png")).unwrap();

        let mut source = FileTileSource::from_dir(dir.path(), None, 3).unwrap();
        let tile = source.capture_tile().unwrap().unwrap();
        assert_eq!(tile.pixels.channels(), 3);
        assert_eq!(tile.pixels.pixel(0, 0).unwrap(), &[3, 21, 89]);
        assert_eq!(tile.pixels.pixel(2, 2).unwrap(), &[200, 100, 50]);

        let mut engine = MosaicEngine::new(MosaicConfig::default()).unwrap();
        engine.initialize(&tile).unwrap();
        assert_eq!(engine.canvas().unwrap().channels(), 3);
    }
}
