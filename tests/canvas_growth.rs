use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tilemosaic::{Canvas, Color, PixelBuffer};

fn noise(width: usize, height: usize, rng: &mut StdRng) -> PixelBuffer {
    let data = (0..width * height * 3).map(|_| rng.random::<u8>()).collect();
    PixelBuffer::new(data, width, height, 3).unwrap()
}

#[test]
fn random_expansions_never_shrink_and_keep_origin_content() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let background = Color::rgb(250, 240, 230);
    let mut canvas = Canvas::new(8, 6, background);
    canvas.write_region(0, 0, &noise(8, 6, &mut rng)).unwrap();
    let original = canvas.pixels().clone();
    let mut canvas = Arc::new(canvas);

    for _ in 0..40 {
        let want_w = rng.random_range(1..48);
        let want_h = rng.random_range(1..48);
        let (old_w, old_h) = (canvas.width(), canvas.height());
        let grown = canvas.expand(want_w, want_h);

        assert_eq!(grown.width(), old_w.max(want_w));
        assert_eq!(grown.height(), old_h.max(want_h));
        if want_w <= old_w && want_h <= old_h {
            assert!(Arc::ptr_eq(&canvas, &grown));
        }
        assert_eq!(grown.read_region(0, 0, 8, 6), original);
        canvas = grown;
    }

    // Everything outside the seeded block is background.
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            if x >= 8 || y >= 6 {
                assert_eq!(canvas.pixels().pixel(x, y).unwrap(), background.as_slice());
            }
        }
    }
}

#[test]
fn expand_leaves_previous_snapshot_untouched() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut canvas = Canvas::new(5, 5, Color::WHITE);
    canvas.write_region(0, 0, &noise(5, 5, &mut rng)).unwrap();
    let old = Arc::new(canvas);
    let frozen = old.pixels().clone();

    let mut grown = old.expand(9, 7);
    Arc::make_mut(&mut grown)
        .write_region(0, 0, &PixelBuffer::filled(9, 7, Color::BLACK))
        .unwrap();

    assert_eq!(old.pixels(), &frozen);
    assert_eq!((old.width(), old.height()), (5, 5));
}

#[test]
fn writes_clip_at_every_edge() {
    let mut rng = StdRng::seed_from_u64(3);
    let region = noise(4, 4, &mut rng);
    for (x, y, expected) in [
        (-2i64, -2i64, 4usize),
        (8, 8, 4),
        (-2, 8, 4),
        (3, 3, 16),
        (-4, 0, 0),
        (10, 0, 0),
    ] {
        let mut canvas = Canvas::new(10, 10, Color::WHITE);
        let written = canvas.write_region(x, y, &region).unwrap();
        assert_eq!(written, expected, "anchor ({x}, {y})");
        assert_eq!((canvas.width(), canvas.height()), (10, 10));
    }
}
