//! Fixed small-canvas scenarios for placement, matching and growth.

use tilemosaic::{
    Canvas, Color, CycleOutcome, MergePolicy, MosaicConfig, MosaicEngine, NullSink, PixelBuffer,
    Rect, Tile,
};

fn config(merge: MergePolicy) -> MosaicConfig {
    MosaicConfig {
        canvas_width: 10,
        canvas_height: 10,
        background: Color::WHITE,
        merge,
        ..MosaicConfig::default()
    }
}

fn black_tile() -> Tile {
    Tile::new(PixelBuffer::filled(4, 4, Color::BLACK))
}

fn assert_black_block(canvas: &Canvas, x0: usize, y0: usize, size: usize) {
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let inside = (x0..x0 + size).contains(&x) && (y0..y0 + size).contains(&y);
            let expected: &[u8] = if inside { &[0, 0, 0] } else { &[255, 255, 255] };
            assert_eq!(canvas.pixels().pixel(x, y).unwrap(), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn center_place_puts_first_tile_in_rows_and_columns_three_to_six() {
    let canvas = Canvas::new(10, 10, Color::WHITE);
    let placed = canvas
        .center_place(&PixelBuffer::filled(4, 4, Color::BLACK))
        .unwrap();
    assert_black_block(&placed, 3, 3, 4);
    // The source canvas is a separate buffer and stays blank.
    assert_eq!(canvas, Canvas::new(10, 10, Color::WHITE));
}

#[test]
fn same_tile_matches_at_three_three_and_leaves_canvas_unchanged() {
    for policy in [
        MergePolicy::Overwrite,
        MergePolicy::PreserveExisting {
            sentinel: Color::WHITE,
        },
    ] {
        let mut engine = MosaicEngine::new(config(policy)).unwrap();
        engine.initialize(&black_tile()).unwrap();
        engine.start().unwrap();
        let before = engine.save_snapshot().unwrap();

        let outcome = engine.process_tile(&black_tile(), &mut NullSink);
        match outcome {
            CycleOutcome::Merged {
                anchor,
                score,
                grew,
                changed,
            } => {
                assert_eq!(anchor, (3, 3));
                assert!(score >= engine.config().threshold);
                assert!(!grew);
                assert!(!changed);
            }
            other => panic!("expected a merge, got {other:?}"),
        }
        assert_eq!(engine.save_snapshot().unwrap(), before);
    }
}

#[test]
fn footprint_reaching_edge_is_written_without_clipping_loss() {
    // Canvas with the black block at (6, 6) so the 4x4 tile resolves there.
    let mut seed = Canvas::new(10, 10, Color::WHITE);
    seed.write_region(6, 6, &PixelBuffer::filled(4, 4, Color::BLACK))
        .unwrap();

    let grown = std::sync::Arc::new(seed.clone()).expand(6 + 4, 6 + 4);
    assert!(grown.covers(10, 10));

    let matcher = tilemosaic::CorrelationMatcher::default();
    let tile = PixelBuffer::filled(4, 4, Color::rgb(0, 0, 0));
    let result = matcher
        .match_template(seed.view().unwrap(), tile.view().unwrap())
        .unwrap();
    assert_eq!((result.x, result.y), (6, 6));

    let mut target = (*grown).clone();
    let written = target
        .write_region(6, 6, &PixelBuffer::filled(4, 4, Color::rgb(9, 9, 9)))
        .unwrap();
    assert_eq!(written, 16);
    assert_eq!(target.pixels().pixel(9, 9).unwrap(), &[9, 9, 9]);
}

#[test]
fn footprint_past_edge_grows_canvas_before_write() {
    // 6x6 tile whose top-left 4x4 is black; matching on that crop resolves at
    // (6, 6), so the full tile needs a 12x12 canvas.
    let mut pixels = PixelBuffer::filled(6, 6, Color::rgb(10, 20, 30));
    for y in 0..4 {
        for x in 0..4 {
            pixels.set_pixel(x, y, Color::BLACK);
        }
    }
    let tile = Tile::new(pixels.clone()).with_sub_region(Rect::new(0, 0, 4, 4));

    let mut first = PixelBuffer::filled(10, 10, Color::WHITE);
    for y in 6..10 {
        for x in 6..10 {
            first.set_pixel(x, y, Color::BLACK);
        }
    }
    let mut engine = MosaicEngine::new(config(MergePolicy::Overwrite)).unwrap();
    engine.initialize(&Tile::new(first)).unwrap();
    engine.start().unwrap();
    let before = engine.canvas().unwrap();

    let outcome = engine.process_tile(&tile, &mut NullSink);
    assert!(matches!(
        outcome,
        CycleOutcome::Merged {
            anchor: (6, 6),
            grew: true,
            changed: true,
            ..
        }
    ));

    let after = engine.canvas().unwrap();
    assert_eq!((after.width(), after.height()), (12, 12));
    assert_eq!(after.read_region(6, 6, 6, 6), pixels);
    // The pre-growth buffer is untouched and still 10x10.
    assert_eq!((before.width(), before.height()), (10, 10));
    // The old content survives at the unchanged origin.
    assert_eq!(&after.read_region(0, 0, 10, 10), before.pixels());
}
