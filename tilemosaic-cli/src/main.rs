use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tilemosaic::io::save_buffer;
use tilemosaic::{
    Canvas, Color, EngineRunner, EngineStats, MatcherConfig, MergePolicy, MosaicConfig,
    MosaicEngine, Rect, ScheduleReport, Scheduler, TileSource,
};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

mod source;

use source::FileTileSource;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Tilemosaic CLI: stitch a directory of tiles (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct RectJson {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl From<RectJson> for Rect {
    fn from(value: RectJson) -> Self {
        Rect::new(value.x, value.y, value.width, value.height)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum MergeMode {
    Overwrite,
    PreserveExisting,
    AlphaBlend,
    KeyColorMask,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MergeJson {
    mode: MergeMode,
    alpha: f32,
    key: [u8; 3],
}

impl Default for MergeJson {
    fn default() -> Self {
        Self {
            mode: MergeMode::PreserveExisting,
            alpha: 0.5,
            key: [0, 255, 0],
        }
    }
}

impl MergeJson {
    fn to_policy(&self, background: Color) -> MergePolicy {
        match self.mode {
            MergeMode::Overwrite => MergePolicy::Overwrite,
            MergeMode::PreserveExisting => MergePolicy::PreserveExisting {
                sentinel: background,
            },
            MergeMode::AlphaBlend => MergePolicy::AlphaBlend { alpha: self.alpha },
            MergeMode::KeyColorMask => MergePolicy::KeyColorMask {
                key: Color::rgb(self.key[0], self.key[1], self.key[2]),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    tiles_dir: String,
    output_path: String,
    capture_region: Option<RectJson>,
    match_region: Option<RectJson>,
    canvas_width: usize,
    canvas_height: usize,
    background: [u8; 3],
    threshold: f32,
    merge: MergeJson,
    interval_ms: u64,
    growth_margin: usize,
    parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = MosaicConfig::default();
        let bg = cfg.background.as_slice();
        Self {
            tiles_dir: String::new(),
            output_path: "mosaic.png".into(),
            capture_region: None,
            match_region: None,
            canvas_width: cfg.canvas_width,
            canvas_height: cfg.canvas_height,
            background: [bg[0], bg[1], bg[2]],
            threshold: cfg.threshold,
            merge: MergeJson::default(),
            interval_ms: cfg.interval.as_millis() as u64,
            growth_margin: cfg.growth_margin,
            parallel: cfg.matcher.parallel,
        }
    }
}

impl Config {
    fn mosaic_config(&self) -> MosaicConfig {
        let background = Color::rgb(self.background[0], self.background[1], self.background[2]);
        MosaicConfig {
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            background,
            threshold: self.threshold,
            merge: self.merge.to_policy(background),
            match_region: self.match_region.map(Rect::from),
            growth_margin: self.growth_margin,
            interval: Duration::from_millis(self.interval_ms),
            matcher: MatcherConfig {
                parallel: self.parallel,
                ..MatcherConfig::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    output_path: String,
    width: usize,
    height: usize,
    frames_published: u64,
    cycles: u64,
    merges: u64,
    growths: u64,
    capture_failures: u64,
    low_confidence: u64,
    invalid_regions: u64,
    failures: u64,
    overruns: u64,
}

impl Summary {
    fn new(
        output_path: String,
        canvas: &Canvas,
        stats: EngineStats,
        report: ScheduleReport,
        frames_published: u64,
    ) -> Self {
        Self {
            output_path,
            width: canvas.width(),
            height: canvas.height(),
            frames_published,
            cycles: stats.cycles,
            merges: stats.merges,
            growths: stats.growths,
            capture_failures: stats.capture_failures,
            low_confidence: stats.low_confidence,
            invalid_regions: stats.invalid_regions,
            failures: stats.failures,
            overruns: report.overruns,
        }
    }
}

/// `RUST_LOG` plus info level for the library and this binary.
fn trace_filter() -> Result<EnvFilter, ParseError> {
    Ok(EnvFilter::from_default_env()
        .add_directive("tilemosaic=info".parse()?)
        .add_directive("tilemosaic_cli=info".parse()?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(trace_filter()?)
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.tiles_dir.is_empty() {
        return Err("tiles_dir must be set in the config".into());
    }

    let mosaic_config = config.mosaic_config();
    let mut source = FileTileSource::from_dir(
        config.tiles_dir.as_ref(),
        config.capture_region.map(Rect::from),
        mosaic_config.background.channels(),
    )?;
    let first = source
        .capture_tile()?
        .ok_or("tiles_dir contains no png tiles")?;

    let interval = mosaic_config.interval;
    let mut engine = MosaicEngine::new(mosaic_config)?;
    engine.initialize(&first)?;
    tracing::info!(tiles = source.remaining(), "replaying tiles");

    let published = Arc::new(AtomicU64::new(0));
    let sink_counter = Arc::clone(&published);
    let sink = move |canvas: Arc<Canvas>| {
        let frames = sink_counter.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(frames, width = canvas.width(), height = canvas.height(), "frame updated");
    };

    let handle = EngineRunner::spawn(engine, source, sink, Scheduler::new(interval))?;
    let (engine, report) = handle.wait()?;

    let snapshot = engine.save_snapshot()?;
    save_buffer(&snapshot, &config.output_path)?;
    let canvas = engine.canvas().ok_or("engine lost its canvas")?;

    let summary = Summary::new(
        config.output_path.clone(),
        &canvas,
        engine.stats(),
        report,
        published.load(Ordering::Relaxed),
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{trace_filter, Config, MergeMode};
    use tilemosaic::{Color, MergePolicy, Rect};

    #[test]
    fn example_config_parses_with_defaults() {
        let config: Config = serde_json::from_str(super::EXAMPLE_JSON).unwrap();
        assert_eq!(config.merge.mode, MergeMode::PreserveExisting);
        let mosaic = config.mosaic_config();
        mosaic.validate().unwrap();
        assert_eq!(mosaic.match_region, Some(Rect::new(10, 10, 88, 46)));
    }

    #[test]
    fn missing_fields_fall_back_to_library_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"tiles_dir": "t", "merge": {"mode": "alpha_blend"}}"#)
                .unwrap();
        let mosaic = config.mosaic_config();
        assert_eq!(mosaic.canvas_width, 512);
        assert_eq!(mosaic.background, Color::WHITE);
        assert_eq!(mosaic.merge, MergePolicy::AlphaBlend { alpha: 0.5 });
        assert!((mosaic.threshold - 0.8).abs() < 1e-6);
    }

    #[test]
    fn trace_filter_covers_library_and_binary_targets() {
        let filter = trace_filter().unwrap().to_string();
        assert!(filter.contains("tilemosaic=info"), "{filter}");
        assert!(filter.contains("tilemosaic_cli=info"), "{filter}");
    }
}
