//! lyricsync - fetch lyrics for a track and follow them along a simulated playback

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lyricsync::api::LrclibClient;
use lyricsync::cache::{CachedLyricsService, LyricsCache};
use lyricsync::features::import::import_and_reload;
use lyricsync::features::lyrics::{
    AcquisitionResult, AcquisitionStrategy, KanaRomanizer, LyricsCoordinator, LyricsMode,
    LyricsSurface, PositionerMode, ScrollConfig, TrackQuery, stack_lines,
};
use lyricsync::features::{
    JsonPreferenceStore, LyricsSettings, MemoryPreferenceStore, PreferenceStore,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Direct,
    CachePoll,
}

impl From<StrategyArg> for AcquisitionStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Direct => AcquisitionStrategy::Direct,
            StrategyArg::CachePoll => AcquisitionStrategy::CachePoll,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Fetch and follow synced lyrics")]
struct Cli {
    artist: String,
    title: String,

    /// Track duration in seconds
    #[arg(long, short)]
    duration: u32,

    /// Audio file; enables sidecar and embedded lyrics lookup
    #[arg(long)]
    file: Option<PathBuf>,

    /// Acquisition strategy (defaults to the configured one)
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Display mode: original, romanized or both (persisted)
    #[arg(long)]
    mode: Option<LyricsMode>,

    /// Import this LRC file for the track before playing
    #[arg(long)]
    lrc: Option<PathBuf>,

    /// Playback speed multiplier for the simulation
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = LyricsSettings::load();
    let mut config = settings.acquisition_config();
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy.into();
    }

    let key = match &cli.file {
        Some(path) => path.to_string_lossy().into_owned(),
        None => format!("{} - {}", cli.artist, cli.title),
    };
    let query = TrackQuery::new(&cli.artist, &cli.title, cli.duration, key);

    let lrclib = LrclibClient::new(&settings.lrclib).context("Failed to create LRCLIB client")?;
    let service = Arc::new(CachedLyricsService::new(lrclib, LyricsCache::open_default()));

    let preferences: Arc<dyn PreferenceStore> = match JsonPreferenceStore::file_path() {
        Some(path) => Arc::new(JsonPreferenceStore::open(path)),
        None => Arc::new(MemoryPreferenceStore::default()),
    };

    let coordinator = LyricsCoordinator::builder(service.clone())
        .config(config)
        .romanizer(Arc::new(KanaRomanizer))
        .preferences(preferences)
        .build();
    if let Some(mode) = cli.mode {
        coordinator.set_mode(mode);
    }
    coordinator.open();

    if config.strategy == AcquisitionStrategy::CachePoll {
        let _prefetch = service.prefetch(&query);
    }

    let result = match &cli.lrc {
        Some(file) => import_and_reload(&coordinator, service.cache(), file, query.clone()).await?,
        None => coordinator.acquire(query.clone()).await,
    };

    match &result {
        AcquisitionResult::Synced { lines } => {
            println!("{} - {}: {} synced lines", cli.artist, cli.title, lines.len());
        }
        AcquisitionResult::Plain { text } => {
            println!("{text}");
            return Ok(());
        }
        other => {
            println!("{}", other.display_message().unwrap_or_default());
            return Ok(());
        }
    }

    play(&coordinator, settings.scroll_config(), cli.duration, cli.speed).await;
    coordinator.close();
    Ok(())
}

/// Advance a fake playback clock and print each line as it becomes active
async fn play(coordinator: &LyricsCoordinator, scroll: ScrollConfig, duration: u32, speed: f64) {
    const TICK: Duration = Duration::from_millis(100);
    const LINE_HEIGHT: f32 = 40.0;

    let mut surface = LyricsSurface::new(PositionerMode::List, scroll);
    let mut interval = tokio::time::interval(TICK);
    let mut position = 0.0;

    while position <= f64::from(duration) {
        interval.tick().await;

        let state = coordinator.snapshot();
        let lines = state.lines();
        let geometry = stack_lines(&vec![LINE_HEIGHT; lines.len()], 12.0);
        let update = surface.on_position(lines, position, &geometry, 600.0, Instant::now());

        let active = update.active_index.and_then(|i| lines.get(i));
        if let (true, Some(line)) = (update.changed, active) {
            let rendered = state.mode.render(line);
            match rendered.secondary {
                Some(secondary) => {
                    println!("[{:>6.2}] {}  ({})", position, rendered.primary, secondary)
                }
                None => println!("[{:>6.2}] {}", position, rendered.primary),
            }
        }

        position += TICK.as_secs_f64() * speed;
    }
}
