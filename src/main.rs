//! ringplay - play FLAC and Ogg Vorbis files from the command line
//!
//! Files are played in order; each one advances to the next when it finishes.

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringplay::audio::CpalOutput;
use ringplay::{format_time, EngineConfig, OutputDevice, PlaybackEngine};

/// How often the status line is redrawn
const STATUS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "ringplay")]
#[command(about = "Stream FLAC and Ogg Vorbis files to the audio device")]
#[command(version)]
struct Args {
    /// Files to play, in order
    #[arg(required_unless_present = "list_devices")]
    files: Vec<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(short, long, env = "RINGPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Output device name (overrides the config file)
    #[arg(short, long)]
    device: Option<String>,

    /// Initial volume, 0.0 to 1.0 (overrides the config file)
    #[arg(short, long)]
    volume: Option<f32>,

    /// Start the first playable file this many seconds in
    #[arg(short, long)]
    start: Option<f64>,

    /// Print the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ringplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in CpalOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(device) = args.device.clone() {
        config.output.device_name = Some(device);
    }
    if let Some(volume) = args.volume {
        config.initial_volume = volume.clamp(0.0, 1.0);
    }

    let mut engine = PlaybackEngine::init(config).context("Failed to initialize playback engine")?;
    info!(
        "Output device: {} at {} Hz",
        engine.device().device_name(),
        engine.device().sample_rate()
    );

    let played = play_all(&mut engine, &args.files, args.start, |engine, name| {
        print_status(engine, name);
        thread::sleep(STATUS_INTERVAL);
    });
    engine.shutdown();

    if played == 0 {
        bail!("None of the given files could be played");
    }
    Ok(())
}

/// Play `files` in order, calling `tick` until each one finishes. Files that
/// fail to open are skipped; `start` applies to the first file that plays.
/// Returns how many files played.
fn play_all<D: OutputDevice>(
    engine: &mut PlaybackEngine<D>,
    files: &[PathBuf],
    mut start: Option<f64>,
    mut tick: impl FnMut(&PlaybackEngine<D>, &str),
) -> usize {
    let mut played = 0;
    for path in files {
        if let Err(e) = engine.play(path) {
            warn!("Skipping {}: {}", path.display(), e);
            continue;
        }
        played += 1;

        if let Some(start) = start.take() {
            if let Err(e) = engine.seek(start) {
                warn!("Could not start at {:.1}s: {}", start, e);
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        while !engine.is_finished() {
            tick(engine, &name);
        }
        println!();
        info!("Finished {}", name);
    }
    played
}

fn print_status<D: OutputDevice>(engine: &PlaybackEngine<D>, name: &str) {
    let mut stdout = std::io::stdout().lock();
    // Status output is best effort
    let _ = write!(
        stdout,
        "\r{} {}  {} / {}  {:3}%",
        engine.state().icon(),
        name,
        format_time(engine.position()),
        format_time(engine.duration()),
        (engine.volume() * 100.0).round() as u32
    );
    let _ = stdout.flush();
}

#[cfg(test)]
#[path = "../tests/helpers/flac_writer.rs"]
mod flac_writer;
