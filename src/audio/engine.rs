// Playback engine: transport state machine over the shared stream state
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::decoder::{DecoderAdapter, StreamInfo};
use super::format::AudioFormat;
use super::output::{CpalOutput, OutputDevice};
use super::prefetch::Prefetcher;
use super::stream::{Renderer, StreamState};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Transport state, independent of whether the stream has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    /// Short status marker for text displays
    pub fn icon(self) -> &'static str {
        match self {
            Self::Playing => "[>]",
            Self::Paused => "[||]",
            Self::Stopped => "[.]",
        }
    }
}

/// Streams one file at a time to an output device.
///
/// The device pulls samples from a ring buffer that the active decoder
/// fills, either ahead of time on the prefetch thread or inline when the
/// buffer runs dry. All control methods run on the owning thread.
pub struct PlaybackEngine<D: OutputDevice = CpalOutput> {
    config: EngineConfig,
    device: D,
    stream: Arc<Mutex<StreamState>>,
    volume: Arc<Mutex<f32>>,
    transport: TransportState,
    prefetcher: Option<Prefetcher>,
}

impl PlaybackEngine<CpalOutput> {
    /// Open the configured output device and get ready to play
    pub fn init(config: EngineConfig) -> Result<Self> {
        let output = config.output.clone();
        Self::with_device(config, move |renderer| CpalOutput::open(&output, renderer))
    }
}

impl<D: OutputDevice> PlaybackEngine<D> {
    /// Build an engine around a device created by `open_device`, which is
    /// handed the renderer it must call for every period.
    pub fn with_device<F>(config: EngineConfig, open_device: F) -> Result<Self>
    where
        F: FnOnce(Renderer) -> Result<D>,
    {
        config.validate()?;

        let stream = Arc::new(Mutex::new(StreamState::new(config.buffer_capacity)));
        let volume = Arc::new(Mutex::new(config.initial_volume));

        let device = open_device(Renderer::new(Arc::clone(&stream), Arc::clone(&volume)))?;

        let prefetcher = if config.prefetch.enabled {
            let interval = Duration::from_millis(config.prefetch.interval_ms);
            Some(Prefetcher::spawn(Arc::clone(&stream), interval)?)
        } else {
            None
        };

        info!(
            "Playback engine ready: {} Hz output, {} sample buffer, prefetch {}",
            config.output.sample_rate,
            config.buffer_capacity,
            if prefetcher.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            device,
            stream,
            volume,
            transport: TransportState::Stopped,
            prefetcher,
        })
    }

    /// Stop whatever is playing, then open and play `path`.
    /// On failure the engine is left stopped with no file loaded.
    pub fn play(&mut self, path: &Path) -> Result<()> {
        self.stop();

        let format = AudioFormat::from_path(path)
            .ok_or_else(|| EngineError::UnsupportedFormat(path.to_path_buf()))?;
        let adapter = DecoderAdapter::open(format, path, &self.config.decoder)?;

        info!("Loading {:?} ({})", path, format);
        self.load(adapter)
    }

    /// Start playing an already opened decoder
    pub fn load(&mut self, adapter: DecoderAdapter) -> Result<()> {
        self.stop();

        let info = {
            let mut stream = self.stream.lock();
            stream.begin(adapter);
            stream.info()
        };

        if let Err(e) = self.device.start() {
            self.stream.lock().teardown();
            return Err(e);
        }
        self.transport = TransportState::Playing;

        info!(
            "Playing: {} Hz, {} channels, {} frames",
            info.sample_rate, info.channels, info.total_samples
        );
        Ok(())
    }

    /// Halt output and drop the current file. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.transport != TransportState::Stopped {
            if let Err(e) = self.device.stop() {
                warn!("Failed to halt output: {}", e);
            }
        }

        // The render callback can only observe the stream before or after this
        if self.stream.lock().teardown().is_some() {
            info!("Stopped");
        }
        self.transport = TransportState::Stopped;
    }

    /// Playing -> Paused -> Playing. Does nothing while stopped.
    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.transport {
            TransportState::Playing => {
                self.device.stop()?;
                self.transport = TransportState::Paused;
                info!("Paused");
            }
            TransportState::Paused => {
                self.device.start()?;
                self.transport = TransportState::Playing;
                info!("Resumed");
            }
            TransportState::Stopped => {}
        }
        Ok(())
    }

    /// Jump to `seconds` into the current file. Negative values seek to the start.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.transport == TransportState::Stopped {
            return Err(EngineError::NotPlaying);
        }
        if !seconds.is_finite() {
            return Err(EngineError::Seek(format!("invalid seek target {}", seconds)));
        }

        let frame = self.stream.lock().seek(seconds)?;
        debug!("Seeked to {:.2}s (frame {})", seconds.max(0.0), frame);
        Ok(())
    }

    /// Seek relative to the current position
    pub fn seek_by(&mut self, delta_seconds: f64) -> Result<()> {
        let target = self.position() + delta_seconds;
        self.seek(target)
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        *self.volume.lock() = volume;
    }

    /// Change the volume by `delta` and return the clamped result
    pub fn adjust_volume(&self, delta: f32) -> f32 {
        let mut volume = self.volume.lock();
        let adjusted = (*volume + delta).clamp(0.0, 1.0);
        if !adjusted.is_nan() {
            *volume = adjusted;
        }
        *volume
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    pub fn state(&self) -> TransportState {
        self.transport
    }

    /// Codec of the loaded file, if any
    pub fn format(&self) -> Option<AudioFormat> {
        self.stream.lock().format()
    }

    /// The stream has ended and everything buffered has been rendered
    pub fn is_finished(&self) -> bool {
        self.stream.lock().is_finished()
    }

    /// Seconds rendered so far, counted from the last seek or file start
    pub fn position(&self) -> f64 {
        let stream = self.stream.lock();
        seconds(stream.samples_played(), stream.info().sample_rate)
    }

    /// Length of the loaded file in seconds (0 when unknown)
    pub fn duration(&self) -> f64 {
        let info = self.stream.lock().info();
        seconds(info.total_samples, info.sample_rate)
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.stream.lock().info()
    }

    /// A render handle sharing this engine's stream and volume
    pub fn renderer(&self) -> Renderer {
        Renderer::new(Arc::clone(&self.stream), Arc::clone(&self.volume))
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Stop playback and release the prefetch thread. Dropping the engine
    /// does the same.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.stop();
        if let Some(mut prefetcher) = self.prefetcher.take() {
            prefetcher.stop();
            debug!("Playback engine shut down");
        }
    }
}

impl<D: OutputDevice> Drop for PlaybackEngine<D> {
    fn drop(&mut self) {
        self.release();
    }
}

fn seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    }
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}
