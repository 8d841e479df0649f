// Engine configuration and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// Output device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub device_name: Option<String>, // None = host default device
    pub sample_rate: u32,
    pub buffer_frames: Option<u32>, // None = device default period
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: 44100,
            buffer_frames: None,
        }
    }
}

/// Decoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSettings {
    /// Bytes of 16-bit PCM requested from the Vorbis decoder per decode-step
    pub vorbis_chunk_bytes: usize,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            vorbis_chunk_bytes: 4096,
        }
    }
}

impl DecoderSettings {
    /// Chunk size in 16-bit samples
    pub fn vorbis_chunk_samples(&self) -> usize {
        self.vorbis_chunk_bytes / 2
    }
}

/// Background decode-ahead settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5,
        }
    }
}

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub output: OutputSettings,
    /// Ring buffer capacity in f32 samples (stereo interleaved)
    pub buffer_capacity: usize,
    pub decoder: DecoderSettings,
    pub prefetch: PrefetchSettings,
    pub initial_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output: OutputSettings::default(),
            buffer_capacity: 16384,
            decoder: DecoderSettings::default(),
            prefetch: PrefetchSettings::default(),
            initial_volume: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file, or return defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!("Saved engine config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.sample_rate == 0 {
            return Err(EngineError::Config("output.sample_rate must be > 0".to_string()));
        }
        if self.buffer_capacity < 4 {
            return Err(EngineError::Config(
                "buffer_capacity must hold at least two stereo frames".to_string(),
            ));
        }
        let chunk = self.decoder.vorbis_chunk_bytes;
        if chunk == 0 || chunk % 2 != 0 {
            return Err(EngineError::Config(format!(
                "decoder.vorbis_chunk_bytes must be a positive even number, got {}",
                chunk
            )));
        }
        if self.prefetch.interval_ms == 0 {
            return Err(EngineError::Config("prefetch.interval_ms must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(EngineError::Config(format!(
                "initial_volume must be between 0.0 and 1.0, got {}",
                self.initial_volume
            )));
        }
        Ok(())
    }
}
