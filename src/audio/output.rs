// Audio output using cpal
// The device pulls stereo f32 from the engine through a `Renderer`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, error, info, warn};

use super::stream::Renderer;
use crate::config::OutputSettings;
use crate::error::{EngineError, Result};

/// Channel count every output runs at
pub const OUTPUT_CHANNELS: u16 = 2;

/// Something that periodically asks the engine to render.
///
/// `start` and `stop` may each be called repeatedly.
pub trait OutputDevice {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

pub struct CpalOutput {
    stream: Stream,
    device_name: String,
    sample_rate: u32,
}

impl CpalOutput {
    /// Names of the host's output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| EngineError::AudioDevice(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|d| d.name().ok())
            .collect();
        Ok(devices)
    }

    /// Open the output device and build a paused stream that renders through `renderer`.
    pub fn open(settings: &OutputSettings, renderer: Renderer) -> Result<Self> {
        let host = cpal::default_host();
        let device = Self::select_device(&host, settings.device_name.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let (mut config, sample_format) = Self::stereo_config(&device, settings.sample_rate)?;
        if let Some(frames) = settings.buffer_frames {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        debug!(
            "Output config: {} Hz, {} channels, {:?}, buffer {:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, renderer)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, renderer)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, renderer)?,
            format => {
                return Err(EngineError::AudioDevice(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        // Some hosts start a stream as soon as it is built
        stream
            .pause()
            .map_err(|e| EngineError::AudioDevice(format!("Failed to pause stream: {}", e)))?;

        info!("Opened audio device: {}", device_name);

        Ok(Self {
            stream,
            device_name,
            sample_rate: settings.sample_rate,
        })
    }

    fn select_device(host: &cpal::Host, name: Option<&str>) -> Result<Device> {
        if let Some(name) = name {
            let mut devices = host
                .output_devices()
                .map_err(|e| EngineError::AudioDevice(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                return Ok(device);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }

        host.default_output_device()
            .ok_or_else(|| EngineError::AudioDevice("No output device available".to_string()))
    }

    /// Find a stereo configuration at `sample_rate`, preferring f32 samples.
    fn stereo_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let candidates: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| EngineError::AudioDevice(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                c.channels() == OUTPUT_CHANNELS
                    && c.min_sample_rate().0 <= sample_rate
                    && c.max_sample_rate().0 >= sample_rate
            })
            .collect();

        let chosen = candidates
            .iter()
            .find(|c| c.sample_format() == SampleFormat::F32)
            .or_else(|| candidates.first())
            .cloned()
            .ok_or_else(|| {
                EngineError::AudioDevice(format!(
                    "Device has no {}-channel configuration at {} Hz",
                    OUTPUT_CHANNELS, sample_rate
                ))
            })?;

        let sample_format = chosen.sample_format();
        let config = chosen.with_sample_rate(cpal::SampleRate(sample_rate)).config();
        Ok((config, sample_format))
    }

    fn build_stream<T: SizedSample + FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        renderer: Renderer,
    ) -> Result<Stream> {
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Only grows when the host changes its period size
                    if scratch.len() != data.len() {
                        scratch.resize(data.len(), 0.0);
                    }
                    renderer.render(&mut scratch);

                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                move |err| {
                    error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| EngineError::AudioDevice(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl OutputDevice for CpalOutput {
    fn start(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| EngineError::AudioDevice(format!("Failed to start stream: {}", e)))
    }

    fn stop(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| EngineError::AudioDevice(format!("Failed to pause stream: {}", e)))
    }
}
