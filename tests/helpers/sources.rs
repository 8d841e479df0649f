//! Synthetic native sources and a test output device

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ringplay::audio::decoder::vorbis::{PcmSource, VorbisAdapter};
use ringplay::{DecoderAdapter, OutputDevice, Result, StreamInfo};

/// Vorbis-style source yielding a constant 16-bit value for a fixed length
pub struct ConstantPcm {
    info: StreamInfo,
    remaining: u64,
    value: i16,
}

impl ConstantPcm {
    /// `frames` frames of `channels` interleaved samples at `sample_rate`
    pub fn new(sample_rate: u32, channels: u16, frames: u64, value: i16) -> Self {
        Self {
            info: StreamInfo {
                sample_rate,
                channels,
                total_samples: frames,
            },
            remaining: frames * u64::from(channels),
            value,
        }
    }

    /// Wrap in an adapter using the default 2048-sample chunk
    pub fn into_adapter(self) -> DecoderAdapter {
        VorbisAdapter::new(Box::new(self), 2048).into()
    }
}

impl PcmSource for ConstantPcm {
    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn read_pcm(&mut self, out: &mut [i16]) -> Result<usize> {
        let n = self.remaining.min(out.len() as u64) as usize;
        out[..n].fill(self.value);
        self.remaining -= n as u64;
        Ok(n)
    }

    fn seek_time(&mut self, seconds: f64) -> Result<()> {
        let frame = (seconds * f64::from(self.info.sample_rate)) as u64;
        let left = self.info.total_samples.saturating_sub(frame);
        self.remaining = left * u64::from(self.info.channels);
        Ok(())
    }
}

/// A `ConstantPcm` whose every read takes `delay`, like a slow decoder
pub struct SlowPcm {
    inner: ConstantPcm,
    delay: Duration,
}

impl SlowPcm {
    pub fn new(inner: ConstantPcm, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn into_adapter(self) -> DecoderAdapter {
        VorbisAdapter::new(Box::new(self), 2048).into()
    }
}

impl PcmSource for SlowPcm {
    fn stream_info(&self) -> StreamInfo {
        self.inner.stream_info()
    }

    fn read_pcm(&mut self, out: &mut [i16]) -> Result<usize> {
        thread::sleep(self.delay);
        self.inner.read_pcm(out)
    }

    fn seek_time(&mut self, seconds: f64) -> Result<()> {
        self.inner.seek_time(seconds)
    }
}

/// Output device the test drives by hand through the engine's renderer
#[derive(Clone, Default)]
pub struct ManualDevice {
    running: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl ManualDevice {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl OutputDevice for ManualDevice {
    fn start(&mut self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}
