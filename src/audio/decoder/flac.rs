// Lossless-frame decoder adapter (FLAC)

use std::path::Path;
use tracing::{debug, error};

use super::native::SymphoniaFrames;
use super::StreamInfo;
use crate::audio::ring_buffer::RingBuffer;
use crate::error::Result;

/// Samples kept free at the top of the ring while writing a frame
const SAFETY_MARGIN: usize = 2;

/// Block size assumed when the stream does not declare its maximum
const FALLBACK_BLOCK_SIZE: usize = 4096;

/// One decoded native frame: planar integer samples at their source width.
#[derive(Debug, Clone, Default)]
pub struct PcmFrame {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub planes: Vec<Vec<i32>>,
}

impl PcmFrame {
    /// Prepare for a new frame without giving back plane allocations
    pub fn reset(&mut self, channels: usize, sample_rate: u32, bits_per_sample: u32) {
        self.sample_rate = sample_rate;
        self.bits_per_sample = bits_per_sample;
        self.planes.resize_with(channels, Vec::new);
        for plane in &mut self.planes {
            plane.clear();
        }
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Samples per channel
    pub fn block_size(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }
}

/// A native frame decoder session.
pub trait FrameSource: Send {
    /// What the stream header declared. Unknown fields are 0.
    fn stream_info(&self) -> StreamInfo;

    /// Decode exactly one frame into `frame`. Ok(false) means end of stream.
    fn read_frame(&mut self, frame: &mut PcmFrame) -> Result<bool>;

    /// Reposition so the next frame starts at `sample`
    fn seek_absolute(&mut self, sample: u64) -> Result<()>;

    /// Largest frame in samples per channel, if the stream declares it
    fn max_block_size(&self) -> Option<usize> {
        None
    }
}

pub struct FlacAdapter {
    source: Box<dyn FrameSource>,
    info: StreamInfo,
    frame: PcmFrame,
}

impl FlacAdapter {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Box::new(SymphoniaFrames::open(path)?)))
    }

    pub fn new(source: Box<dyn FrameSource>) -> Self {
        let info = source.stream_info();
        Self {
            source,
            info,
            frame: PcmFrame::default(),
        }
    }

    pub fn info(&self) -> StreamInfo {
        self.info
    }

    /// Decode one frame into `ring`. Returns false once the stream is exhausted
    /// or the decoder failed; failures are logged here.
    pub fn decode_step(&mut self, ring: &mut RingBuffer) -> bool {
        match self.source.read_frame(&mut self.frame) {
            Ok(true) => {
                // Streams without a usable header learn their format from the first frame
                if self.info.sample_rate == 0 {
                    self.info.sample_rate = self.frame.sample_rate;
                    self.info.channels = self.frame.channels() as u16;
                    debug!(
                        "FLAC format from first frame: {} Hz, {} channels",
                        self.info.sample_rate, self.info.channels
                    );
                }
                write_frame(&self.frame, ring);
                true
            }
            Ok(false) => {
                debug!("FLAC end of stream");
                false
            }
            Err(e) => {
                error!("FLAC decode error: {}", e);
                false
            }
        }
    }

    /// Seek to `seconds`, clamped inside the stream. Returns the sample index
    /// playback now starts from.
    pub fn seek(&mut self, seconds: f64) -> Result<u64> {
        let mut target = (seconds.max(0.0) * self.info.sample_rate as f64) as u64;
        if target >= self.info.total_samples {
            target = self.info.total_samples.saturating_sub(1);
        }
        self.source.seek_absolute(target)?;
        Ok(target)
    }

    /// Ring space one decode-step may need
    pub fn max_step_samples(&self) -> usize {
        self.source.max_block_size().unwrap_or(FALLBACK_BLOCK_SIZE) * 2
    }
}

/// Normalise a frame to stereo f32 and append it to the ring.
///
/// Mono is duplicated into both channels; for two or more channels the first
/// two are kept. Writing stops, dropping the rest of the frame, once the ring
/// is within `SAFETY_MARGIN` samples of full.
fn write_frame(frame: &PcmFrame, ring: &mut RingBuffer) -> usize {
    let bits = frame.bits_per_sample.clamp(1, 32);
    let scale = 1.0 / (1u64 << (bits - 1)) as f32;
    let limit = ring.capacity().saturating_sub(SAFETY_MARGIN);
    let mut written = 0;

    for i in 0..frame.block_size() {
        if ring.len() >= limit {
            break;
        }

        if frame.channels() == 1 {
            let sample = frame.planes[0][i] as f32 * scale;
            ring.push(sample);
            ring.push(sample);
            written += 2;
        } else {
            for plane in frame.planes.iter().take(2) {
                ring.push(plane[i] as f32 * scale);
                written += 1;
            }
        }
    }

    written
}
