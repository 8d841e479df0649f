// Bitstream decoder adapter (Ogg Vorbis)

use std::path::Path;
use tracing::{debug, error};

use super::native::SymphoniaPcm;
use super::StreamInfo;
use crate::audio::ring_buffer::RingBuffer;
use crate::error::Result;

/// A native bitstream decoder serving 16-bit interleaved PCM.
pub trait PcmSource: Send {
    /// Stream properties, fully known once the source is open
    fn stream_info(&self) -> StreamInfo;

    /// Fill up to `out.len()` samples. Ok(0) means end of stream.
    fn read_pcm(&mut self, out: &mut [i16]) -> Result<usize>;

    /// Reposition to `seconds` from the start of the stream
    fn seek_time(&mut self, seconds: f64) -> Result<()>;
}

pub struct VorbisAdapter {
    source: Box<dyn PcmSource>,
    info: StreamInfo,
    chunk: Vec<i16>,
}

impl VorbisAdapter {
    pub fn open(path: &Path, chunk_samples: usize) -> Result<Self> {
        Ok(Self::new(Box::new(SymphoniaPcm::open(path)?), chunk_samples))
    }

    /// `chunk_samples` is how many 16-bit samples one decode-step requests
    pub fn new(source: Box<dyn PcmSource>, chunk_samples: usize) -> Self {
        let info = source.stream_info();
        Self {
            source,
            info,
            chunk: vec![0; chunk_samples.max(1)],
        }
    }

    pub fn info(&self) -> StreamInfo {
        self.info
    }

    /// Decode one chunk into `ring`. Returns false at end of stream or on error.
    pub fn decode_step(&mut self, ring: &mut RingBuffer) -> bool {
        let read = match self.source.read_pcm(&mut self.chunk) {
            Ok(0) => {
                debug!("Vorbis end of stream");
                return false;
            }
            Ok(n) => n,
            Err(e) => {
                error!("Vorbis decode error: {}", e);
                return false;
            }
        };

        write_pcm(&self.chunk[..read], self.info.channels, ring);
        true
    }

    /// Time-based seek. Returns the sample index playback now starts from.
    pub fn seek(&mut self, seconds: f64) -> Result<u64> {
        let seconds = seconds.max(0.0);
        self.source.seek_time(seconds)?;
        Ok((seconds * self.info.sample_rate as f64) as u64)
    }

    /// Ring space one decode-step may need
    pub fn max_step_samples(&self) -> usize {
        if self.info.channels == 1 {
            self.chunk.len() * 2
        } else {
            self.chunk.len()
        }
    }
}

/// Convert 16-bit PCM to f32 and append it to the ring.
///
/// Mono input is written twice per sample. Anything else is copied
/// positionally: sources with more than two channels are not folded.
/// Stops, dropping the rest of the chunk, when the ring is full.
fn write_pcm(samples: &[i16], channels: u16, ring: &mut RingBuffer) -> usize {
    let mut written = 0;

    for &raw in samples {
        let sample = raw as f32 / 32768.0;

        if channels == 1 {
            if ring.free() < 2 {
                break;
            }
            ring.push(sample);
            ring.push(sample);
            written += 2;
        } else {
            if !ring.push(sample) {
                break;
            }
            written += 1;
        }
    }

    written
}
