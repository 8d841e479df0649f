// Decoder adapters
// Each adapter wraps one open native decoding session and writes
// normalized stereo f32 into the engine's ring buffer.

pub mod flac;
pub mod native;
pub mod vorbis;

use std::path::Path;

use self::flac::FlacAdapter;
use self::vorbis::VorbisAdapter;
use super::format::AudioFormat;
use super::ring_buffer::RingBuffer;
use crate::config::DecoderSettings;
use crate::error::{EngineError, Result};

/// Stream properties reported by an open decoder. Unknown values are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Length in frames (samples per channel)
    pub total_samples: u64,
}

/// The active decoder, one variant per supported codec.
pub enum DecoderAdapter {
    Flac(FlacAdapter),
    Vorbis(VorbisAdapter),
}

impl DecoderAdapter {
    /// Open `path` with the adapter for `format`
    pub fn open(format: AudioFormat, path: &Path, settings: &DecoderSettings) -> Result<Self> {
        match format {
            AudioFormat::Flac => Ok(Self::Flac(FlacAdapter::open(path)?)),
            AudioFormat::Vorbis => Ok(Self::Vorbis(VorbisAdapter::open(
                path,
                settings.vorbis_chunk_samples(),
            )?)),
        }
    }

    pub fn format(&self) -> AudioFormat {
        match self {
            Self::Flac(_) => AudioFormat::Flac,
            Self::Vorbis(_) => AudioFormat::Vorbis,
        }
    }

    pub fn info(&self) -> StreamInfo {
        match self {
            Self::Flac(a) => a.info(),
            Self::Vorbis(a) => a.info(),
        }
    }

    /// Decode one unit (a FLAC frame or a Vorbis chunk) into `ring`.
    /// Returns false when the stream can produce nothing more.
    pub fn decode_step(&mut self, ring: &mut RingBuffer) -> bool {
        match self {
            Self::Flac(a) => a.decode_step(ring),
            Self::Vorbis(a) => a.decode_step(ring),
        }
    }

    /// Seek to `seconds` (negative clamps to 0, non-finite is rejected).
    /// Returns the new playback position in frames.
    pub fn seek(&mut self, seconds: f64) -> Result<u64> {
        if !seconds.is_finite() {
            return Err(EngineError::Seek(format!("invalid seek target {}", seconds)));
        }
        match self {
            Self::Flac(a) => a.seek(seconds),
            Self::Vorbis(a) => a.seek(seconds),
        }
    }

    /// Upper bound on the samples one decode-step writes
    pub fn max_step_samples(&self) -> usize {
        match self {
            Self::Flac(a) => a.max_step_samples(),
            Self::Vorbis(a) => a.max_step_samples(),
        }
    }
}

impl From<FlacAdapter> for DecoderAdapter {
    fn from(adapter: FlacAdapter) -> Self {
        Self::Flac(adapter)
    }
}

impl From<VorbisAdapter> for DecoderAdapter {
    fn from(adapter: VorbisAdapter) -> Self {
        Self::Vorbis(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::vorbis::PcmSource;
    use super::*;

    struct Endless;

    impl PcmSource for Endless {
        fn stream_info(&self) -> StreamInfo {
            StreamInfo {
                sample_rate: 8000,
                channels: 2,
                total_samples: 8000,
            }
        }

        fn read_pcm(&mut self, out: &mut [i16]) -> Result<usize> {
            out.fill(0);
            Ok(out.len())
        }

        fn seek_time(&mut self, seconds: f64) -> Result<()> {
            assert!(seconds.is_finite());
            Ok(())
        }
    }

    #[test]
    fn seek_rejects_non_finite_targets() {
        let mut adapter: DecoderAdapter = VorbisAdapter::new(Box::new(Endless), 64).into();
        assert!(matches!(adapter.seek(f64::INFINITY), Err(EngineError::Seek(_))));
        assert!(matches!(adapter.seek(f64::NAN), Err(EngineError::Seek(_))));
        assert_eq!(adapter.seek(0.5).unwrap(), 4000);
    }
}
