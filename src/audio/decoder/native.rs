// Native decoding sessions backed by Symphonia
// Each session owns one open file, its demuxer and its codec decoder.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, SampleBuffer, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::{i24, Sample};
use symphonia::core::units::Time;
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::flac::{FrameSource, PcmFrame};
use super::vorbis::PcmSource;
use super::StreamInfo;
use crate::error::{EngineError, Result};

/// Corrupt packets skipped in a row before a read gives up
const MAX_CONSECUTIVE_ERRORS: usize = 10;

struct Session {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    params: CodecParameters,
    /// Frames still to drop from decoded output to land exactly on a seek target
    skip: u64,
}

impl Session {
    /// Open an audio file and prepare for decoding
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| EngineError::open(path, e))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint using the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| EngineError::open(path, format!("unrecognised stream: {}", e)))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::open(path, "no audio track found"))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| EngineError::open(path, format!("failed to create decoder: {}", e)))?;

        debug!(
            "Opened {:?}: track {}, {:?} Hz, {:?} channels, {:?} frames",
            path,
            track_id,
            params.sample_rate,
            params.channels.map(|c| c.count()),
            params.n_frames
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            params,
            skip: 0,
        })
    }

    fn info(&self) -> StreamInfo {
        StreamInfo {
            sample_rate: self.params.sample_rate.unwrap_or(0),
            channels: self.params.channels.map(|c| c.count() as u16).unwrap_or(0),
            total_samples: self.params.n_frames.unwrap_or(0),
        }
    }

    /// Decode the next packet of our track.
    /// Returns Ok(false) at end of stream; the audio is in `decoder.last_decoded()`.
    fn decode_next(&mut self) -> Result<bool> {
        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Reset the decoder and try again
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(EngineError::Decode(format!("failed to read packet: {}", e))),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(_) => return Ok(true),
                Err(SymphoniaError::DecodeError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping undecodable packet ({}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(EngineError::Decode(format!(
                            "gave up after {} corrupt packets: {}",
                            MAX_CONSECUTIVE_ERRORS, e
                        )));
                    }
                }
                Err(e) => return Err(EngineError::Decode(e.to_string())),
            }
        }
    }

    fn seek(&mut self, to: SeekTo) -> Result<()> {
        let seeked = self
            .format
            .seek(SeekMode::Accurate, to)
            .map_err(|e| EngineError::Seek(e.to_string()))?;

        // Reset decoder state after seek
        self.decoder.reset();

        // The demuxer lands on the packet holding the target, not the target itself
        self.skip = seeked.required_ts.saturating_sub(seeked.actual_ts);
        trace!(
            "Seeked: required ts {}, actual ts {}, skipping {} frames",
            seeked.required_ts,
            seeked.actual_ts,
            self.skip
        );
        Ok(())
    }
}

/// Take up to `frames` from the pending seek skip. Returns how many leading
/// frames of the current packet to drop.
fn take_skip(skip: &mut u64, frames: usize) -> usize {
    let n = (*skip).min(frames as u64);
    *skip -= n;
    n as usize
}

/// FLAC frames straight from the decoder, one packet per frame.
pub struct SymphoniaFrames {
    session: Session,
}

impl SymphoniaFrames {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            session: Session::open(path)?,
        })
    }
}

impl FrameSource for SymphoniaFrames {
    fn stream_info(&self) -> StreamInfo {
        self.session.info()
    }

    fn read_frame(&mut self, frame: &mut PcmFrame) -> Result<bool> {
        loop {
            if !self.session.decode_next()? {
                return Ok(false);
            }

            let decoded = self.session.decoder.last_decoded();
            let frames = decoded.frames();
            let skip = take_skip(&mut self.session.skip, frames);
            if skip < frames {
                copy_frame(decoded, frame, skip)?;
                return Ok(true);
            }
        }
    }

    fn seek_absolute(&mut self, sample: u64) -> Result<()> {
        let track_id = self.session.track_id;
        self.session.seek(SeekTo::TimeStamp {
            ts: sample,
            track_id,
        })
    }

    fn max_block_size(&self) -> Option<usize> {
        self.session.params.max_frames_per_packet.map(|n| n as usize)
    }
}

/// Copy a decoded buffer, minus its first `skip` frames, into `frame`. Integer
/// samples keep their native width so the adapter can normalise by bit depth.
fn copy_frame(decoded: AudioBufferRef<'_>, frame: &mut PcmFrame, skip: usize) -> Result<()> {
    match decoded {
        AudioBufferRef::S8(buf) => fill_planes(buf.as_ref(), frame, skip, 8, |s: i8| s as i32),
        AudioBufferRef::S16(buf) => fill_planes(buf.as_ref(), frame, skip, 16, |s: i16| s as i32),
        AudioBufferRef::S24(buf) => fill_planes(buf.as_ref(), frame, skip, 24, |s: i24| s.inner()),
        AudioBufferRef::S32(buf) => fill_planes(buf.as_ref(), frame, skip, 32, |s: i32| s),
        _ => {
            return Err(EngineError::Decode(
                "lossless decoder produced a non-integer sample format".to_string(),
            ))
        }
    }
    Ok(())
}

fn fill_planes<S: Sample>(
    buf: &AudioBuffer<S>,
    frame: &mut PcmFrame,
    skip: usize,
    bits_per_sample: u32,
    to_i32: impl Fn(S) -> i32,
) {
    let spec = buf.spec();
    frame.reset(spec.channels.count(), spec.rate, bits_per_sample);
    for (ch, plane) in frame.planes.iter_mut().enumerate() {
        let samples = buf.chan(ch);
        let start = skip.min(samples.len());
        plane.extend(samples[start..].iter().map(|&s| to_i32(s)));
    }
}

/// Ogg Vorbis served as 16-bit interleaved PCM in caller-sized chunks.
pub struct SymphoniaPcm {
    session: Session,
    sample_buf: Option<SampleBuffer<i16>>,
    pending: Vec<i16>,
    cursor: usize,
}

impl SymphoniaPcm {
    pub fn open(path: &Path) -> Result<Self> {
        let session = Session::open(path)?;
        if session.params.sample_rate.is_none() {
            return Err(EngineError::open(path, "stream has no sample rate"));
        }
        Ok(Self {
            session,
            sample_buf: None,
            pending: Vec::new(),
            cursor: 0,
        })
    }

    /// Decode packets until there is unread PCM. Returns false at end of stream.
    fn refill(&mut self) -> Result<bool> {
        while self.cursor >= self.pending.len() {
            if !self.session.decode_next()? {
                return Ok(false);
            }

            let decoded = self.session.decoder.last_decoded();
            let spec = *decoded.spec();
            let needed = decoded.capacity() * spec.channels.count();
            let skip = take_skip(&mut self.session.skip, decoded.frames());

            if self.sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.clear();
                self.pending.extend_from_slice(buf.samples());
                // A packet skipped whole leaves the cursor at the end and the loop decodes again
                self.cursor = (skip * spec.channels.count()).min(self.pending.len());
            }
        }
        Ok(true)
    }
}

impl PcmSource for SymphoniaPcm {
    fn stream_info(&self) -> StreamInfo {
        self.session.info()
    }

    fn read_pcm(&mut self, out: &mut [i16]) -> Result<usize> {
        if out.is_empty() || !self.refill()? {
            return Ok(0);
        }

        let n = (self.pending.len() - self.cursor).min(out.len());
        out[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    fn seek_time(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(EngineError::Seek(format!("invalid seek target {}", seconds)));
        }
        let time = Time::new(seconds as u64, seconds.fract());
        let track_id = self.session.track_id;
        self.session.seek(SeekTo::Time {
            time,
            track_id: Some(track_id),
        })?;

        self.pending.clear();
        self.cursor = 0;
        Ok(())
    }
}
