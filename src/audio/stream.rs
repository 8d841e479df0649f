// Shared stream state
//
// Everything the render callback, the prefetch thread and the control side
// touch together lives in `StreamState`, behind one coarse lock.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::decoder::{DecoderAdapter, StreamInfo};
use super::format::AudioFormat;
use super::ring_buffer::RingBuffer;
use crate::error::{EngineError, Result};

pub struct StreamState {
    ring: RingBuffer,
    source: Option<DecoderAdapter>,
    /// Set once a render could not produce samples for the active stream
    finished: bool,
    /// The decoder reported end of stream; no more decode-steps until a seek
    exhausted: bool,
    samples_played: u64,
}

impl StreamState {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            source: None,
            finished: false,
            exhausted: false,
            samples_played: 0,
        }
    }

    /// Install a freshly opened decoder and pre-fill with one decode-step.
    pub fn begin(&mut self, adapter: DecoderAdapter) {
        self.ring.clear();
        self.samples_played = 0;
        self.finished = false;
        self.exhausted = false;

        let source = self.source.insert(adapter);
        if !source.decode_step(&mut self.ring) {
            debug!("Pre-fill produced no samples");
            self.exhausted = true;
        }
    }

    /// Drop the active decoder and everything it buffered.
    /// `finished` is left as it was.
    pub fn teardown(&mut self) -> Option<DecoderAdapter> {
        self.ring.clear();
        self.exhausted = false;
        self.source.take()
    }

    /// Clear the buffer, then reposition the decoder. On failure the buffer
    /// stays empty and the play position is not changed.
    pub fn seek(&mut self, seconds: f64) -> Result<u64> {
        let source = self.source.as_mut().ok_or(EngineError::NotPlaying)?;
        self.ring.clear();

        let position = source.seek(seconds)?;
        self.samples_played = position;
        self.finished = false;
        self.exhausted = false;
        Ok(position)
    }

    /// Run one decode-step if the buffer has room for a whole step.
    /// Returns true when a step ran.
    ///
    /// Callers holding the stream lock run at most one step per acquisition,
    /// so a waiting render call is delayed by a single step at most.
    pub fn fill_step(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        if self.exhausted || self.ring.free() < source.max_step_samples() {
            return false;
        }

        if !source.decode_step(&mut self.ring) {
            debug!("Prefetch reached end of stream");
            self.exhausted = true;
        }
        true
    }

    /// Fill `out` (interleaved stereo) with volume-scaled samples.
    ///
    /// Decodes inline whenever the buffer runs dry. When nothing more can be
    /// produced the rest of `out` is zeroed and the stream is marked finished.
    pub fn render(&mut self, out: &mut [f32], volume: f32) {
        let mut pos = 0;

        while pos < out.len() {
            if self.ring.is_empty() {
                let produced = match self.source.as_mut() {
                    Some(source) if !self.exhausted => source.decode_step(&mut self.ring),
                    _ => false,
                };
                if !produced {
                    self.exhausted = true;
                }

                if !produced || self.ring.is_empty() {
                    out[pos..].fill(0.0);
                    if self.source.is_some() && !self.finished {
                        info!("Playback finished at frame {}", self.samples_played);
                        self.finished = true;
                    }
                    return;
                }
            }

            let copied = self.ring.drain_scaled(&mut out[pos..], volume);
            pos += copied;
            self.samples_played += (copied / 2) as u64;
        }
    }

    pub fn info(&self) -> StreamInfo {
        self.source.as_ref().map(DecoderAdapter::info).unwrap_or_default()
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.source.as_ref().map(DecoderAdapter::format)
    }

    pub fn samples_played(&self) -> u64 {
        self.samples_played
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Finished and every buffered sample has been rendered
    pub fn is_finished(&self) -> bool {
        self.finished && self.ring.is_empty()
    }

    pub fn buffered(&self) -> usize {
        self.ring.len()
    }
}

/// Handle given to an output device so it can pull samples.
#[derive(Clone)]
pub struct Renderer {
    stream: Arc<Mutex<StreamState>>,
    volume: Arc<Mutex<f32>>,
}

impl Renderer {
    pub(crate) fn new(stream: Arc<Mutex<StreamState>>, volume: Arc<Mutex<f32>>) -> Self {
        Self { stream, volume }
    }

    /// Render one device period of interleaved stereo f32
    pub fn render(&self, out: &mut [f32]) {
        let volume = *self.volume.lock();
        self.stream.lock().render(out, volume);
    }
}
