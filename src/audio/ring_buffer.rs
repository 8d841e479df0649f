// Fixed-capacity sample store between the decoders and the render callback
//
// Holds interleaved stereo f32 samples exactly as the decoders produced them.
// Gain is applied only on the way out (`drain_scaled`).

use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

/// Reference capacity: 16384 samples, about 4096 stereo frames.
pub const DEFAULT_CAPACITY: usize = 16384;

pub struct RingBuffer {
    rb: HeapRb<f32>,
}

impl RingBuffer {
    /// Create a buffer holding `capacity` samples. Capacity must be non-zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            rb: HeapRb::new(capacity),
        }
    }

    /// Append one sample. Returns false (and stores nothing) when full.
    pub fn push(&mut self, sample: f32) -> bool {
        self.rb.try_push(sample).is_ok()
    }

    /// Discard up to `n` samples from the read side, returning how many went.
    pub fn drain(&mut self, n: usize) -> usize {
        self.rb.skip(n)
    }

    /// Move up to `out.len()` samples into `out`, multiplied by `gain`.
    pub fn drain_scaled(&mut self, out: &mut [f32], gain: f32) -> usize {
        let copied = self.rb.pop_slice(out);
        for sample in &mut out[..copied] {
            *sample *= gain;
        }
        copied
    }

    /// Number of samples waiting to be read
    pub fn len(&self) -> usize {
        self.rb.occupied_len()
    }

    /// Number of samples that can still be pushed
    pub fn free(&self) -> usize {
        self.rb.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.rb.capacity().get()
    }

    pub fn is_empty(&self) -> bool {
        self.rb.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rb.is_full()
    }

    /// Drop everything currently buffered
    pub fn clear(&mut self) {
        let len = self.len();
        self.rb.skip(len);
    }
}
