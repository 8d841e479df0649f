// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod decoder;
pub mod engine;
pub mod format;
pub mod output;
pub mod prefetch;
pub mod ring_buffer;
pub mod stream;

pub use decoder::{DecoderAdapter, StreamInfo};
pub use engine::{format_time, PlaybackEngine, TransportState};
pub use format::AudioFormat;
pub use output::{CpalOutput, OutputDevice};
pub use stream::Renderer;
