// ringplay - streaming FLAC / Ogg Vorbis playback engine
// Module declarations
pub mod audio;
pub mod config;
pub mod error;

pub use audio::{
    format_time, AudioFormat, CpalOutput, DecoderAdapter, OutputDevice, PlaybackEngine, Renderer,
    StreamInfo, TransportState,
};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
