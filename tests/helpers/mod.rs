//! Test helpers for ringplay integration tests
//!
//! - flac_writer: write small, valid FLAC files with known content
//! - sources: synthetic native sources and a manually driven output device

#![allow(dead_code, unused_imports)]

pub mod flac_writer;
pub mod sources;

pub use flac_writer::{write_constant_flac, write_flac, FlacSpec};
pub use sources::{ConstantPcm, ManualDevice, SlowPcm};
