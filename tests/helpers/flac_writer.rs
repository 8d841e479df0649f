//! Minimal FLAC encoder for test fixtures
//!
//! Writes a STREAMINFO block followed by fixed-blocksize frames that use
//! VERBATIM subframes only. The output is larger than a real encoder's but is
//! a valid stream any FLAC decoder accepts.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Block size used for every frame except the last
pub const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct FlacSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// 8, 16 or 24
    pub bits_per_sample: u32,
}

impl FlacSpec {
    pub fn cd(channels: u16) -> Self {
        Self {
            sample_rate: 44100,
            channels,
            bits_per_sample: 16,
        }
    }
}

/// Write `frames` frames where every sample of every channel is `value`
pub fn write_constant_flac(path: &Path, spec: FlacSpec, frames: usize, value: i32) -> io::Result<()> {
    let planes = vec![vec![value; frames]; spec.channels as usize];
    write_flac(path, spec, &planes)
}

/// Write planar samples (one Vec per channel, all the same length)
pub fn write_flac(path: &Path, spec: FlacSpec, planes: &[Vec<i32>]) -> io::Result<()> {
    assert_eq!(planes.len(), spec.channels as usize);
    let total = planes.first().map_or(0, Vec::len);

    let mut out = Vec::new();
    out.extend_from_slice(b"fLaC");
    out.extend_from_slice(&stream_info(spec, total as u64));

    for (index, start) in (0..total).step_by(BLOCK_SIZE).enumerate() {
        let end = (start + BLOCK_SIZE).min(total);
        out.extend_from_slice(&frame(spec, index as u64, planes, start..end));
    }

    File::create(path)?.write_all(&out)
}

fn stream_info(spec: FlacSpec, total: u64) -> Vec<u8> {
    let mut block = Vec::with_capacity(38);
    // Last metadata block, type 0, length 34
    block.extend_from_slice(&[0x80, 0x00, 0x00, 34]);
    block.extend_from_slice(&(BLOCK_SIZE as u16).to_be_bytes());
    block.extend_from_slice(&(BLOCK_SIZE as u16).to_be_bytes());
    // Frame sizes unknown
    block.extend_from_slice(&[0; 6]);

    let packed: u64 = (u64::from(spec.sample_rate) << 44)
        | (u64::from(spec.channels - 1) << 41)
        | (u64::from(spec.bits_per_sample - 1) << 36)
        | (total & 0xF_FFFF_FFFF);
    block.extend_from_slice(&packed.to_be_bytes());

    // MD5 unset
    block.extend_from_slice(&[0; 16]);
    block
}

fn frame(spec: FlacSpec, number: u64, planes: &[Vec<i32>], range: std::ops::Range<usize>) -> Vec<u8> {
    let block_len = range.len();
    let mut out = vec![0xFF, 0xF8];

    // Block size from a 16-bit field at the end of the header
    let rate_code = match spec.sample_rate {
        44100 => 0b1001,
        48000 => 0b1010,
        _ => 0b0000,
    };
    out.push((0b0111 << 4) | rate_code);

    let size_code = match spec.bits_per_sample {
        8 => 0b001,
        16 => 0b100,
        24 => 0b110,
        other => panic!("unsupported test bit depth {}", other),
    };
    out.push(((spec.channels as u8 - 1) << 4) | (size_code << 1));

    push_utf8(&mut out, number);
    out.extend_from_slice(&((block_len - 1) as u16).to_be_bytes());
    out.push(crc8(&out));

    let bytes_per_sample = (spec.bits_per_sample / 8) as usize;
    for plane in planes {
        // VERBATIM subframe, no wasted bits
        out.push(0b0000_0010);
        for &sample in &plane[range.clone()] {
            let be = sample.to_be_bytes();
            out.extend_from_slice(&be[4 - bytes_per_sample..]);
        }
    }

    let crc = crc16(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// FLAC's UTF-8-style coded frame number
fn push_utf8(out: &mut Vec<u8>, value: u64) {
    if value < 0x80 {
        out.push(value as u8);
        return;
    }

    let mut continuation = Vec::new();
    let mut rest = value;
    let mut first_bits = 6;
    while rest >= (1 << first_bits) {
        continuation.push(0x80 | (rest & 0x3F) as u8);
        rest >>= 6;
        first_bits -= 1;
    }

    let count = continuation.len() + 1;
    let prefix = !(0xFFu8 >> count);
    out.push(prefix | rest as u8);
    out.extend(continuation.iter().rev());
}

fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x8005 } else { crc << 1 };
        }
    }
    crc
}

#[test]
fn utf8_frame_numbers() {
    let mut out = Vec::new();
    push_utf8(&mut out, 5);
    assert_eq!(out, [0x05]);

    let mut out = Vec::new();
    push_utf8(&mut out, 0x80);
    assert_eq!(out, [0xC2, 0x80]);

    let mut out = Vec::new();
    push_utf8(&mut out, 0x800);
    assert_eq!(out, [0xE0, 0xA0, 0x80]);
}

#[test]
fn crc_reference_values() {
    // CRC-8/SMBUS and CRC-16/UMTS check values
    assert_eq!(crc8(b"123456789"), 0xF4);
    assert_eq!(crc16(b"123456789"), 0xFEE8);
}
