// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Variable-width LZW decoding as used by GIF image data.
//!
//! Codes are packed least-significant-bit first. The input must already have
//! its sub-block framing removed, so the bit stream is continuous.

use arrayvec::ArrayVec;
use log::warn;

use crate::{Error, Result};

/// Widest code GIF allows.
pub const MAX_CODE_WIDTH: u8 = 12;

/// Largest minimum code size whose roots still fit a palette index.
pub const MAX_MIN_CODE_SIZE: u8 = 8;

const MAX_ENTRIES: usize = 1 << MAX_CODE_WIDTH;

/// How a call to [`decode_into`] ended.
///
/// Only [`DecodeStatus::Complete`] means the stream supplied every index;
/// the other two variants are recoverable and the rest of the output has
/// been padded with index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    Complete,
    /// The end-of-information code arrived early.
    EndOfInformation { written: usize },
    /// The input ran out of bits.
    Exhausted { written: usize },
}

/// One dictionary slot. Strings are stored as a back-linked chain through
/// `prefix`, so emitting walks from the last symbol to the first.
#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    suffix: u8,
    first: u8,
    len: u16,
}

struct Dictionary {
    entries: ArrayVec<Entry, MAX_ENTRIES>,
    /// Index of the clear code; roots occupy `0..clear`.
    clear: u16,
}

impl Dictionary {
    fn new(min_code_size: u8) -> Self {
        let clear = 1u16 << min_code_size;
        let mut entries = ArrayVec::new();
        for symbol in 0..clear {
            // min_code_size <= 8 keeps every root within a palette index
            let symbol = symbol as u8;
            entries.push(Entry { prefix: 0, suffix: symbol, first: symbol, len: 1 });
        }
        // clear and end-of-information slots are reserved but never emitted
        entries.push(Entry { prefix: 0, suffix: 0, first: 0, len: 0 });
        entries.push(Entry { prefix: 0, suffix: 0, first: 0, len: 0 });
        Self { entries, clear }
    }

    fn reset(&mut self) {
        self.entries.truncate(usize::from(self.clear) + 2);
    }

    fn assigned(&self) -> usize {
        self.entries.len()
    }

    fn add(&mut self, prefix: u16, suffix: u8) {
        if self.entries.is_full() {
            return;
        }
        let base = self.entries[usize::from(prefix)];
        self.entries.push(Entry { prefix, suffix, first: base.first, len: base.len + 1 });
    }

    /// Write the string for `code` into `out`, dropping whatever does not fit.
    fn emit(&self, code: u16, out: &mut [u8]) -> usize {
        let mut entry = self.entries[usize::from(code)];
        let len = usize::from(entry.len);
        let mut pos = len;
        while pos > 0 {
            pos -= 1;
            if let Some(slot) = out.get_mut(pos) {
                *slot = entry.suffix;
            }
            entry = self.entries[usize::from(entry.prefix)];
        }
        len.min(out.len())
    }
}

/// LSB-first code reader.
struct CodeReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u32,
    bits: u8,
}

impl<'a> CodeReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, acc: 0, bits: 0 }
    }

    fn next_code(&mut self, width: u8) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.acc |= u32::from(byte) << self.bits;
            self.bits += 8;
        }
        let code = (self.acc & ((1 << width) - 1)) as u16;
        self.acc >>= width;
        self.bits -= width;
        Some(code)
    }
}

/// Decode `data` into a freshly allocated plane of exactly `output_len`
/// palette indices.
pub fn decode(data: &[u8], min_code_size: u8, output_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.try_reserve_exact(output_len).map_err(|_| Error::OutOfMemory)?;
    out.resize(output_len, 0);
    match decode_into(data, min_code_size, &mut out)? {
        DecodeStatus::Complete => {},
        DecodeStatus::EndOfInformation { written } => {
            warn!("LZW end of information after {written} of {output_len} indices, padding");
        },
        DecodeStatus::Exhausted { written } => {
            warn!("LZW data exhausted after {written} of {output_len} indices, padding");
        },
    }
    Ok(out)
}

/// Decode into a caller-provided plane. The whole of `out` is always written.
///
/// Fails only when the minimum code size is outside `1..=8` or a code refers
/// to a dictionary slot that has not been assigned yet.
pub fn decode_into(data: &[u8], min_code_size: u8, out: &mut [u8]) -> Result<DecodeStatus> {
    if !(1..=MAX_MIN_CODE_SIZE).contains(&min_code_size) {
        return Err(Error::InvalidFormat("invalid LZW minimum code size"));
    }

    let mut dict = Dictionary::new(min_code_size);
    let clear = dict.clear;
    let end_of_information = clear + 1;
    let mut width = min_code_size + 1;
    let mut reader = CodeReader::new(data);
    let mut prev: Option<u16> = None;
    let mut written = 0;

    let status = loop {
        if written == out.len() {
            break DecodeStatus::Complete;
        }
        let Some(code) = reader.next_code(width) else {
            break DecodeStatus::Exhausted { written };
        };

        if code == clear {
            dict.reset();
            width = min_code_size + 1;
            prev = None;
            continue;
        }
        if code == end_of_information {
            break DecodeStatus::EndOfInformation { written };
        }

        let assigned = dict.assigned();
        match prev {
            Some(prev) if usize::from(code) < assigned => {
                let first = dict.entries[usize::from(code)].first;
                dict.add(prev, first);
            },
            // the KwKwK case: the code being defined by this very step
            Some(prev) if usize::from(code) == assigned => {
                let first = dict.entries[usize::from(prev)].first;
                dict.add(prev, first);
            },
            None if code < clear => {},
            _ => return Err(Error::InvalidFormat("LZW code references unassigned dictionary entry")),
        }

        written += dict.emit(code, &mut out[written..]);
        prev = Some(code);

        if dict.assigned() == 1 << width && width < MAX_CODE_WIDTH {
            width += 1;
        }
    };

    out[written..].fill(0);
    Ok(status)
}

#[cfg(test)]
const SAMPLE: [u8; 22] = [
    0x8c, 0x2d, 0x99, 0x87, 0x2a, 0x1c, 0xdc, 0x33, 0xa0, 0x02, 0x75,
    0xec, 0x95, 0xfa, 0xa8, 0xde, 0x60, 0x8c, 0x04, 0x91, 0x4c, 0x01,
];

#[test]
fn decodes_reference_image() {
    let plane = decode(&SAMPLE, 2, 100).unwrap();
    assert_eq!(&plane[0..10], &[1, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
    assert_eq!(&plane[30..40], &[1, 1, 1, 0, 0, 0, 0, 2, 2, 2]);
    assert_eq!(&plane[50..60], &[2, 2, 2, 0, 0, 0, 0, 1, 1, 1]);
    assert_eq!(&plane[90..100], &[2, 2, 2, 2, 2, 1, 1, 1, 1, 1]);
}

#[test]
fn stops_when_output_is_full() {
    let mut plane = [9u8; 12];
    let status = decode_into(&SAMPLE, 2, &mut plane).unwrap();
    assert_eq!(status, DecodeStatus::Complete);
    assert_eq!(plane, [1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 1, 1]);
}

#[test]
fn short_stream_is_padded() {
    // min code size 2: clear(4) and literal 1 at width 3, two stray bits
    let data = [0b0000_1100];
    let mut plane = [7u8; 6];
    let status = decode_into(&data, 2, &mut plane).unwrap();
    assert_eq!(status, DecodeStatus::Exhausted { written: 1 });
    assert_eq!(plane, [1, 0, 0, 0, 0, 0]);
}

#[test]
fn early_end_of_information_is_padded() {
    // clear(4), 3, eoi(5)
    let data = [0b0101_1100, 0b0000_0001];
    let mut plane = [7u8; 4];
    let status = decode_into(&data, 2, &mut plane).unwrap();
    assert_eq!(status, DecodeStatus::EndOfInformation { written: 1 });
    assert_eq!(plane, [3, 0, 0, 0]);
}

#[test]
fn kwkwk_code_repeats_previous_string() {
    // clear(4), 1, 6 (not yet assigned: "1" + "1"), eoi
    let data = [0b1000_1100, 0b0000_1011];
    let plane = decode(&data, 2, 3).unwrap();
    assert_eq!(plane, [1, 1, 1]);
}

#[test]
fn unassigned_code_is_fatal() {
    // clear(4), 1, 7 which is two slots beyond the dictionary
    let data = [0b1100_1100, 0b0000_0001];
    assert!(matches!(decode(&data, 2, 4), Err(Error::InvalidFormat(_))));
    // a string code with no predecessor
    let data = [0b0011_0100];
    assert!(matches!(decode(&data, 2, 4), Err(Error::InvalidFormat(_))));
}

#[test]
fn rejects_unusable_code_sizes() {
    assert!(decode(&SAMPLE, 0, 4).is_err());
    // roots past 255 cannot be written to a byte plane
    for size in 9..=12 {
        assert!(matches!(decode(&SAMPLE, size, 4), Err(Error::InvalidFormat(_))));
    }
}

#[test]
fn empty_output_reads_nothing() {
    assert_eq!(decode_into(&[], 8, &mut []).unwrap(), DecodeStatus::Complete);
}
