//! The raw tape image: a sequence of cycles plus format metadata.
//!
//! ```text
//!            1         2
//!  0123456789012345678901234...
//!  UK101-TAPRAW0000nnnnxxxxx...
//!  |           |\ /|  |
//!  |           | | |  +- data
//!  |           | | +- length (u32, little-endian)
//!  |           | +- reserved (3)
//!  |           +- version (1)
//!  +- header (12)
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use log::{debug, info};
use serde::Serialize;
use taperawd_macros::ToBytes;

use crate::log_or_err;
use crate::process::analyse::analyse;
use crate::process::codec::{TapeReader, TapeWriter};
use crate::process::extract::CycleExtractor;
use crate::structs::cycle::Cycle;
use crate::structs::wave::Wave;
use crate::utils::errors::FormatError;
use crate::utils::window::TimeWindow;

pub const DEFAULT_HEADER: [u8; 12] = *b"UK101-TAPRAW";

/// UK101 CPU clock.
pub const DEFAULT_CLOCK_FREQUENCY: u32 = 1_000_000;

/// Clock cycles per stored length unit.
pub const CLOCKS_PER_GROUP: u32 = 8;

pub const HEADER_SIZE: u64 = 0x14;
pub const LENGTH_OFFSET: u64 = 0x10;

/// Fixed part of a tape image, in file order.
#[derive(Debug, Clone, PartialEq, Eq, ToBytes)]
pub struct TapeHeader {
    pub magic: [u8; 12],
    pub version: u8,
    pub reserved: [u8; 3],
    /// Body size in bytes.
    pub length: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TapeVersion {
    /// Lengths over 255 groups collapse to a bare `0x00` overflow marker.
    #[default]
    V0,
    /// `0x00` is followed by the exact length in clock cycles (24 bits).
    V1,
}

impl TapeVersion {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::V0),
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

impl From<TapeVersion> for u8 {
    fn from(version: TapeVersion) -> Self {
        match version {
            TapeVersion::V0 => 0,
            TapeVersion::V1 => 1,
        }
    }
}

/// Recovered cycles and the settings that govern extraction, quantization
/// and serialization.
///
/// The cycle sequence is rebuilt as a whole by [`Tape::convert`] and
/// [`Tape::read`].
#[derive(Debug, Clone)]
pub struct Tape {
    cycles: Vec<Cycle>,
    clock_frequency: u32,
    version: TapeVersion,
    header: [u8; 12],
    window: TimeWindow,
    threshold: f64,
    patches: BTreeMap<usize, u8>,
    pub(crate) fail_level: log::Level,
}

impl Default for Tape {
    fn default() -> Self {
        Self {
            cycles: Vec::new(),
            clock_frequency: DEFAULT_CLOCK_FREQUENCY,
            version: TapeVersion::V0,
            header: DEFAULT_HEADER,
            window: TimeWindow::unbounded(),
            threshold: 0.0,
            patches: BTreeMap::new(),
            fail_level: log::Level::Error,
        }
    }
}

impl Tape {
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cycle> {
        self.cycles.get(index)
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cycle> {
        self.cycles.iter()
    }

    pub fn clock_frequency(&self) -> u32 {
        self.clock_frequency
    }

    /// A zero frequency is ignored.
    pub fn set_clock_frequency(&mut self, frequency: u32) {
        if frequency > 0 {
            self.clock_frequency = frequency;
        }
    }

    pub fn version(&self) -> TapeVersion {
        self.version
    }

    pub fn set_version(&mut self, version: TapeVersion) {
        self.version = version;
    }

    pub fn header(&self) -> &[u8; 12] {
        &self.header
    }

    pub fn set_header(&mut self, header: [u8; 12]) {
        self.header = header;
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn set_window(&mut self, window: TimeWindow) {
        self.window = window;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cycles whose extremes stay within `threshold` are dropped as noise.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.abs();
    }

    /// Replaces the stored byte of record `index` when loading.
    ///
    /// Escaped (over-long) records are never patched.
    pub fn set_patch(&mut self, index: usize, value: u8) {
        self.patches.insert(index, value);
    }

    pub fn clear_patches(&mut self) {
        self.patches.clear();
    }

    pub fn patches(&self) -> &BTreeMap<usize, u8> {
        &self.patches
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// End time of the last cycle, in seconds.
    pub fn duration(&self) -> f64 {
        self.cycles.last().map_or(0.0, |cycle| cycle.end)
    }

    /// A cycle extractor over `wave` using this tape's window and threshold.
    pub fn extractor<'a>(&self, wave: &'a Wave) -> CycleExtractor<'a> {
        CycleExtractor::new(wave.samples(), wave.sample_rate())
            .with_window(self.window)
            .with_threshold(self.threshold)
    }

    pub fn replace_cycles<I: IntoIterator<Item = Cycle>>(&mut self, cycles: I) {
        self.cycles.clear();
        self.cycles.extend(cycles);
    }

    /// Rebuilds the cycle sequence from audio samples.
    pub fn convert(&mut self, wave: &Wave) {
        let cycles = self.extractor(wave).collect::<Vec<_>>();
        info!(
            "Extracted {} cycles from {:.3}s of audio at {} Hz",
            cycles.len(),
            wave.duration(),
            wave.sample_rate()
        );
        self.cycles = cycles;
    }

    /// Quantizes in-window cycle lengths to whole clock-cycle groups.
    ///
    /// Returns the number of cycles touched.
    pub fn analyse(&mut self) -> usize {
        let touched = analyse(&mut self.cycles, self.clock_frequency, self.window);
        debug!("Quantized {touched} of {} cycles", self.cycles.len());
        touched
    }

    /// Writes the tape image.
    pub fn write<W: Write + Seek>(&self, writer: W) -> std::io::Result<W> {
        let mut tape_writer = TapeWriter::new(writer, self.version, self.clock_frequency);
        tape_writer.write_header(&self.header, self.cycles.len() as u32)?;
        for cycle in &self.cycles {
            tape_writer.write_cycle(cycle)?;
        }
        tape_writer.finish()?;

        let stats = tape_writer.stats();
        debug!(
            "Wrote {} records ({} escaped) in {} data bytes",
            stats.records, stats.escapes, stats.data_written
        );
        tape_writer.into_inner()
    }

    /// Loads a tape image, replacing the current cycles.
    ///
    /// The cycle sequence is cleared first, so it is empty if loading fails.
    pub fn read<R: Read>(&mut self, reader: R) -> Result<(), FormatError> {
        self.cycles.clear();

        let mut tape_reader = TapeReader::new(reader);
        let header = tape_reader.read_header()?;
        if header.magic != self.header {
            return Err(FormatError::HeaderMismatch {
                expected: String::from_utf8_lossy(&self.header).into_owned(),
                found: String::from_utf8_lossy(&header.magic).into_owned(),
            });
        }

        self.version = match TapeVersion::from_byte(header.version) {
            Some(version) => version,
            None => {
                log_or_err!(
                    self,
                    log::Level::Warn,
                    FormatError::UnsupportedVersion(header.version)
                );
                TapeVersion::V1
            }
        };

        let clock = self.clock_frequency as f64;
        // The length field is untrusted until the body has been read.
        let mut cycles = Vec::with_capacity(header.length.min(1 << 16) as usize);
        let mut start = 0.0;
        while let Some(clocks) =
            tape_reader.read_record(self.version, header.length, &self.patches)?
        {
            let end = start + clocks as f64 / clock;
            cycles.push(Cycle::from_span(start, end));
            start = end;
        }

        debug!(
            "Read {} records from a version {} tape, {:.3}s",
            cycles.len(),
            u8::from(self.version),
            start
        );
        self.cycles = cycles;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pulses(groups: &[u32]) -> Tape {
        let mut tape = Tape::default();
        let mut start = 0.001;
        tape.replace_cycles(groups.iter().map(|&g| {
            let end = start + (g * CLOCKS_PER_GROUP) as f64 / DEFAULT_CLOCK_FREQUENCY as f64;
            let cycle = Cycle::from_span(start, end);
            start = end;
            cycle
        }));
        tape
    }

    #[test]
    fn header_layout() {
        let tape = pulses(&[52, 104]);
        let bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();

        assert_eq!(&bytes[..12], b"UK101-TAPRAW");
        assert_eq!(bytes[12], 0);
        assert_eq!(&bytes[13..16], &[0, 0, 0]);
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());
        assert_eq!(&bytes[20..], &[52, 104]);
    }

    #[test]
    fn round_trip_within_one_group() {
        let step = CLOCKS_PER_GROUP as f64 / DEFAULT_CLOCK_FREQUENCY as f64;
        let lengths = [0.000_417, 0.000_833, 0.000_42, 0.000_001_9, 0.0012];

        for version in [TapeVersion::V0, TapeVersion::V1] {
            let mut tape = Tape::default();
            tape.set_version(version);
            let mut start = 0.0;
            tape.replace_cycles(lengths.iter().map(|&length| {
                let cycle = Cycle::from_span(start, start + length);
                start += length;
                cycle
            }));

            let bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();
            let mut loaded = Tape::default();
            loaded.read(Cursor::new(bytes)).unwrap();

            assert_eq!(loaded.version(), version);
            assert_eq!(loaded.len(), lengths.len());
            for (cycle, &length) in loaded.iter().zip(&lengths) {
                assert!(
                    (cycle.length() - length).abs() <= step,
                    "{version:?}: {} vs {length}",
                    cycle.length()
                );
            }
        }
    }

    #[test]
    fn escape_round_trip() {
        let mut tape = pulses(&[52, 300, 104]);
        tape.set_version(TapeVersion::V1);
        let bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();

        assert_eq!(&bytes[16..20], &6u32.to_le_bytes());
        assert_eq!(&bytes[20..], &[52, 0x00, 0x60, 0x09, 0x00, 104]);

        let mut loaded = Tape::default();
        loaded.read(Cursor::new(bytes)).unwrap();
        assert_eq!(loaded.len(), 3);
        let long = loaded.get(1).unwrap();
        assert!((long.length() - 300.0 * 8.0 / 1_000_000.0).abs() < 1e-12);
        assert_eq!(long.start, loaded.get(0).unwrap().end);
    }

    #[test]
    fn version_zero_overflow_sentinel() {
        let tape = pulses(&[300]);
        let bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();
        assert_eq!(&bytes[16..], &[1, 0, 0, 0, 0]);

        let mut loaded = Tape::default();
        loaded.read(Cursor::new(bytes)).unwrap();
        assert!((loaded.get(0).unwrap().length() - 256.0 * 8.0 / 1_000_000.0).abs() < 1e-12);
    }

    #[test]
    fn header_mismatch_clears_cycles() {
        let mut tape = pulses(&[52, 52]);
        let mut bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();
        bytes[0] = b'C';

        let result = tape.read(Cursor::new(bytes));
        assert!(matches!(result, Err(FormatError::HeaderMismatch { .. })));
        assert!(tape.is_empty());
    }

    #[test]
    fn truncated_body() {
        let mut tape = pulses(&[52, 52, 52]);
        let mut bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();
        bytes.truncate(bytes.len() - 1);

        match tape.read(Cursor::new(bytes)) {
            Err(FormatError::Truncated { records, .. }) => assert_eq!(records, 2),
            other => panic!("expected truncation, got {other:?}"),
        }
        assert!(tape.is_empty());

        let result = tape.read(Cursor::new(b"UK101-TAP".to_vec()));
        assert!(matches!(result, Err(FormatError::Truncated { records: 0, .. })));

        // EOF inside a version 1 escape literal.
        let mut escape = b"UK101-TAPRAW".to_vec();
        escape.extend_from_slice(&[1, 0, 0, 0]);
        escape.extend_from_slice(&4u32.to_le_bytes());
        escape.extend_from_slice(&[0x00, 0x60]);
        let result = tape.read(Cursor::new(escape));
        assert!(matches!(result, Err(FormatError::Truncated { records: 0, .. })));
        assert!(tape.is_empty());
    }

    #[test]
    fn oversized_length_field() {
        let mut bytes = b"UK101-TAPRAW".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[52, 52]);

        let mut tape = Tape::default();
        match tape.read(Cursor::new(bytes)) {
            Err(FormatError::Truncated { records, read, expected }) => {
                assert_eq!(records, 2);
                assert_eq!(read, 2);
                assert_eq!(expected, u32::MAX);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
        assert!(tape.is_empty());
    }

    #[test]
    fn unknown_version() {
        let tape = pulses(&[52]);
        let mut bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();
        bytes[12] = 7;

        let mut lenient = Tape::default();
        lenient.read(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(lenient.version(), TapeVersion::V1);
        assert_eq!(lenient.len(), 1);

        let mut strict = Tape::default();
        strict.set_fail_level(log::Level::Warn);
        let result = strict.read(Cursor::new(bytes));
        assert!(matches!(result, Err(FormatError::UnsupportedVersion(7))));
    }

    #[test]
    fn patches_apply_on_load() {
        let tape = pulses(&[52, 60, 52]);
        let bytes = tape.write(Cursor::new(Vec::new())).unwrap().into_inner();

        let mut loaded = Tape::default();
        loaded.set_patch(1, 104);
        loaded.read(Cursor::new(bytes)).unwrap();
        assert!((loaded.get(1).unwrap().length() - 104.0 * 8.0 / 1_000_000.0).abs() < 1e-12);
        assert!((loaded.get(2).unwrap().length() - 52.0 * 8.0 / 1_000_000.0).abs() < 1e-12);
    }
}
