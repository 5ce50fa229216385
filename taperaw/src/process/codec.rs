//! Raw tape image serialization.
//!
//! Each record holds one pulse length in units of eight clock cycles. A
//! record of `0x00` marks a pulse longer than 255 units: version 0 stops
//! there and the reader assumes 256 units, version 1 appends the exact
//! length in clock cycles as a 24-bit little-endian value.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use bitstream_io::{ByteRead, ByteReader, LittleEndian};
use log::{trace, warn};

use crate::structs::cycle::Cycle;
use crate::structs::tape::{
    CLOCKS_PER_GROUP, HEADER_SIZE, LENGTH_OFFSET, TapeHeader, TapeVersion,
};
use crate::utils::byteorder::{WriteBytesLe, write_u24_le};
use crate::utils::errors::FormatError;

/// The largest clock-cycle count a version 1 escape can carry.
pub const MAX_ESCAPED_CLOCKS: u32 = 0xFF_FFFF;

/// Pulse length assumed for a version 0 overflow marker, in clock cycles.
pub const OVERFLOW_CLOCKS: u32 = 256 * CLOCKS_PER_GROUP;

/// Appends the record for a pulse of `length` seconds to `dst`.
///
/// Returns the number of bytes written.
pub fn encode_record(
    length: f64,
    clock_frequency: u32,
    version: TapeVersion,
    dst: &mut Vec<u8>,
) -> usize {
    let clocks = length * clock_frequency as f64;
    let groups = (clocks / CLOCKS_PER_GROUP as f64).round() as u64;

    match (groups, version) {
        (1..=255, _) => {
            dst.push(groups as u8);
            1
        }
        (0, TapeVersion::V0) => {
            dst.push(1);
            1
        }
        (_, TapeVersion::V0) => {
            dst.push(0);
            1
        }
        (_, TapeVersion::V1) => {
            let mut clocks = clocks.round() as u64;
            if clocks > MAX_ESCAPED_CLOCKS as u64 {
                warn!("Pulse of {length:.6}s exceeds the 24-bit escape range, saturating");
                clocks = MAX_ESCAPED_CLOCKS as u64;
            }
            dst.push(0);
            write_u24_le(clocks as u32, dst);
            4
        }
    }
}

/// Writer for raw tape images.
///
/// The length field is written as a placeholder by [`TapeWriter::write_header`]
/// and patched with the real body size by [`TapeWriter::finish`].
pub struct TapeWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    version: TapeVersion,
    clock_frequency: u32,
    length_position: u64,
    data_written: u32,
    records: u32,
    escapes: u32,
    buffer: Vec<u8>,
}

impl<W: Write + Seek> TapeWriter<W> {
    pub fn new(writer: W, version: TapeVersion, clock_frequency: u32) -> Self {
        Self {
            writer: BufWriter::new(writer),
            version,
            clock_frequency,
            length_position: 0,
            data_written: 0,
            records: 0,
            escapes: 0,
            buffer: Vec::with_capacity(4),
        }
    }

    /// Writes the fixed header with `records` as the provisional length.
    pub fn write_header(&mut self, magic: &[u8; 12], records: u32) -> io::Result<()> {
        let header = TapeHeader {
            magic: *magic,
            version: self.version.into(),
            reserved: [0; 3],
            length: records,
        };

        let start = self.writer.stream_position()?;
        self.length_position = start + LENGTH_OFFSET;

        let mut bytes = Vec::with_capacity(20);
        header.write_le(&mut bytes);
        self.writer.write_all(&bytes)
    }

    pub fn write_cycle(&mut self, cycle: &Cycle) -> io::Result<()> {
        self.buffer.clear();
        let written = encode_record(
            cycle.length(),
            self.clock_frequency,
            self.version,
            &mut self.buffer,
        );
        if written > 1 {
            self.escapes += 1;
            trace!(
                "Escaped pulse at {:.6}s, {:.6}s long",
                cycle.start,
                cycle.length()
            );
        }

        self.writer.write_all(&self.buffer)?;
        self.data_written += written as u32;
        self.records += 1;
        Ok(())
    }

    /// Rewrites the length field with the body size and flushes.
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        let current_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.length_position))?;
        self.writer.write_all(&crate::join_bytes_le!(self.data_written))?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    pub fn stats(&self) -> TapeStats {
        TapeStats {
            records: self.records,
            escapes: self.escapes,
            data_written: self.data_written,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapeStats {
    pub records: u32,
    pub escapes: u32,
    pub data_written: u32,
}

/// Reader for raw tape images.
pub struct TapeReader<R: io::Read> {
    reader: ByteReader<R, LittleEndian>,
    consumed: u32,
    records: usize,
}

impl<R: io::Read> TapeReader<R> {
    pub fn new(read: R) -> Self {
        Self {
            reader: ByteReader::new(read),
            consumed: 0,
            records: 0,
        }
    }

    pub fn read_header(&mut self) -> Result<TapeHeader, FormatError> {
        let header = self
            .read_header_fields()
            .map_err(|e| self.truncated_or(e, HEADER_SIZE as u32))?;

        trace!(
            "Tape header: version {}, {} data bytes",
            header.version, header.length
        );
        Ok(header)
    }

    fn read_header_fields(&mut self) -> io::Result<TapeHeader> {
        let mut magic = [0u8; 12];
        let mut reserved = [0u8; 3];

        self.reader.read_bytes(&mut magic)?;
        let version = self.reader.read::<u8>()?;
        self.reader.read_bytes(&mut reserved)?;
        let length = self.reader.read::<u32>()?;

        Ok(TapeHeader {
            magic,
            version,
            reserved,
            length,
        })
    }

    /// Reads the next record and returns its pulse length in clock cycles.
    ///
    /// Returns `None` once `length` body bytes have been consumed.
    pub fn read_record(
        &mut self,
        version: TapeVersion,
        length: u32,
        patches: &BTreeMap<usize, u8>,
    ) -> Result<Option<u32>, FormatError> {
        if self.consumed >= length {
            return Ok(None);
        }

        let byte = self
            .reader
            .read::<u8>()
            .map_err(|e| self.truncated_or(e, length))?;
        self.consumed += 1;

        let clocks = match (byte, version) {
            (0, TapeVersion::V0) => OVERFLOW_CLOCKS,
            (0, TapeVersion::V1) => {
                let mut bytes = [0u8; 3];
                self.reader
                    .read_bytes(&mut bytes)
                    .map_err(|e| self.truncated_or(e, length))?;
                self.consumed += 3;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
            }
            (byte, _) => {
                let byte = match patches.get(&self.records) {
                    Some(&patched) => {
                        warn!(
                            "Patching record {} from {byte} to {patched}",
                            self.records
                        );
                        patched
                    }
                    None => byte,
                };
                byte as u32 * CLOCKS_PER_GROUP
            }
        };

        self.records += 1;
        Ok(Some(clocks))
    }

    fn truncated_or(&self, error: io::Error, expected: u32) -> FormatError {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated {
                records: self.records,
                read: self.consumed,
                expected,
            }
        } else {
            FormatError::Io(error)
        }
    }
}

#[test]
fn escape_encoding() {
    let length = 300.0 * 8.0 / 1_000_000.0;

    let mut v1 = Vec::new();
    assert_eq!(encode_record(length, 1_000_000, TapeVersion::V1, &mut v1), 4);
    assert_eq!(v1, [0x00, 0x60, 0x09, 0x00]);

    let mut v0 = Vec::new();
    assert_eq!(encode_record(length, 1_000_000, TapeVersion::V0, &mut v0), 1);
    assert_eq!(v0, [0x00]);

    let mut short = Vec::new();
    encode_record(47.0 * 8.0 / 985_248.0, 985_248, TapeVersion::V1, &mut short);
    assert_eq!(short, [47]);
}

#[test]
fn escape_saturates() {
    let mut bytes = Vec::new();
    encode_record(20.0, 1_000_000, TapeVersion::V1, &mut bytes);
    assert_eq!(bytes, [0x00, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn decode_escape_literal() -> Result<(), FormatError> {
    let body = [0x00u8, 0x60, 0x09, 0x00, 0x68];
    let mut reader = TapeReader::new(io::Cursor::new(body));
    let patches = BTreeMap::new();

    assert_eq!(reader.read_record(TapeVersion::V1, 5, &patches)?, Some(2400));
    assert_eq!(reader.read_record(TapeVersion::V1, 5, &patches)?, Some(104 * 8));
    assert_eq!(reader.read_record(TapeVersion::V1, 5, &patches)?, None);
    Ok(())
}
