#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Cassette recordings for the UK101 use Kansas City Standard (CUTS)
//! encoding: a `0` bit is four cycles of 1200 Hz, a `1` bit is eight cycles
//! of 2400 Hz, both lasting one bit period at 300 baud.
//!
//! ### Tape Images
//!
//! A `UK101-TAPRAW` image stores one byte per cycle: its length in groups
//! of eight cycles of a reference clock (1 MHz by default). Version 1 images
//! escape long cycles with their exact clock count.
//!
//! ### Framing
//!
//! Bits are framed asynchronously, by default with a space start bit,
//! eight data bits sent LSB first and two stop bits.
//!
//! ## Quick Start
//!
//! 1. Extract cycles from samples using [`process::extract::CycleExtractor`]
//! 2. Quantize them with [`structs::tape::Tape::analyse`] and save the image
//! 3. Decode bytes from a tape using [`process::decode::Decoder`]
//!
//! ```rust,no_run
//! use taperaw::process::decode::Decoder;
//! use taperaw::structs::{tape::Tape, wave::Wave};
//!
//! let samples: Vec<f32> = Vec::new(); // Normalized mono samples
//! let wave = Wave::new(samples, 44100)?;
//!
//! let mut tape = Tape::default();
//! tape.convert(&wave);
//! tape.analyse();
//!
//! let file = std::fs::File::create("program.tap")?;
//! tape.write(file)?;
//!
//! let code = Decoder::default().decode(&tape)?;
//! std::fs::write("program.bas", &code)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Processing stages from samples to bytes.
///
/// 1. **Cycle Extraction** ([`process::extract`]): Zero-crossing detection
///    with linear interpolation.
///
/// 2. **Analysis** ([`process::analyse`]): Quantizes cycle lengths to the
///    tape clock.
///
/// 3. **Tape Codec** ([`process::codec`]): Versioned image records.
///
/// 4. **Decoding** ([`process::decode`]): Bit classification and framing.
pub mod process;

/// Data structures for recordings, tapes and decoded output.
///
/// - **Samples** ([`structs::wave`]): Mono audio
/// - **Cycles** ([`structs::cycle`]): Single waveform periods
/// - **Tapes** ([`structs::tape`]): Cycle sequences and image settings
/// - **Packets** ([`structs::packet`]): Serial frames
/// - **Code** ([`structs::code`]): Decoded bytes and statistics
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Byte Order** ([`utils::byteorder`]): Little-endian serialization
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Time Windows** ([`utils::window`]): Range selection
pub mod utils;
