//! Decoded program bytes.

use std::io::{self, Write};

use serde::Serialize;

use crate::utils::errors::FramingError;
use crate::utils::window::TimeWindow;

/// Progress of the decoder through a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LinkState {
    /// No leader tone seen yet.
    #[default]
    None,
    /// Inside the leader tone.
    Header,
    /// At least one byte received after the leader.
    Data,
}

/// Symbol and framing counters collected while decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodeStats {
    pub zeros: usize,
    pub ones: usize,
    pub noise: usize,
    pub bytes: usize,
    pub start_errors: usize,
    pub stop_errors: usize,
    pub overruns: usize,
    /// Framing errors raised after the leader, i.e. the ones worth reporting.
    pub reported_errors: usize,
    pub link: LinkState,
    /// Start time of the first data byte, in seconds.
    pub data_start: Option<f64>,
}

impl DecodeStats {
    pub(crate) fn record_error(&mut self, error: FramingError) {
        match error {
            FramingError::Start => self.start_errors += 1,
            FramingError::Stop => self.stop_errors += 1,
            FramingError::Overrun => self.overruns += 1,
        }
    }

    pub fn framing_errors(&self) -> usize {
        self.start_errors + self.stop_errors + self.overruns
    }
}

/// Bytes recovered from a tape, with the settings used to recover them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Code {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub baud_rate: u32,
    pub window: TimeWindow,
    pub stats: DecodeStats,
}

impl AsRef<[u8]> for Code {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Code {
    pub fn new(baud_rate: u32, window: TimeWindow) -> Self {
        Self {
            data: Vec::new(),
            baud_rate,
            window,
            stats: DecodeStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Writes the bytes verbatim, without any header.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.data)?;
        writer.flush()
    }
}

#[test]
fn write_verbatim() -> io::Result<()> {
    let mut code = Code::new(300, TimeWindow::unbounded());
    code.data.extend_from_slice(b"10 PRINT\r");

    let mut out = Vec::new();
    code.write_to(&mut out)?;
    assert_eq!(out, b"10 PRINT\r");
    Ok(())
}
