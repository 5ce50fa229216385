//! Asynchronous serial frame assembly.
//!
//! A [`Packet`] collects start, data and stop bits one at a time and yields
//! the data byte once the frame is complete.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::utils::errors::FramingError;

/// Parity setting. Carried with the frame shape but not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StartBits {
    None,
    /// A single start bit at logical 1.
    Mark,
    /// A single start bit at logical 0.
    #[default]
    Space,
}

impl StartBits {
    pub fn count(self) -> usize {
        match self {
            StartBits::None => 0,
            StartBits::Mark | StartBits::Space => 1,
        }
    }

    /// The level a start bit must have, if there is one.
    pub fn polarity(self) -> Option<bool> {
        match self {
            StartBits::None => None,
            StartBits::Mark => Some(true),
            StartBits::Space => Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StopBits {
    None,
    One,
    #[default]
    Two,
}

impl StopBits {
    pub fn count(self) -> usize {
        match self {
            StopBits::None => 0,
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

/// The layout of one serial frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketShape {
    pub parity: Parity,
    pub start_bits: StartBits,
    pub stop_bits: StopBits,
    pub data_bits: u8,
}

impl Default for PacketShape {
    fn default() -> Self {
        Self {
            parity: Parity::None,
            start_bits: StartBits::Space,
            stop_bits: StopBits::Two,
            data_bits: 8,
        }
    }
}

impl PacketShape {
    /// `data_bits` is clamped to `1..=8`.
    pub fn new(parity: Parity, start_bits: StartBits, stop_bits: StopBits, data_bits: u8) -> Self {
        Self {
            parity,
            start_bits,
            stop_bits,
            data_bits: data_bits.clamp(1, 8),
        }
    }

    pub fn total_bits(&self) -> usize {
        self.start_bits.count() + self.data_bits as usize + self.stop_bits.count()
    }
}

impl Display for PacketShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        };
        write!(
            f,
            "{}{}{}",
            self.data_bits,
            parity,
            self.stop_bits.count()
        )
    }
}

/// Outcome of the most recent [`Packet::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PacketState {
    /// No bit has been added since construction.
    #[default]
    Idle,
    Ok,
    Error(FramingError),
}

/// A serial frame being received.
///
/// Bits are fed with [`Packet::add`]; the accumulator receives data bits
/// LSB first. [`Packet::clear`] starts a new frame with the same shape.
#[derive(Debug, Clone)]
pub struct Packet {
    shape: PacketShape,
    start: usize,
    data_end: usize,
    total: usize,
    index: usize,
    data: u8,
    state: PacketState,
    surplus: usize,
}

impl Packet {
    pub fn new(shape: PacketShape) -> Self {
        let start = shape.start_bits.count();
        Self {
            shape,
            start,
            data_end: start + shape.data_bits as usize,
            total: shape.total_bits(),
            index: 0,
            data: 0,
            state: PacketState::Idle,
            surplus: 0,
        }
    }

    pub fn shape(&self) -> PacketShape {
        self.shape
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.index == self.total
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, PacketState::Error(_))
    }

    pub fn error(&self) -> Option<FramingError> {
        match self.state {
            PacketState::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Resets the bit index and accumulator. The shape and last state are kept.
    pub fn clear(&mut self) {
        self.index = 0;
        self.data = 0;
        self.surplus = 0;
    }

    /// The accumulated data byte.
    pub fn get(&self) -> u8 {
        self.data
    }

    pub fn add(&mut self, bit: bool) {
        self.state = if self.index < self.start {
            self.index += 1;
            match self.shape.start_bits.polarity() {
                Some(level) if level != bit => PacketState::Error(FramingError::Start),
                _ => PacketState::Ok,
            }
        } else if self.index < self.data_end {
            self.index += 1;
            self.data = (self.data >> 1) | if bit { 0x80 } else { 0 };
            PacketState::Ok
        } else if self.index < self.total {
            self.index += 1;
            if bit {
                PacketState::Ok
            } else {
                PacketState::Error(FramingError::Stop)
            }
        } else {
            // A frame that is already complete tolerates one extra bit.
            self.surplus += 1;
            if self.surplus > 1 {
                PacketState::Error(FramingError::Overrun)
            } else {
                PacketState::Ok
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(packet: &mut Packet, bits: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &bit in bits {
            packet.add(bit != 0);
            assert!(!packet.is_error(), "unexpected {:?}", packet.state());
            if packet.is_complete() {
                bytes.push(packet.get());
                packet.clear();
            }
        }
        bytes
    }

    #[test]
    fn frame_lsb_first() {
        let mut packet = Packet::new(PacketShape::default());
        let bytes = feed(&mut packet, &[0, 1, 0, 1, 0, 1, 1, 1, 1, 1, 1]);
        assert_eq!(bytes, [0xF5]);
        assert_eq!(packet.state(), PacketState::Ok);
    }

    #[test]
    fn frame_alternating_data() {
        let mut packet = Packet::new(PacketShape::default());
        let bytes = feed(&mut packet, &[0, 1, 0, 1, 0, 1, 0, 1, 1, 1, 1]);
        assert_eq!(bytes, [0xD5]);
    }

    #[test]
    fn start_bit_mismatch() {
        let mut packet = Packet::new(PacketShape::default());
        packet.add(true);
        assert_eq!(packet.error(), Some(FramingError::Start));
        assert!(!packet.is_complete());
    }

    #[test]
    fn mark_start_bit() {
        let shape = PacketShape::new(Parity::None, StartBits::Mark, StopBits::One, 8);
        let mut packet = Packet::new(shape);
        packet.add(false);
        assert_eq!(packet.error(), Some(FramingError::Start));

        packet.clear();
        let bytes = feed(&mut packet, &[1, 0, 0, 0, 0, 0, 0, 0, 1, 1]);
        assert_eq!(bytes, [0x80]);
    }

    #[test]
    fn stop_bit_low() {
        let mut packet = Packet::new(PacketShape::default());
        for _ in 0..9 {
            packet.add(false);
        }
        assert!(!packet.is_error());
        packet.add(false);
        assert_eq!(packet.error(), Some(FramingError::Stop));
    }

    #[test]
    fn overrun_after_complete() {
        let shape = PacketShape::new(Parity::None, StartBits::None, StopBits::None, 8);
        let mut packet = Packet::new(shape);
        for _ in 0..8 {
            packet.add(true);
        }
        assert!(packet.is_complete());
        assert_eq!(packet.get(), 0xFF);

        packet.add(true);
        assert_eq!(packet.state(), PacketState::Ok);
        assert!(packet.is_complete());

        packet.add(true);
        assert_eq!(packet.error(), Some(FramingError::Overrun));

        packet.clear();
        assert_eq!(packet.index(), 0);
        assert_eq!(packet.get(), 0);
        assert_eq!(packet.shape(), shape);
    }

    #[test]
    fn short_data_fills_high_bits() {
        let shape = PacketShape::new(Parity::Even, StartBits::Space, StopBits::One, 7);
        assert_eq!(shape.total_bits(), 9);
        assert_eq!(shape.to_string(), "7E1");

        let mut packet = Packet::new(shape);
        let bytes = feed(&mut packet, &[0, 1, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(bytes, [0x02]);
    }
}
