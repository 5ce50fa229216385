use anyhow::Result;
use log::{debug, info, trace};

use crate::log_or_err;
use crate::structs::code::{Code, LinkState};
use crate::structs::cycle::Cycle;
use crate::structs::packet::{Packet, PacketShape};
use crate::structs::tape::Tape;
use crate::utils::errors::DecodeError;
use crate::utils::window::TimeWindow;

pub const DEFAULT_BAUD_RATE: u32 = 300;

/// Cycles of the low tone making up a `0` bit.
pub const ZERO_CYCLES: usize = 4;

/// Cycles of the high tone making up a `1` bit.
pub const ONE_CYCLES: usize = 8;

/// Consecutive `1` bits that must be exceeded before a run counts as leader.
pub const LEADER_ONES: usize = 8;

/// Overshoot allowed past one bit period, as a fraction of the average cycle.
const TOLERANCE_DIVISOR: f64 = 32.0;

/// A classified run of cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Zero,
    One,
    Noise,
}

impl Symbol {
    /// Cycles consumed by the symbol. Noise skips a single cycle.
    pub fn cycles(self) -> usize {
        match self {
            Symbol::Zero => ZERO_CYCLES,
            Symbol::One => ONE_CYCLES,
            Symbol::Noise => 1,
        }
    }

    pub fn bit(self) -> Option<bool> {
        match self {
            Symbol::Zero => Some(false),
            Symbol::One => Some(true),
            Symbol::Noise => None,
        }
    }
}

/// Groups cycles into bits by how many of them fit in one bit period.
#[derive(Debug, Clone, Copy)]
pub struct SymbolClassifier {
    interval: f64,
}

impl SymbolClassifier {
    pub fn new(baud_rate: u32) -> Self {
        Self {
            interval: 1.0 / baud_rate.max(1) as f64,
        }
    }

    /// One bit period in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Counts the leading cycles whose lengths add up to at most one bit
    /// period, allowing an overshoot of 1/32 of their average length.
    ///
    /// A zero-length cycle ends the run.
    pub fn count(&self, cycles: &[Cycle]) -> usize {
        let mut sum = 0.0;
        let mut count = 0;

        for cycle in cycles {
            let length = cycle.length();
            if length <= 0.0 {
                trace!("Data error: empty cycle at {:.6}s", cycle.start);
                break;
            }

            let average = (sum + length) / (count + 1) as f64;
            if sum + length > self.interval + average / TOLERANCE_DIVISOR {
                break;
            }

            sum += length;
            count += 1;
        }

        count
    }

    pub fn classify(&self, cycles: &[Cycle]) -> Symbol {
        match self.count(cycles) {
            ZERO_CYCLES => Symbol::Zero,
            ONE_CYCLES => Symbol::One,
            _ => Symbol::Noise,
        }
    }
}

/// Decodes the cycles of a [`Tape`] into bytes.
///
/// Cycles are classified into bits with a [`SymbolClassifier`] and the bits
/// are framed by a [`Packet`]. Frames with errors are dropped and framing
/// restarts with the next bit.
///
/// # Example
///
/// ```rust,no_run
/// use taperaw::process::decode::Decoder;
/// use taperaw::structs::tape::Tape;
///
/// let mut tape = Tape::default();
/// tape.read(std::fs::File::open("program.tap")?)?;
///
/// let mut decoder = Decoder::default();
/// decoder.set_baud_rate(297)?;
/// let code = decoder.decode(&tape)?;
/// std::fs::write("program.bas", &code)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct Decoder {
    state: DecoderState,
}

struct DecoderState {
    baud_rate: u32,
    window: TimeWindow,
    shape: PacketShape,
    fail_level: log::Level,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            window: TimeWindow::unbounded(),
            shape: PacketShape::default(),
            fail_level: log::Level::Error,
        }
    }
}

impl Decoder {
    pub fn baud_rate(&self) -> u32 {
        self.state.baud_rate
    }

    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DecodeError> {
        if baud_rate == 0 {
            return Err(DecodeError::InvalidBaudRate(baud_rate));
        }
        self.state.baud_rate = baud_rate;
        Ok(())
    }

    /// Only cycles starting inside `window` are decoded.
    pub fn set_window(&mut self, window: TimeWindow) {
        self.state.window = window;
    }

    pub fn set_packet_shape(&mut self, shape: PacketShape) {
        self.state.shape = shape;
    }

    /// Sets the failure level for framing errors after the leader.
    ///
    /// - `log::Level::Error`: Report and continue (default)
    /// - `log::Level::Warn`: Fail on the first such error (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    pub fn decode(&mut self, tape: &Tape) -> Result<Code> {
        self.state.decode(tape.cycles())
    }
}

impl DecoderState {
    fn decode(&self, cycles: &[Cycle]) -> Result<Code> {
        let classifier = SymbolClassifier::new(self.baud_rate);
        let mut packet = Packet::new(self.shape);
        let mut code = Code::new(self.baud_rate, self.window);
        let mut ones = 0;

        info!(
            "Decoding {} cycles at {} baud, {} framing",
            cycles.len(),
            self.baud_rate,
            self.shape
        );

        let mut index = 0;
        while index < cycles.len() {
            let offset = cycles[index].start;
            if !self.window.contains_after(offset) {
                index += 1;
                continue;
            }

            let symbol = classifier.classify(&cycles[index..]);
            let Some(bit) = symbol.bit() else {
                trace!("Noise at {offset:.6}s");
                code.stats.noise += 1;
                ones = 0;
                index += symbol.cycles();
                continue;
            };

            if bit {
                code.stats.ones += 1;
                ones += 1;
                if ones > LEADER_ONES && code.stats.link == LinkState::None {
                    debug!("Leader tone at {offset:.6}s");
                    code.stats.link = LinkState::Header;
                }
            } else {
                code.stats.zeros += 1;
                ones = 0;
            }
            trace!("Bit {} at {offset:.6}s", bit as u8);

            packet.add(bit);
            if let Some(error) = packet.error() {
                code.stats.record_error(error);
                if code.stats.link == LinkState::Data {
                    code.stats.reported_errors += 1;
                    log_or_err!(self, log::Level::Warn, DecodeError::Framing { offset, error });
                } else {
                    debug!("{error} at {offset:.6}s while seeking sync");
                }
                packet.clear();
            } else if packet.is_complete() {
                let byte = packet.get();
                trace!("Byte {byte:#04X} at {offset:.6}s");
                code.data.push(byte);
                packet.clear();

                if code.stats.link == LinkState::Header {
                    info!("Data starts at {offset:.6}s");
                    code.stats.link = LinkState::Data;
                    code.stats.data_start = Some(offset);
                }
            }

            index += symbol.cycles();
        }

        code.stats.bytes = code.data.len();
        info!(
            "Decoded {} bytes ({} bits, {} noise runs, {} framing errors)",
            code.stats.bytes,
            code.stats.zeros + code.stats.ones,
            code.stats.noise,
            code.stats.framing_errors()
        );

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::packet::{Parity, StartBits, StopBits};

    fn run(lengths: impl IntoIterator<Item = f64>) -> Vec<Cycle> {
        let mut start = 0.001;
        lengths
            .into_iter()
            .map(|length| {
                let cycle = Cycle::from_span(start, start + length);
                start += length;
                cycle
            })
            .collect()
    }

    fn tone(count: usize, length: f64) -> Vec<f64> {
        vec![length; count]
    }

    /// Cycle lengths for `bits`, quantized to a 1 MHz clock: 104 groups for the
    /// low tone, 52 for the high tone.
    fn modulate(bits: &[bool]) -> Vec<f64> {
        bits.iter()
            .flat_map(|&bit| {
                if bit {
                    tone(ONE_CYCLES, 0.000_416)
                } else {
                    tone(ZERO_CYCLES, 0.000_832)
                }
            })
            .collect()
    }

    fn frame(byte: u8) -> Vec<bool> {
        let mut bits = vec![false];
        bits.extend((0..8).map(|i| byte >> i & 1 != 0));
        bits.extend([true, true]);
        bits
    }

    fn tape(bits: &[bool]) -> Tape {
        let mut tape = Tape::default();
        tape.replace_cycles(run(modulate(bits)));
        tape
    }

    #[test]
    fn classifier_thresholds() {
        let classifier = SymbolClassifier::new(300);
        let interval = classifier.interval();

        let zero = run(tone(4, interval / 4.1));
        assert_eq!(classifier.classify(&zero), Symbol::Zero);

        let one = run(tone(8, interval / 8.2));
        assert_eq!(classifier.classify(&one), Symbol::One);

        let five = run(tone(5, interval / 5.1));
        assert_eq!(classifier.classify(&five), Symbol::Noise);

        // The scan stops at the first cycle that would overshoot.
        let long = run(tone(12, interval / 4.1));
        assert_eq!(classifier.count(&long), 4);
    }

    #[test]
    fn exact_period_within_tolerance() {
        let classifier = SymbolClassifier::new(300);
        let interval = classifier.interval();
        assert_eq!(classifier.count(&run(tone(6, interval / 4.0))), 4);
        assert_eq!(classifier.count(&run(tone(9, interval / 8.0))), 8);
    }

    #[test]
    fn zero_length_stops_scan() {
        let classifier = SymbolClassifier::new(300);
        let mut cycles = run(tone(2, 0.000_832));
        cycles.push(Cycle::from_span(cycles[1].end, cycles[1].end));
        cycles.extend(run(tone(2, 0.000_832)));
        assert_eq!(classifier.count(&cycles), 2);
    }

    #[test]
    fn decodes_after_leader() -> Result<()> {
        let mut bits = vec![true; 20];
        for byte in b"10 PRINT" {
            bits.extend(frame(*byte));
        }

        let code = Decoder::default().decode(&tape(&bits))?;
        assert_eq!(code.data, b"10 PRINT");
        assert_eq!(code.stats.link, LinkState::Data);
        assert_eq!(code.stats.noise, 0);
        assert_eq!(code.stats.reported_errors, 0);
        assert_eq!(code.stats.start_errors, 20);
        Ok(())
    }

    #[test]
    fn noise_resyncs_one_cycle_at_a_time() -> Result<()> {
        let mut lengths = tone(2, 0.005);
        lengths.extend(modulate(&[true; 10]));
        lengths.extend(modulate(&frame(0x41)));
        let mut tape = Tape::default();
        tape.replace_cycles(run(lengths));

        let code = Decoder::default().decode(&tape)?;
        assert_eq!(code.stats.noise, 2);
        assert_eq!(code.data, [0x41]);
        Ok(())
    }

    #[test]
    fn strict_mode_fails_on_reported_error() {
        let mut bits = vec![true; 12];
        bits.extend(frame(0x20));
        let mut broken = frame(0x21);
        broken[9] = false;
        bits.extend(broken);

        let tape = tape(&bits);

        let lenient = Decoder::default().decode(&tape).unwrap();
        assert_eq!(lenient.data, [0x20]);
        assert_eq!(lenient.stats.stop_errors, 1);
        // The second stop bit then fails as a start bit.
        assert_eq!(lenient.stats.reported_errors, 2);

        let mut strict = Decoder::default();
        strict.set_fail_level(log::Level::Warn);
        let error = strict.decode(&tape).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DecodeError>(),
            Some(DecodeError::Framing { .. })
        ));
    }

    #[test]
    fn window_skips_cycles() -> Result<()> {
        let mut bits = vec![true; 12];
        bits.extend(frame(0x31));
        let tape = tape(&bits);
        let cutoff = tape.get(12 * ONE_CYCLES).map_or(0.0, |c| c.start);

        let mut decoder = Decoder::default();
        decoder.set_window(TimeWindow::new(0.0, cutoff));
        let code = decoder.decode(&tape)?;
        assert!(code.is_empty());
        assert_eq!(code.window.end, cutoff);
        Ok(())
    }

    #[test]
    fn custom_shape() -> Result<()> {
        let mut bits = vec![true; 12];
        // 7 data bits, one stop bit.
        bits.extend([false, true, true, false, false, false, false, true, true]);

        let mut decoder = Decoder::default();
        decoder.set_packet_shape(PacketShape::new(
            Parity::None,
            StartBits::Space,
            StopBits::One,
            7,
        ));
        assert!(decoder.set_baud_rate(0).is_err());
        decoder.set_baud_rate(297)?;

        let code = decoder.decode(&tape(&bits))?;
        assert_eq!(code.data, [0x86]);
        assert_eq!(code.baud_rate, 297);
        Ok(())
    }
}
