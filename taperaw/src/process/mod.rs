/// Cycle extraction from audio samples.
///
/// Provides the [`CycleExtractor`](extract::CycleExtractor) for locating zero
/// crossings and yielding [`Cycle`](crate::structs::cycle::Cycle) objects.
pub mod extract;

/// Quantization of cycle lengths to whole clock-cycle groups.
pub mod analyse;

/// Raw tape image reading and writing.
///
/// Provides the [`TapeReader`](codec::TapeReader) and
/// [`TapeWriter`](codec::TapeWriter) for the `UK101-TAPRAW` record format.
pub mod codec;

/// Bit classification and serial framing.
///
/// Provides the [`Decoder`](decode::Decoder) for turning the cycles of a
/// [`Tape`](crate::structs::tape::Tape) into a [`Code`](crate::structs::code::Code).
pub mod decode;

/// Pulse length statistics.
pub mod histogram;
