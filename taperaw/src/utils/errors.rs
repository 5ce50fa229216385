#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

/// Failures while loading a raw tape image.
///
/// A tape whose load failed has an empty cycle sequence.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("Tape header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch { expected: String, found: String },

    #[error("Tape data truncated after {records} records ({read} of {expected} bytes)")]
    Truncated {
        records: usize,
        read: u32,
        expected: u32,
    },

    #[error("Unsupported tape version {0}")]
    UnsupportedVersion(u8),

    #[error("I/O error while reading tape: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-frame errors reported by [`Packet`](crate::structs::packet::Packet).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FramingError {
    #[error("No start bit")]
    Start,

    #[error("No stop bit(s)")]
    Stop,

    #[error("Data overrun")]
    Overrun,
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Framing error at {offset:.6}s: {error}")]
    Framing { offset: f64, error: FramingError },

    #[error("Baud rate must be positive, got {0}")]
    InvalidBaudRate(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum WaveError {
    #[error("Sample rate must be positive")]
    ZeroSampleRate,
}
