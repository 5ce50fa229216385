use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use taperaw::structs::packet::{StartBits, StopBits};
use taperaw::structs::tape::{DEFAULT_CLOCK_FREQUENCY, TapeVersion};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} ({})\ntaperaw {}\nbuilt {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("unknown"),
        env!("TAPERAW_VERSION"),
        env!("BUILD_TIMESTAMP"),
    )
});

/// Slightly under nominal, which tolerates slow tape transports.
const CLI_BAUD_RATE: u32 = 297;

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION.as_str(),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for recovering UK101 cassette recordings",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a WAV recording into a raw tape image.
    Tape(TapeArgs),

    /// Decode a raw tape image into program bytes.
    Code(CodeArgs),

    /// Print a histogram of pulse lengths in a tape image
    Histogram(HistogramArgs),

    /// Print tape image information
    Info(InfoArgs),
}

/// Options shared by commands that read a tape image.
#[derive(Debug, Args)]
pub struct TapeOptions {
    /// Reference clock in Hz.
    #[arg(long, value_name = "HZ", default_value_t = DEFAULT_CLOCK_FREQUENCY)]
    pub frequency: u32,

    /// Offset to the start of data in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub start: f64,

    /// Offset to the end of data in seconds (0 for the whole recording).
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub end: f64,
}

#[derive(Debug, Args)]
pub struct TapeArgs {
    /// Input WAV recording.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output tape image (defaults to INPUT with a .tap extension).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Tape image version.
    #[arg(long, value_enum, default_value_t = TapeVersionArg::V0)]
    pub tape_version: TapeVersionArg,

    /// Pulses whose peaks stay within this level are ignored.
    #[arg(long, value_name = "LEVEL", default_value_t = 0.0)]
    pub threshold: f64,

    #[command(flatten)]
    pub tape: TapeOptions,
}

#[derive(Debug, Args)]
pub struct CodeArgs {
    /// Input tape image (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output program file (defaults to INPUT with a .bas extension).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Baud rate.
    #[arg(long, default_value_t = CLI_BAUD_RATE)]
    pub baud: u32,

    /// Start bit level.
    #[arg(long, value_enum, default_value_t = StartBitArg::Space)]
    pub start_bit: StartBitArg,

    /// Number of stop bits.
    #[arg(long, value_enum, default_value_t = StopBitsArg::Two)]
    pub stop_bits: StopBitsArg,

    /// Number of data bits (1-8).
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u8).range(1..=8))]
    pub data_bits: u8,

    /// Replace a record byte while loading, e.g. --patch 91072=52.
    #[arg(long, value_name = "INDEX=VALUE", value_parser = parse_patch)]
    pub patch: Vec<(usize, u8)>,

    #[command(flatten)]
    pub tape: TapeOptions,
}

#[derive(Debug, Args)]
pub struct HistogramArgs {
    /// Input tape image (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[command(flatten)]
    pub tape: TapeOptions,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input tape image (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Reference clock in Hz.
    #[arg(long, value_name = "HZ", default_value_t = DEFAULT_CLOCK_FREQUENCY)]
    pub frequency: u32,
}

fn parse_patch(value: &str) -> Result<(usize, u8), String> {
    let (index, byte) = value
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{value}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid record index '{index}': {e}"))?;
    let byte = byte
        .trim()
        .parse::<u8>()
        .map_err(|e| format!("invalid record value '{byte}': {e}"))?;
    Ok((index, byte))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum TapeVersionArg {
    /// Long pulses are stored as a bare overflow marker.
    #[value(name = "0")]
    V0,
    /// Long pulses carry their exact length.
    #[value(name = "1")]
    V1,
}

impl From<TapeVersionArg> for TapeVersion {
    fn from(arg: TapeVersionArg) -> Self {
        match arg {
            TapeVersionArg::V0 => TapeVersion::V0,
            TapeVersionArg::V1 => TapeVersion::V1,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum StartBitArg {
    /// No start bit.
    None,
    /// Start bit at logical 1.
    Mark,
    /// Start bit at logical 0 (default).
    Space,
}

impl From<StartBitArg> for StartBits {
    fn from(arg: StartBitArg) -> Self {
        match arg {
            StartBitArg::None => StartBits::None,
            StartBitArg::Mark => StartBits::Mark,
            StartBitArg::Space => StartBits::Space,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum StopBitsArg {
    #[value(name = "0")]
    None,
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::None => StopBits::None,
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}
