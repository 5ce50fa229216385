use std::path::Path;

use anyhow::{Context, Result};
use taperaw::structs::tape::Tape;
use taperaw::utils::window::TimeWindow;

use crate::input::InputReader;
use command::{Cli, TapeOptions};

pub mod code;
pub mod command;
pub mod histogram;
pub mod info;
pub mod output;
pub mod progress;
pub mod tape;

/// Loads a tape image from `input` ("-" for stdin) with the shared tape options applied.
pub(crate) fn load_tape(
    input: &Path,
    options: &TapeOptions,
    patches: &[(usize, u8)],
    cli: &Cli,
) -> Result<Tape> {
    let mut tape = Tape::default();
    tape.set_clock_frequency(options.frequency);
    tape.set_window(TimeWindow::new(options.start, options.end));
    tape.set_fail_level(cli.fail_level());
    for &(index, value) in patches {
        tape.set_patch(index, value);
    }

    let reader = InputReader::new(input)?;
    let source = if reader.is_pipe() {
        "stdin".to_string()
    } else {
        input.display().to_string()
    };
    tape.read(reader)
        .with_context(|| format!("Failed to load tape image from {source}"))?;

    log::info!(
        "Loaded {} cycles from {source} (version {})",
        tape.len(),
        u8::from(tape.version())
    );
    Ok(tape)
}
