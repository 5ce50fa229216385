use std::fs::File;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use taperaw::structs::tape::Tape;
use taperaw::utils::window::TimeWindow;

use super::command::{Cli, TapeArgs};
use super::output::resolve_output;
use super::progress::{UPDATE_INTERVAL, create_progress_bar};
use crate::timestamp::time_str;
use crate::wav::read_wave;

pub fn cmd_tape(args: &TapeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Converting recording: {}", args.input.display());

    let wave = read_wave(&args.input)?;

    let mut tape = Tape::default();
    tape.set_clock_frequency(args.tape.frequency);
    tape.set_version(args.tape_version.into());
    tape.set_window(TimeWindow::new(args.tape.start, args.tape.end));
    tape.set_threshold(args.threshold);
    tape.set_fail_level(cli.fail_level());

    match multi {
        Some(multi) => {
            let pb = create_progress_bar(multi, wave.len() as u64)?;
            let rate = wave.sample_rate() as f64;
            let mut cycles = Vec::new();
            let mut reported = 0;

            for cycle in tape.extractor(&wave) {
                let position = (cycle.end * rate) as u64;
                cycles.push(cycle);

                if position.saturating_sub(reported) >= UPDATE_INTERVAL {
                    pb.set_position(position);
                    pb.set_message(format!("{} cycles", cycles.len()));
                    reported = position;
                }
            }

            pb.finish_and_clear();
            log::info!("Extracted {} cycles", cycles.len());
            tape.replace_cycles(cycles);
        }
        None => tape.convert(&wave),
    }

    tape.analyse();

    let output = resolve_output(&args.input, args.output.as_deref(), "tap");
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    tape.write(file)?;

    log::info!(
        "Wrote {} cycles ({}) to {}",
        tape.len(),
        time_str(tape.duration()),
        output.display()
    );

    Ok(())
}
