use anyhow::Result;
use taperaw::process::histogram::histogram;

use super::command::{Cli, HistogramArgs};
use super::load_tape;

pub fn cmd_histogram(args: &HistogramArgs, cli: &Cli) -> Result<()> {
    let tape = load_tape(&args.input, &args.tape, &[], cli)?;

    let bins = histogram(tape.cycles(), tape.clock_frequency(), tape.window());
    for (groups, count) in &bins {
        println!("{groups:03} {count}");
    }

    log::info!(
        "{} cycles in {} distinct lengths",
        bins.values().sum::<u64>(),
        bins.len()
    );
    Ok(())
}
