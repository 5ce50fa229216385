use anyhow::Result;
use serde::Serialize;
use taperaw::process::histogram::histogram;
use taperaw::structs::tape::{Tape, TapeVersion};

use super::command::{Cli, InfoArgs, TapeOptions};
use super::load_tape;
use crate::timestamp::time_str;

#[derive(Debug, Serialize)]
struct TapeInfo {
    header: String,
    version: TapeVersion,
    clock_frequency: u32,
    cycles: usize,
    duration: String,
    seconds: f64,
    /// Shortest and longest cycle, in clock-cycle groups.
    shortest: Option<u32>,
    longest: Option<u32>,
    /// The most frequent lengths with their counts.
    common_lengths: Vec<(u32, u64)>,
}

impl TapeInfo {
    fn from_tape(tape: &Tape) -> Self {
        let bins = histogram(tape.cycles(), tape.clock_frequency(), tape.window());

        let mut common_lengths = bins.iter().map(|(&g, &n)| (g, n)).collect::<Vec<_>>();
        common_lengths.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        common_lengths.truncate(4);

        Self {
            header: String::from_utf8_lossy(tape.header()).into_owned(),
            version: tape.version(),
            clock_frequency: tape.clock_frequency(),
            cycles: tape.len(),
            duration: time_str(tape.duration()),
            seconds: tape.duration(),
            shortest: bins.keys().next().copied(),
            longest: bins.keys().next_back().copied(),
            common_lengths,
        }
    }
}

pub fn cmd_info(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let options = TapeOptions {
        frequency: args.frequency,
        start: 0.0,
        end: 0.0,
    };
    let tape = load_tape(&args.input, &options, &[], cli)?;

    print!("{}", serde_yaml_ng::to_string(&TapeInfo::from_tape(&tape))?);
    Ok(())
}
