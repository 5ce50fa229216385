use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use taperaw::process::decode::Decoder;
use taperaw::structs::packet::{Parity, PacketShape};
use taperaw::utils::window::TimeWindow;

use super::command::{Cli, CodeArgs};
use super::load_tape;
use super::output::resolve_output;
use super::progress::create_spinner;
use crate::timestamp::time_str;

pub fn cmd_code(args: &CodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let tape = load_tape(&args.input, &args.tape, &args.patch, cli)?;

    let mut decoder = Decoder::default();
    decoder.set_baud_rate(args.baud)?;
    decoder.set_window(TimeWindow::new(args.tape.start, args.tape.end));
    decoder.set_packet_shape(PacketShape::new(
        Parity::None,
        args.start_bit.into(),
        args.stop_bits.into(),
        args.data_bits,
    ));
    decoder.set_fail_level(cli.fail_level());

    let pb = multi
        .map(|multi| create_spinner(multi, "decoding"))
        .transpose()?;
    let code = decoder.decode(&tape);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let code = code?;

    if let Some(start) = code.stats.data_start {
        log::info!("Program data starts at {}", time_str(start));
    } else {
        log::warn!("No data found after a leader tone");
    }

    let to_stdout = args.output.is_none() && args.input.as_os_str() == "-";
    if to_stdout {
        code.write_to(io::stdout().lock())?;
    } else {
        let output = resolve_output(&args.input, args.output.as_deref(), "bas");
        let file = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = BufWriter::new(file);
        code.write_to(&mut writer)?;
        writer.flush()?;
        log::info!("Wrote {} bytes to {}", code.len(), output.display());
    }

    if log::log_enabled!(log::Level::Debug) {
        for line in serde_yaml_ng::to_string(&code)?.lines() {
            log::debug!("{line}");
        }
    }

    Ok(())
}
