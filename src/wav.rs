use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader};
use log::{debug, info};
use taperaw::structs::wave::Wave;

/// Reads the first channel of a RIFF/WAVE recording as normalized samples.
pub fn read_wave(path: &Path) -> Result<Wave> {
    let reader =
        WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let wave = wave_from_reader(reader)?;

    info!(
        "Loaded {}: {} samples at {} Hz",
        path.display(),
        wave.len(),
        wave.sample_rate()
    );
    Ok(wave)
}

fn wave_from_reader<R: Read>(mut reader: WavReader<R>) -> Result<Wave> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let bits = spec.bits_per_sample;

    debug!(
        "WAV format: {} Hz, {} channel(s), {}-bit {:?}",
        spec.sample_rate, spec.channels, bits, spec.sample_format
    );
    if channels > 1 {
        debug!("Using the first of {channels} channels");
    }

    let samples = match (spec.sample_format, bits) {
        (SampleFormat::Int, 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<Result<Vec<_>, _>>()?,
        (format, bits) => bail!("Unsupported WAV format: {bits}-bit {format:?}"),
    };

    Ok(Wave::new(samples, spec.sample_rate)?)
}
