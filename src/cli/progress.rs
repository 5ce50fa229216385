use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Samples examined between progress bar updates.
pub const UPDATE_INTERVAL: u64 = 64 * 1024;

pub fn create_progress_bar(multi: &MultiProgress, total_samples: u64) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new(total_samples));
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent}% of samples\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
    )?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("extracting cycles");
    Ok(pb)
}

pub fn create_spinner(multi: &MultiProgress, message: &'static str) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new_spinner());
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}
