//! Decoded audio samples.

use crate::utils::errors::WaveError;

/// A single channel of normalized samples (roughly `[-1, 1]`) and its rate.
///
/// Reading a container format into a [`Wave`] is left to the caller.
#[derive(Debug, Clone)]
pub struct Wave {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Wave {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, WaveError> {
        if sample_rate == 0 {
            return Err(WaveError::ZeroSampleRate);
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

#[test]
fn rejects_zero_rate() {
    assert!(Wave::new(vec![0.0; 4], 0).is_err());

    let wave = Wave::new(vec![0.0; 22050], 44100).unwrap();
    assert_eq!(wave.duration(), 0.5);
}
