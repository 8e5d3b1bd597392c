use ac_core::config::NormalizeConfig;

use crate::error::AudioError;
use crate::resample::resample_mono;

/// Brings every waveform to the configured rate and a fixed sample count.
///
/// # Example
/// ```
/// use ac_audio::normalize::Normalizer;
/// let normalizer = Normalizer::new(16000, 64000);
/// let out = normalizer.apply(vec![0.5; 32000], 16000).unwrap();
/// assert_eq!(out.len(), 64000);
/// assert_eq!(out[31999], 0.5);
/// assert_eq!(out[32000], 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Normalizer {
    sample_rate: u32,
    target_len: usize,
    truncate: bool,
    resample: bool,
}

impl Normalizer {
    /// Strict normalizer: resamples, never truncates.
    #[must_use]
    pub fn new(sample_rate: u32, target_len: usize) -> Self {
        Self {
            sample_rate,
            target_len,
            truncate: false,
            resample: true,
        }
    }

    #[must_use]
    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            target_len: config.target_len(),
            truncate: config.truncate,
            resample: config.resample,
        }
    }

    /// Trim over-long waveforms instead of rejecting them.
    #[must_use]
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Allow or forbid resampling of off-rate files.
    #[must_use]
    pub fn with_resample(mut self, resample: bool) -> Self {
        self.resample = resample;
        self
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Resample to the configured rate if needed, then fit to `target_len`.
    ///
    /// # Errors
    /// - `SampleRateMismatch` if the rate differs and resampling is off.
    /// - `TooLong` if the waveform exceeds the target and truncation is off.
    pub fn apply(&self, samples: Vec<f32>, sample_rate: u32) -> Result<Vec<f32>, AudioError> {
        let samples = if sample_rate == self.sample_rate {
            samples
        } else if self.resample {
            log::debug!("Resampling {sample_rate}Hz -> {}Hz", self.sample_rate);
            resample_mono(&samples, sample_rate, self.sample_rate)?
        } else {
            return Err(AudioError::SampleRateMismatch {
                found: sample_rate,
                expected: self.sample_rate,
            });
        };

        if samples.len() > self.target_len && self.truncate {
            let mut samples = samples;
            samples.truncate(self.target_len);
            return Ok(samples);
        }
        pad_right(samples, self.target_len)
    }
}

/// Right-pad with zeros up to `target` samples.
///
/// # Errors
/// Returns `AudioError::TooLong` if `samples` already exceeds `target`.
pub fn pad_right(mut samples: Vec<f32>, target: usize) -> Result<Vec<f32>, AudioError> {
    if samples.len() > target {
        return Err(AudioError::TooLong {
            samples: samples.len(),
            target,
        });
    }
    samples.resize(target, 0.0);
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_half_length_clip() {
        let out = pad_right(vec![1.0; 32000], 64000).unwrap();
        assert_eq!(out.len(), 64000);
        assert!(out[..32000].iter().all(|&s| (s - 1.0).abs() < f32::EPSILON));
        assert!(out[32000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn exact_length_is_untouched() {
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(pad_right(input.clone(), 100).unwrap(), input);
    }

    #[test]
    fn too_long_is_rejected() {
        let err = Normalizer::new(16000, 10).apply(vec![0.0; 11], 16000).unwrap_err();
        assert!(matches!(err, AudioError::TooLong { samples: 11, target: 10 }));
    }

    #[test]
    fn truncate_is_opt_in() {
        let out = Normalizer::new(16000, 10)
            .with_truncate(true)
            .apply((0..20).map(|i| i as f32).collect(), 16000)
            .unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[9], 9.0);
    }

    #[test]
    fn rate_mismatch_without_resampling() {
        let err = Normalizer::new(16000, 100)
            .with_resample(false)
            .apply(vec![0.0; 10], 44100)
            .unwrap_err();
        assert!(matches!(
            err,
            AudioError::SampleRateMismatch { found: 44100, expected: 16000 }
        ));
    }

    #[test]
    fn off_rate_clip_is_resampled_then_padded() {
        let out = Normalizer::new(16000, 16000)
            .apply(vec![0.25; 22050], 44100)
            .unwrap();
        assert_eq!(out.len(), 16000);
        // 22050 @ 44.1k ≈ 8000 @ 16k, the tail is padding
        assert_eq!(out[15999], 0.0);
    }
}
