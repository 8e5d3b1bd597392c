use ac_core::frame::Spectrogram;
use serde::Deserialize;

use crate::error::AudioError;
use crate::stft::{PadMode, Stft, StftConfig};

/// Hz ↔ mel conversion formula.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MelScale {
    /// `2595 · log10(1 + f / 700)`.
    #[default]
    Htk,
    /// Linear below 1 kHz, logarithmic above (Slaney's Auditory Toolbox).
    Slaney,
}

/// Filter normalization.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MelNorm {
    /// Divide each triangle by its bandwidth (constant area).
    Slaney,
}

impl MelScale {
    #[must_use]
    pub fn hz_to_mel(self, freq: f64) -> f64 {
        match self {
            Self::Htk => 2595.0 * (1.0 + freq / 700.0).log10(),
            Self::Slaney => {
                let f_sp = 200.0 / 3.0;
                let min_log_hz = 1000.0;
                let min_log_mel = min_log_hz / f_sp;
                let logstep = 6.4f64.ln() / 27.0;
                if freq >= min_log_hz {
                    min_log_mel + (freq / min_log_hz).ln() / logstep
                } else {
                    freq / f_sp
                }
            }
        }
    }

    #[must_use]
    pub fn mel_to_hz(self, mel: f64) -> f64 {
        match self {
            Self::Htk => 700.0 * (10f64.powf(mel / 2595.0) - 1.0),
            Self::Slaney => {
                let f_sp = 200.0 / 3.0;
                let min_log_hz = 1000.0;
                let min_log_mel = min_log_hz / f_sp;
                let logstep = 6.4f64.ln() / 27.0;
                if mel >= min_log_mel {
                    min_log_hz * (logstep * (mel - min_log_mel)).exp()
                } else {
                    f_sp * mel
                }
            }
        }
    }
}

/// Parameters of the `mel` transform (`runtime.transform.params`).
///
/// Every key is optional; unknown keys are rejected.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MelParams {
    pub n_fft: usize,
    /// Defaults to `n_fft`.
    pub win_length: Option<usize>,
    /// Defaults to `win_length / 2`.
    pub hop_length: Option<usize>,
    pub f_min: f64,
    /// Defaults to the Nyquist frequency.
    pub f_max: Option<f64>,
    pub pad: usize,
    pub n_mels: usize,
    pub power: f32,
    pub normalized: bool,
    pub center: bool,
    pub pad_mode: PadMode,
    pub norm: Option<MelNorm>,
    pub mel_scale: MelScale,
}

impl Default for MelParams {
    fn default() -> Self {
        Self {
            n_fft: 400,
            win_length: None,
            hop_length: None,
            f_min: 0.0,
            f_max: None,
            pad: 0,
            n_mels: 128,
            power: 2.0,
            normalized: false,
            center: true,
            pad_mode: PadMode::Reflect,
            norm: None,
            mel_scale: MelScale::Htk,
        }
    }
}

impl MelParams {
    /// STFT framing derived from these parameters.
    #[must_use]
    pub fn stft_config(&self) -> StftConfig {
        let win_length = self.win_length.unwrap_or(self.n_fft);
        StftConfig {
            n_fft: self.n_fft,
            win_length,
            hop_length: self.hop_length.unwrap_or(win_length / 2),
            pad: self.pad,
            center: self.center,
            pad_mode: self.pad_mode,
            normalized: self.normalized,
        }
    }
}

/// Triangular mel filterbank, row-major `n_mels × n_freqs`.
///
/// Filter `m` rises from mel point `m` to `m + 1` and falls to `m + 2`, the
/// `n_mels + 2` points being evenly spaced on the mel scale between `f_min`
/// and `f_max`. Linear bins are spread over `[0, sample_rate / 2]`.
///
/// # Example
/// ```
/// use ac_audio::mel::{mel_filterbank, MelScale};
/// let fb = mel_filterbank(201, 0.0, 8000.0, 40, 16000, None, MelScale::Htk);
/// assert_eq!(fb.len(), 40 * 201);
/// assert!(fb.iter().all(|&w| (0.0..=1.0).contains(&w)));
/// ```
#[must_use]
pub fn mel_filterbank(
    n_freqs: usize,
    f_min: f64,
    f_max: f64,
    n_mels: usize,
    sample_rate: u32,
    norm: Option<MelNorm>,
    scale: MelScale,
) -> Vec<f32> {
    let nyquist = f64::from(sample_rate / 2);
    let all_freqs: Vec<f64> = (0..n_freqs)
        .map(|i| {
            if n_freqs > 1 {
                nyquist * i as f64 / (n_freqs - 1) as f64
            } else {
                0.0
            }
        })
        .collect();

    let m_min = scale.hz_to_mel(f_min);
    let m_max = scale.hz_to_mel(f_max);
    let f_pts: Vec<f64> = (0..n_mels + 2)
        .map(|i| scale.mel_to_hz(m_min + (m_max - m_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut fb = vec![0.0f32; n_mels * n_freqs];
    for m in 0..n_mels {
        let (lo, mid, hi) = (f_pts[m], f_pts[m + 1], f_pts[m + 2]);
        let enorm = match norm {
            Some(MelNorm::Slaney) => 2.0 / (hi - lo),
            None => 1.0,
        };
        for (f, &freq) in all_freqs.iter().enumerate() {
            let down = (freq - lo) / (mid - lo);
            let up = (hi - freq) / (hi - mid);
            let w = down.min(up).max(0.0);
            fb[m * n_freqs + f] = (w * enorm) as f32;
        }
    }
    fb
}

/// Mel-scaled power spectrogram.
///
/// # Example
/// ```
/// use ac_audio::mel::{MelParams, MelSpectrogram};
/// let mel = MelSpectrogram::new(MelParams::default(), 16000).unwrap();
/// let shape = mel.output_shape(64000);
/// assert_eq!((shape.bins, shape.frames), (128, 321));
/// ```
#[derive(Debug)]
pub struct MelSpectrogram {
    params: MelParams,
    stft: Stft,
    filterbank: Vec<f32>,
}

impl MelSpectrogram {
    /// Build the STFT plan and filterbank for `sample_rate`.
    ///
    /// # Errors
    /// Returns `AudioError::InvalidParams` for inconsistent parameters.
    pub fn new(params: MelParams, sample_rate: u32) -> Result<Self, AudioError> {
        let invalid = |reason: String| AudioError::InvalidParams {
            transform: "mel",
            reason,
        };
        if params.n_mels == 0 {
            return Err(invalid("n_mels must be positive".into()));
        }
        if !(params.power.is_finite() && params.power > 0.0) {
            return Err(invalid(format!("power must be positive, got {}", params.power)));
        }
        let f_max = params.f_max.unwrap_or(f64::from(sample_rate / 2));
        if !(params.f_min >= 0.0 && params.f_min < f_max) {
            return Err(invalid(format!(
                "need 0 <= f_min < f_max, got f_min={} f_max={f_max}",
                params.f_min
            )));
        }

        let stft = Stft::new(params.stft_config())?;
        let n_freqs = stft.num_bins();
        let filterbank = mel_filterbank(
            n_freqs,
            params.f_min,
            f_max,
            params.n_mels,
            sample_rate,
            params.norm,
            params.mel_scale,
        );

        let empty = (0..params.n_mels)
            .filter(|&m| filterbank[m * n_freqs..(m + 1) * n_freqs].iter().all(|&w| w == 0.0))
            .count();
        if empty > 0 {
            log::warn!(
                "{empty} of {} mel filters are all zero: n_mels is too high for n_fft={}",
                params.n_mels,
                params.n_fft
            );
        }

        Ok(Self {
            params,
            stft,
            filterbank,
        })
    }

    /// Shape produced for a signal of `num_samples`.
    #[must_use]
    pub fn output_shape(&self, num_samples: usize) -> ac_core::FeatureShape {
        ac_core::FeatureShape::new(self.params.n_mels, self.stft.num_frames(num_samples))
    }

    /// Compute the mel spectrogram, shape `n_mels × frames`.
    ///
    /// # Errors
    /// Propagates STFT failures.
    pub fn apply(&self, samples: &[f32]) -> Result<Spectrogram, AudioError> {
        let spec = self.stft.spectrogram(samples, self.params.power)?;
        let n_freqs = spec.bins;
        let frames = spec.frames;
        let mut out = Spectrogram::zeros(self.params.n_mels, frames);

        for m in 0..self.params.n_mels {
            let filter = &self.filterbank[m * n_freqs..(m + 1) * n_freqs];
            let row = &mut out.data[m * frames..(m + 1) * frames];
            for (f, &w) in filter.iter().enumerate() {
                if w == 0.0 {
                    continue;
                }
                for (acc, &v) in row.iter_mut().zip(spec.row(f)) {
                    *acc += w * v;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scales_round_trip() {
        for scale in [MelScale::Htk, MelScale::Slaney] {
            for hz in [0.0, 300.0, 1000.0, 4000.0, 11025.0] {
                let back = scale.mel_to_hz(scale.hz_to_mel(hz));
                assert!((back - hz).abs() < 1e-6, "{scale:?} {hz} -> {back}");
            }
        }
        assert!((MelScale::Htk.hz_to_mel(700.0) - 2595.0 * 2f64.log10()).abs() < 1e-9);
        assert!((MelScale::Slaney.hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn filters_peak_at_one_and_cover_band() {
        let fb = mel_filterbank(257, 0.0, 8000.0, 10, 16000, None, MelScale::Htk);
        for m in 0..10 {
            let row = &fb[m * 257..(m + 1) * 257];
            let peak = row.iter().copied().fold(0.0f32, f32::max);
            assert!(peak > 0.5 && peak <= 1.0, "filter {m} peak {peak}");
        }
    }

    #[test]
    fn slaney_norm_scales_by_bandwidth() {
        let plain = mel_filterbank(201, 0.0, 8000.0, 8, 16000, None, MelScale::Slaney);
        let normed = mel_filterbank(201, 0.0, 8000.0, 8, 16000, Some(MelNorm::Slaney), MelScale::Slaney);
        // Higher filters are wider, so their weights shrink more.
        let ratio = |m: usize| {
            let p: f32 = plain[m * 201..(m + 1) * 201].iter().sum();
            let n: f32 = normed[m * 201..(m + 1) * 201].iter().sum();
            n / p
        };
        assert!(ratio(7) < ratio(0));
    }

    #[test]
    fn defaults_give_128_mels_and_hop_200() {
        let params = MelParams::default();
        let stft = params.stft_config();
        assert_eq!(stft.win_length, 400);
        assert_eq!(stft.hop_length, 200);
        assert_eq!(params.n_mels, 128);
    }

    #[test]
    fn silence_gives_zero_mel() {
        let mel = MelSpectrogram::new(
            MelParams {
                n_mels: 16,
                ..MelParams::default()
            },
            16000,
        )
        .unwrap();
        let out = mel.apply(&vec![0.0; 4000]).unwrap();
        assert_eq!(out.shape(), mel.output_shape(4000));
        assert!(out.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_inverted_band() {
        let params = MelParams {
            f_min: 5000.0,
            f_max: Some(1000.0),
            ..MelParams::default()
        };
        assert!(MelSpectrogram::new(params, 16000).is_err());
    }
}
