use std::sync::Arc;

use ac_core::frame::Spectrogram;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::Deserialize;

use crate::error::AudioError;

/// Padding applied around the signal when frames are centered.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Mirror the signal without repeating the edge sample.
    #[default]
    Reflect,
    /// Zeros.
    Constant,
}

/// STFT framing parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StftConfig {
    pub n_fft: usize,
    pub win_length: usize,
    pub hop_length: usize,
    /// Zeros added on both sides before framing.
    pub pad: usize,
    /// Pad `n_fft / 2` on both sides so frame `t` is centered on sample `t × hop`.
    pub center: bool,
    pub pad_mode: PadMode,
    /// Scale by `1 / sqrt(Σ window²)`.
    pub normalized: bool,
}

impl StftConfig {
    /// Defaults for a given FFT size: full-length window, 50 % hop, centered.
    #[must_use]
    pub fn new(n_fft: usize) -> Self {
        Self {
            n_fft,
            win_length: n_fft,
            hop_length: (n_fft / 2).max(1),
            pad: 0,
            center: true,
            pad_mode: PadMode::Reflect,
            normalized: false,
        }
    }
}

/// Windowed short-time real FFT using realfft.
///
/// The FFT plan and window are built once; each call allocates its own
/// scratch buffers so one `Stft` can be shared across threads.
///
/// # Example
/// ```
/// use ac_audio::stft::{Stft, StftConfig};
/// let stft = Stft::new(StftConfig::new(400)).unwrap();
/// assert_eq!(stft.num_bins(), 201);
/// assert_eq!(stft.num_frames(64000), 321);
/// ```
pub struct Stft {
    config: StftConfig,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Periodic Hann window of `win_length`, zero-padded and centered in `n_fft`.
    window: Vec<f32>,
    scale: f32,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Stft {
    /// Plan the FFT and build the window.
    ///
    /// # Errors
    /// Returns `AudioError::InvalidParams` for a zero size or hop, or a
    /// window longer than the FFT.
    pub fn new(config: StftConfig) -> Result<Self, AudioError> {
        let invalid = |reason: String| AudioError::InvalidParams {
            transform: "stft",
            reason,
        };
        if config.n_fft == 0 {
            return Err(invalid("n_fft must be positive".into()));
        }
        if config.hop_length == 0 {
            return Err(invalid("hop_length must be positive".into()));
        }
        if config.win_length == 0 || config.win_length > config.n_fft {
            return Err(invalid(format!(
                "win_length {} must be in 1..={}",
                config.win_length, config.n_fft
            )));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(config.n_fft);

        let offset = (config.n_fft - config.win_length) / 2;
        let mut window = vec![0.0f32; config.n_fft];
        for i in 0..config.win_length {
            window[offset + i] = 0.5
                * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / config.win_length as f32).cos());
        }

        let scale = if config.normalized {
            let energy: f32 = window.iter().map(|w| w * w).sum();
            1.0 / energy.sqrt()
        } else {
            1.0
        };

        Ok(Self {
            config,
            plan,
            window,
            scale,
        })
    }

    /// Frequency bins per frame: `n_fft / 2 + 1`.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.config.n_fft / 2 + 1
    }

    /// Frames produced for a signal of `len` samples.
    #[must_use]
    pub fn num_frames(&self, len: usize) -> usize {
        let c = &self.config;
        let mut padded = len + 2 * c.pad;
        if c.center {
            padded += 2 * (c.n_fft / 2);
        }
        if padded < c.n_fft {
            0
        } else {
            1 + (padded - c.n_fft) / c.hop_length
        }
    }

    fn padded_signal(&self, samples: &[f32]) -> Result<Vec<f32>, AudioError> {
        let c = &self.config;
        let mut signal = Vec::with_capacity(samples.len() + 2 * c.pad);
        signal.resize(c.pad, 0.0);
        signal.extend_from_slice(samples);
        signal.resize(samples.len() + 2 * c.pad, 0.0);

        if !c.center {
            return Ok(signal);
        }

        let half = c.n_fft / 2;
        match c.pad_mode {
            PadMode::Constant => {
                let mut out = vec![0.0; half];
                out.extend_from_slice(&signal);
                out.resize(signal.len() + 2 * half, 0.0);
                Ok(out)
            }
            PadMode::Reflect => {
                let n = signal.len();
                if half >= n {
                    return Err(AudioError::TooShort {
                        samples: n,
                        pad: half,
                    });
                }
                let mut out = Vec::with_capacity(n + 2 * half);
                out.extend((1..=half).rev().map(|i| signal[i]));
                out.extend_from_slice(&signal);
                out.extend((n - 1 - half..n - 1).rev().map(|i| signal[i]));
                Ok(out)
            }
        }
    }

    /// Magnitude spectrogram raised to `power`, shape `num_bins × frames`.
    ///
    /// `power = 2.0` yields the power spectrum, `1.0` the magnitude.
    ///
    /// # Errors
    /// Returns an error if reflect padding is impossible or the FFT fails.
    pub fn spectrogram(&self, samples: &[f32], power: f32) -> Result<Spectrogram, AudioError> {
        let signal = self.padded_signal(samples)?;
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let bins = self.num_bins();
        let frames = self.num_frames(samples.len());

        let mut input = self.plan.make_input_vec();
        let mut spectrum: Vec<Complex<f32>> = self.plan.make_output_vec();
        let mut scratch = self.plan.make_scratch_vec();
        let mut out = Spectrogram::zeros(bins, frames);

        for t in 0..frames {
            let start = t * hop;
            let frame = &signal[start..start + n_fft];
            for ((slot, &s), &w) in input.iter_mut().zip(frame).zip(&self.window) {
                *slot = s * w;
            }

            self.plan
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .map_err(|e| AudioError::Fft(e.to_string()))?;

            for (k, c) in spectrum.iter().enumerate() {
                let mag = (c.re * c.re + c.im * c.im).sqrt() * self.scale;
                out.data[k * frames + t] = if (power - 2.0).abs() < f32::EPSILON {
                    mag * mag
                } else if (power - 1.0).abs() < f32::EPSILON {
                    mag
                } else {
                    mag.powf(power)
                };
            }
        }

        Ok(out)
    }
}
