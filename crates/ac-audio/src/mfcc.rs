use ac_core::frame::Spectrogram;
use serde::Deserialize;

use crate::error::AudioError;
use crate::mel::{MelParams, MelSpectrogram};

const TOP_DB: f32 = 80.0;
const AMIN: f32 = 1e-10;
const LOG_OFFSET: f32 = 1e-6;

/// DCT normalization.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DctNorm {
    /// Orthonormal DCT-II.
    Ortho,
}

/// Parameters of the `mfcc` transform.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MfccParams {
    pub n_mfcc: usize,
    /// Only type 2 is supported.
    pub dct_type: u8,
    pub norm: Option<DctNorm>,
    /// Use `ln(mel + 1e-6)` instead of decibels.
    pub log_mels: bool,
    /// Parameters of the underlying mel spectrogram.
    pub melkwargs: MelParams,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            n_mfcc: 40,
            dct_type: 2,
            norm: Some(DctNorm::Ortho),
            log_mels: false,
            melkwargs: MelParams::default(),
        }
    }
}

/// DCT-II basis, row-major `n_mfcc × n_mels`.
///
/// # Example
/// ```
/// use ac_audio::mfcc::{dct_matrix, DctNorm};
/// let dct = dct_matrix(4, 4, Some(DctNorm::Ortho));
/// // Orthonormal: first row is constant 1/sqrt(N)
/// assert!((dct[0] - 0.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn dct_matrix(n_mfcc: usize, n_mels: usize, norm: Option<DctNorm>) -> Vec<f32> {
    let n = n_mels as f64;
    let mut dct = vec![0.0f32; n_mfcc * n_mels];
    for k in 0..n_mfcc {
        for i in 0..n_mels {
            let mut v = (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos();
            match norm {
                Some(DctNorm::Ortho) => {
                    v *= (2.0 / n).sqrt();
                    if k == 0 {
                        v *= std::f64::consts::FRAC_1_SQRT_2;
                    }
                }
                None => v *= 2.0,
            }
            dct[k * n_mels + i] = v as f32;
        }
    }
    dct
}

/// Convert a power spectrogram to decibels in place, floored at `max - top_db`.
pub fn power_to_db(spec: &mut Spectrogram, top_db: Option<f32>) {
    for v in &mut spec.data {
        *v = 10.0 * v.max(AMIN).log10();
    }
    if let Some(top_db) = top_db {
        let floor = spec.max() - top_db;
        for v in &mut spec.data {
            *v = v.max(floor);
        }
    }
}

/// Mel-frequency cepstral coefficients.
///
/// # Example
/// ```
/// use ac_audio::mfcc::{Mfcc, MfccParams};
/// let mfcc = Mfcc::new(MfccParams::default(), 16000).unwrap();
/// let shape = mfcc.output_shape(16000);
/// assert_eq!((shape.bins, shape.frames), (40, 81));
/// ```
#[derive(Debug)]
pub struct Mfcc {
    n_mfcc: usize,
    log_mels: bool,
    mel: MelSpectrogram,
    dct: Vec<f32>,
}

impl Mfcc {
    /// Build the mel stage and DCT basis.
    ///
    /// # Errors
    /// Returns `AudioError::InvalidParams` for unsupported DCT types or
    /// `n_mfcc > n_mels`.
    pub fn new(params: MfccParams, sample_rate: u32) -> Result<Self, AudioError> {
        let invalid = |reason: String| AudioError::InvalidParams {
            transform: "mfcc",
            reason,
        };
        if params.dct_type != 2 {
            return Err(invalid(format!(
                "DCT type {} is not supported",
                params.dct_type
            )));
        }
        if params.n_mfcc == 0 {
            return Err(invalid("n_mfcc must be positive".into()));
        }
        let n_mels = params.melkwargs.n_mels;
        if params.n_mfcc > n_mels {
            return Err(invalid(format!(
                "n_mfcc ({}) cannot exceed n_mels ({n_mels})",
                params.n_mfcc
            )));
        }

        let mel = MelSpectrogram::new(params.melkwargs, sample_rate)?;
        let dct = dct_matrix(params.n_mfcc, n_mels, params.norm);
        Ok(Self {
            n_mfcc: params.n_mfcc,
            log_mels: params.log_mels,
            mel,
            dct,
        })
    }

    #[must_use]
    pub fn output_shape(&self, num_samples: usize) -> ac_core::FeatureShape {
        let frames = self.mel.output_shape(num_samples).frames;
        ac_core::FeatureShape::new(self.n_mfcc, frames)
    }

    /// Compute MFCCs, shape `n_mfcc × frames`.
    ///
    /// # Errors
    /// Propagates mel spectrogram failures.
    pub fn apply(&self, samples: &[f32]) -> Result<Spectrogram, AudioError> {
        let mut mel = self.mel.apply(samples)?;
        if self.log_mels {
            for v in &mut mel.data {
                *v = (*v + LOG_OFFSET).ln();
            }
        } else {
            power_to_db(&mut mel, Some(TOP_DB));
        }

        let n_mels = mel.bins;
        let frames = mel.frames;
        let mut out = Spectrogram::zeros(self.n_mfcc, frames);
        for k in 0..self.n_mfcc {
            let basis = &self.dct[k * n_mels..(k + 1) * n_mels];
            let row = &mut out.data[k * frames..(k + 1) * frames];
            for (m, &c) in basis.iter().enumerate() {
                for (acc, &v) in row.iter_mut().zip(mel.row(m)) {
                    *acc += c * v;
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
    fn ortho_dct_rows_are_orthonormal() {
        let n = 16;
        let dct = dct_matrix(n, n, Some(DctNorm::Ortho));
        for a in 0..n {
            for b in 0..n {
                let dot: f32 = (0..n).map(|i| dct[a * n + i] * dct[b * n + i]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "rows {a},{b}: {dot}");
            }
        }
    }

    #[test]
    fn db_conversion_floors_at_top_db() {
        let mut spec = Spectrogram::from_vec(vec![1.0, 1e-12, 100.0, 1e-3], 2, 2).unwrap();
        power_to_db(&mut spec, Some(80.0));
        assert!((spec.data[0] - 0.0).abs() < 1e-5);
        assert!((spec.data[2] - 20.0).abs() < 1e-4);
        // 1e-12 clamps to amin (-100 dB) then to max - 80 = -60 dB
        assert!((spec.data[1] + 60.0).abs() < 1e-4);
        assert!((spec.data[3] + 30.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_more_coefficients_than_mels() {
        let params = MfccParams {
            n_mfcc: 64,
            melkwargs: MelParams {
                n_mels: 32,
                ..MelParams::default()
            },
            ..MfccParams::default()
        };
        assert!(Mfcc::new(params, 16000).is_err());
    }

    #[test]
    fn rejects_other_dct_types() {
        let params = MfccParams {
            dct_type: 3,
            ..MfccParams::default()
        };
        assert!(matches!(
            Mfcc::new(params, 16000),
            Err(AudioError::InvalidParams { transform: "mfcc", .. })
        ));
    }

    #[test]
    fn tone_output_has_expected_shape() {
        let mfcc = Mfcc::new(
            MfccParams {
                n_mfcc: 13,
                melkwargs: MelParams {
                    n_fft: 512,
                    n_mels: 40,
                    ..MelParams::default()
                },
                ..MfccParams::default()
            },
            16000,
        )
        .unwrap();
        let samples: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let out = mfcc.apply(&samples).unwrap();
        assert_eq!(out.shape(), mfcc.output_shape(16000));
        assert_eq!(out.bins, 13);
        assert!(out.data.iter().all(|v| v.is_finite()));
    }
}
