use ac_core::config::TransformConfig;
use ac_core::frame::{FeatureShape, Spectrogram};
use serde::de::DeserializeOwned;

use crate::error::AudioError;
use crate::mel::{MelParams, MelSpectrogram};
use crate::mfcc::{Mfcc, MfccParams};

/// Transform names accepted in `runtime.transform.name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Mel,
    Mfcc,
}

impl TransformKind {
    /// Look up a transform by configuration name.
    ///
    /// # Errors
    /// Returns `AudioError::UnknownTransform` for any other name.
    pub fn from_name(name: &str) -> Result<Self, AudioError> {
        match name.trim() {
            "mel" => Ok(Self::Mel),
            "mfcc" => Ok(Self::Mfcc),
            other => Err(AudioError::UnknownTransform(other.to_string())),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Mel => "mel",
            Self::Mfcc => "mfcc",
        }
    }
}

/// The spectral transform of a run.
///
/// Built once from the configuration at the configured sample rate, then
/// shared read-only by every loader worker.
///
/// # Example
/// ```
/// use ac_audio::transform::SpectralTransform;
/// use ac_core::config::TransformConfig;
/// let config = TransformConfig { name: "mel".into(), params: serde_yaml::Value::Null };
/// let transform = SpectralTransform::from_config(&config, 16000).unwrap();
/// assert_eq!(transform.output_shape(64000).bins, 128);
/// ```
#[derive(Debug)]
pub enum SpectralTransform {
    Mel(MelSpectrogram),
    Mfcc(Mfcc),
}

fn parse_params<T: DeserializeOwned + Default>(
    transform: &'static str,
    params: &serde_yaml::Value,
) -> Result<T, AudioError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(params.clone()).map_err(|e| AudioError::InvalidParams {
        transform,
        reason: e.to_string(),
    })
}

impl SpectralTransform {
    /// Build the transform named in `config`.
    ///
    /// # Errors
    /// - `UnknownTransform` if the name is not `mel` or `mfcc`.
    /// - `InvalidParams` if the parameter mapping does not fit the transform.
    pub fn from_config(config: &TransformConfig, sample_rate: u32) -> Result<Self, AudioError> {
        let transform = match TransformKind::from_name(&config.name)? {
            TransformKind::Mel => {
                let params: MelParams = parse_params("mel", &config.params)?;
                Self::Mel(MelSpectrogram::new(params, sample_rate)?)
            }
            TransformKind::Mfcc => {
                let params: MfccParams = parse_params("mfcc", &config.params)?;
                Self::Mfcc(Mfcc::new(params, sample_rate)?)
            }
        };
        log::info!("Transform '{}' ready @ {sample_rate}Hz", transform.kind().name());
        Ok(transform)
    }

    #[must_use]
    pub fn kind(&self) -> TransformKind {
        match self {
            Self::Mel(_) => TransformKind::Mel,
            Self::Mfcc(_) => TransformKind::Mfcc,
        }
    }

    /// Feature shape for a waveform of `num_samples`, without computing it.
    #[must_use]
    pub fn output_shape(&self, num_samples: usize) -> FeatureShape {
        match self {
            Self::Mel(t) => t.output_shape(num_samples),
            Self::Mfcc(t) => t.output_shape(num_samples),
        }
    }

    /// Apply the transform to a normalized waveform.
    ///
    /// # Errors
    /// Propagates STFT failures.
    pub fn apply(&self, samples: &[f32]) -> Result<Spectrogram, AudioError> {
        match self {
            Self::Mel(t) => t.apply(samples),
            Self::Mfcc(t) => t.apply(samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, params: &str) -> TransformConfig {
        TransformConfig {
            name: name.into(),
            params: serde_yaml::from_str(params).unwrap(),
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = SpectralTransform::from_config(&config("cqt", "~"), 16000).unwrap_err();
        assert!(matches!(err, AudioError::UnknownTransform(ref n) if n == "cqt"));
        assert_eq!(err.to_string(), "Transform not found: cqt");
    }

    #[test]
    fn empty_mapping_uses_defaults() {
        let t = SpectralTransform::from_config(&config("mel", "{}"), 16000).unwrap();
        assert_eq!(t.kind(), TransformKind::Mel);
        assert_eq!(t.output_shape(64000), FeatureShape::new(128, 321));
    }

    #[test]
    fn params_are_forwarded() {
        let t = SpectralTransform::from_config(
            &config("mel", "{ n_fft: 1024, hop_length: 512, n_mels: 64 }"),
            22050,
        )
        .unwrap();
        assert_eq!(t.output_shape(22050), FeatureShape::new(64, 1 + 22050 / 512));

        let t = SpectralTransform::from_config(
            &config("mfcc", "{ n_mfcc: 20, melkwargs: { n_mels: 40 } }"),
            16000,
        )
        .unwrap();
        assert_eq!(t.output_shape(16000).bins, 20);
    }

    #[test]
    fn unknown_param_is_rejected() {
        let err =
            SpectralTransform::from_config(&config("mel", "{ n_melz: 64 }"), 16000).unwrap_err();
        assert!(matches!(err, AudioError::InvalidParams { transform: "mel", .. }));
    }

    #[test]
    fn shape_prediction_matches_output() {
        let t = SpectralTransform::from_config(&config("mfcc", "{ n_mfcc: 13 }"), 8000).unwrap();
        let samples = vec![0.1f32; 8000];
        assert_eq!(t.apply(&samples).unwrap().shape(), t.output_shape(8000));
    }
}
