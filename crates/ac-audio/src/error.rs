use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// `runtime.transform.name` names no known transform.
    #[error("Transform not found: {0}")]
    UnknownTransform(String),

    /// Transform parameters are malformed or inconsistent.
    #[error("Invalid {transform} parameters: {reason}")]
    InvalidParams {
        /// Transform name.
        transform: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// Waveform is longer than the fixed target length.
    #[error("Waveform has {samples} samples, longer than the target of {target}")]
    TooLong {
        /// Samples after resampling.
        samples: usize,
        /// Target sample count.
        target: usize,
    },

    /// Native sample rate differs and resampling is disabled.
    #[error("Sample rate {found} Hz differs from configured {expected} Hz")]
    SampleRateMismatch {
        /// Rate found in the file.
        found: u32,
        /// Configured rate.
        expected: u32,
    },

    /// Input too short for the requested padding mode.
    #[error("Waveform of {samples} samples is too short for reflect padding of {pad}")]
    TooShort {
        /// Samples available.
        samples: usize,
        /// Padding requested on each side.
        pad: usize,
    },

    /// Feature matrix shape differs from the run's fixed shape.
    #[error("Feature shape {found} differs from expected {expected}")]
    ShapeMismatch {
        /// Shape produced.
        found: String,
        /// Shape every sample must have.
        expected: String,
    },

    /// Resampler construction or processing failed.
    #[error("Resample error: {0}")]
    Resample(String),

    /// FFT processing failed.
    #[error("FFT error: {0}")]
    Fft(String),
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}
