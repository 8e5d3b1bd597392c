use crate::error::CoreError;

/// Shape of every feature tensor produced during a run.
///
/// `bins` is the frequency axis (mel bands or MFCC coefficients),
/// `frames` the time axis (STFT frames).
///
/// # Example
/// ```
/// use ac_core::frame::FeatureShape;
/// let shape = FeatureShape::new(64, 321);
/// assert_eq!(shape.len(), 64 * 321);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeatureShape {
    /// Frequency bins.
    pub bins: usize,
    /// Time frames.
    pub frames: usize,
}

impl FeatureShape {
    #[must_use]
    pub fn new(bins: usize, frames: usize) -> Self {
        Self { bins, frames }
    }

    /// Number of values in one feature tensor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins * self.frames
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for FeatureShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.bins, self.frames)
    }
}

/// Time-frequency feature matrix, row-major `bins × frames`.
///
/// Row `b` holds the values of bin `b` for every frame, so
/// `data[b * frames + t]` is bin `b` at frame `t`.
///
/// # Example
/// ```
/// use ac_core::frame::Spectrogram;
/// let spec = Spectrogram::zeros(4, 10);
/// assert_eq!(spec.data.len(), 40);
/// assert_eq!(spec.get(3, 9), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrogram {
    /// Values, row-major.
    pub data: Vec<f32>,
    /// Frequency bins (rows).
    pub bins: usize,
    /// Time frames (columns).
    pub frames: usize,
}

impl Spectrogram {
    /// Zero-filled matrix.
    #[must_use]
    pub fn zeros(bins: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; bins * frames],
            bins,
            frames,
        }
    }

    /// Wraps an existing buffer.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidDimensions` if `data.len() != bins * frames`.
    pub fn from_vec(data: Vec<f32>, bins: usize, frames: usize) -> Result<Self, CoreError> {
        if data.len() != bins * frames {
            return Err(CoreError::InvalidDimensions {
                bins,
                frames,
                len: data.len(),
            });
        }
        Ok(Self { data, bins, frames })
    }

    #[must_use]
    pub fn shape(&self) -> FeatureShape {
        FeatureShape::new(self.bins, self.frames)
    }

    /// Valeur du bin `bin` à la frame `frame`.
    #[inline]
    #[must_use]
    pub fn get(&self, bin: usize, frame: usize) -> f32 {
        debug_assert!(bin < self.bins && frame < self.frames, "spectrogram index out of bounds");
        self.data[bin * self.frames + frame]
    }

    /// One bin across all frames.
    #[must_use]
    pub fn row(&self, bin: usize) -> &[f32] {
        &self.data[bin * self.frames..(bin + 1) * self.frames]
    }

    /// Largest value, or `f32::MIN` when empty.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::MIN, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Spectrogram::from_vec(vec![0.0; 5], 2, 3).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDimensions { len: 5, .. }));
    }

    #[test]
    fn row_major_indexing() {
        let spec = Spectrogram::from_vec((0..6).map(|v| v as f32).collect(), 2, 3).unwrap();
        assert_eq!(spec.get(1, 0), 3.0);
        assert_eq!(spec.row(0), &[0.0, 1.0, 2.0]);
        assert_eq!(spec.shape(), FeatureShape::new(2, 3));
        assert_eq!(spec.max(), 5.0);
    }
}
