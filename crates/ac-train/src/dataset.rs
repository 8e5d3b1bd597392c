use std::path::PathBuf;
use std::sync::Arc;

use ac_audio::decode::decode_file;
use ac_audio::{AudioError, Normalizer, SpectralTransform};
use ac_core::{FeatureShape, LabelIndex, Manifest, Spectrogram};
use anyhow::{Context, Result};

/// One training example: a feature matrix and its class index.
#[derive(Clone, Debug)]
pub struct Sample {
    pub features: Spectrogram,
    pub label: usize,
}

/// Indexed access to samples of a fixed feature shape.
///
/// Implémenté par : `AudioDataset`.
///
/// # Example
/// ```
/// use ac_core::{FeatureShape, Spectrogram};
/// use ac_train::dataset::{Sample, SampleSource};
///
/// struct Constant;
/// impl SampleSource for Constant {
///     fn len(&self) -> usize { 4 }
///     fn shape(&self) -> FeatureShape { FeatureShape::new(2, 3) }
///     fn get(&self, index: usize) -> anyhow::Result<Sample> {
///         Ok(Sample { features: Spectrogram::zeros(2, 3), label: index % 2 })
///     }
/// }
/// assert_eq!(Constant.get(3).unwrap().label, 1);
/// ```
pub trait SampleSource: Send + Sync {
    /// Number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape every sample has.
    fn shape(&self) -> FeatureShape;

    /// Build sample `index`. Never cached: each call redoes the work.
    ///
    /// # Errors
    /// Returns an error naming the row if the sample cannot be produced.
    fn get(&self, index: usize) -> Result<Sample>;
}

/// Manifest rows turned into feature matrices on demand.
///
/// Each `get` decodes the file, normalizes the waveform, applies the shared
/// transform and maps the label to its class index.
#[derive(Clone, Debug)]
pub struct AudioDataset {
    root: PathBuf,
    manifest: Manifest,
    labels: Arc<LabelIndex>,
    normalizer: Normalizer,
    transform: Arc<SpectralTransform>,
    shape: FeatureShape,
}

impl AudioDataset {
    pub fn new(
        root: impl Into<PathBuf>,
        manifest: Manifest,
        labels: Arc<LabelIndex>,
        normalizer: Normalizer,
        transform: Arc<SpectralTransform>,
    ) -> Self {
        let shape = transform.output_shape(normalizer.target_len());
        Self {
            root: root.into(),
            manifest,
            labels,
            normalizer,
            transform,
            shape,
        }
    }
}

impl SampleSource for AudioDataset {
    fn len(&self) -> usize {
        self.manifest.len()
    }

    fn shape(&self) -> FeatureShape {
        self.shape
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let row = self.manifest.rows.get(index).with_context(|| {
            format!(
                "Row {index} out of range for {} ({} rows)",
                self.manifest.source.display(),
                self.manifest.len()
            )
        })?;
        let path = self.root.join(&row.path);
        let context = || {
            format!(
                "Sample {index} of {} ({})",
                self.manifest.source.display(),
                path.display()
            )
        };

        let waveform = decode_file(&path).with_context(context)?;
        let samples = self
            .normalizer
            .apply(waveform.samples, waveform.sample_rate)
            .with_context(context)?;
        let features = self.transform.apply(&samples).with_context(context)?;

        if features.shape() != self.shape {
            return Err(AudioError::ShapeMismatch {
                found: features.shape().to_string(),
                expected: self.shape.to_string(),
            })
            .with_context(context);
        }

        let label = self
            .labels
            .index_of(&row.label)
            .with_context(|| format!("Label '{}' is not in the label index", row.label))
            .with_context(context)?;

        log::debug!("Sample {index}: {} -> class {label}", path.display());
        Ok(Sample { features, label })
    }
}
