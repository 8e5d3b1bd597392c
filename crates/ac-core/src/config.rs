use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::device::DeviceRequest;
use crate::error::CoreError;

/// Configuration complète d'un entraînement.
///
/// Deserialized from YAML. Required keys are checked when the file is parsed,
/// semantic checks run in [`Config::validate`].
///
/// # Example
/// ```
/// use ac_core::config::parse_config;
/// let yaml = r#"
/// runtime:
///   device: cpu
///   epochs: 2
///   learning_rate: 0.001
///   transform: { name: mel }
///   model: { name: custom }
/// dataset:
///   folder_path: data
///   annotations: { train_csv: train.csv, test_csv: test.csv, input: path, target: label }
///   normalize: { sample_rate: 16000, duration: 4 }
/// "#;
/// let config = parse_config(yaml).unwrap();
/// assert_eq!(config.dataset.normalize.target_len(), 64000);
/// assert_eq!(config.runtime.loader.batch_size, 1);
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Training run settings.
    pub runtime: RuntimeConfig,
    /// Data sources and waveform normalization.
    pub dataset: DatasetConfig,
}

/// `runtime` section.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    /// "auto" | "cpu" | "gpu" | "wgpu" | "cuda".
    pub device: String,
    /// Seed for weight initialization and shuffling. None = non reproductible.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of passes over the training set.
    pub epochs: usize,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Run an evaluation pass on the test split after each epoch.
    #[serde(default)]
    pub evaluate: bool,
    /// Where the final checkpoint is written.
    #[serde(default = "default_checkpoint")]
    pub checkpoint: PathBuf,
    /// Batch loader options.
    #[serde(default)]
    pub loader: LoaderOptions,
    /// Spectral transform selection.
    pub transform: TransformConfig,
    /// Model selection.
    pub model: ModelSection,
}

/// Batching options, `runtime.loader`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderOptions {
    /// Samples per batch.
    pub batch_size: usize,
    /// Reshuffle the sample order every epoch.
    pub shuffle: bool,
    /// Threads fetching samples in parallel. 0 = caller's thread.
    pub num_workers: usize,
    /// Drop the trailing batch when it is smaller than `batch_size`.
    pub drop_last: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            shuffle: false,
            num_workers: 0,
            drop_last: false,
        }
    }
}

/// `runtime.transform` section.
///
/// `params` stays an untyped mapping: its schema depends on `name` and is
/// interpreted by the audio crate.
#[derive(Clone, Debug, Deserialize)]
pub struct TransformConfig {
    /// "mel" | "mfcc".
    pub name: String,
    /// Transform parameters, may be absent or null.
    #[serde(default)]
    pub params: serde_yaml::Value,
}

/// `runtime.model` section.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelSection {
    /// Registered model name ("custom").
    pub name: String,
}

/// `dataset` section.
#[derive(Clone, Debug, Deserialize)]
pub struct DatasetConfig {
    /// Root folder the manifest paths are relative to.
    pub folder_path: PathBuf,
    /// Manifest locations and columns.
    pub annotations: AnnotationsConfig,
    /// Waveform normalization.
    pub normalize: NormalizeConfig,
}

/// `dataset.annotations` section.
#[derive(Clone, Debug, Deserialize)]
pub struct AnnotationsConfig {
    /// Training manifest (CSV).
    pub train_csv: PathBuf,
    /// Test manifest (CSV).
    pub test_csv: PathBuf,
    /// Column holding the audio path.
    pub input: String,
    /// Column holding the class label.
    pub target: String,
}

/// `dataset.normalize` section.
#[derive(Clone, Debug, Deserialize)]
pub struct NormalizeConfig {
    /// Sample rate every waveform is brought to, in Hz.
    pub sample_rate: u32,
    /// Fixed clip duration in seconds.
    pub duration: f64,
    /// Trim waveforms longer than the target instead of failing.
    #[serde(default)]
    pub truncate: bool,
    /// Resample files whose native rate differs from `sample_rate`.
    #[serde(default = "default_true")]
    pub resample: bool,
}

impl NormalizeConfig {
    /// Target sample count: `sample_rate × duration`, rounded.
    ///
    /// # Example
    /// ```
    /// use ac_core::config::NormalizeConfig;
    /// let n = NormalizeConfig { sample_rate: 22050, duration: 0.5, truncate: false, resample: true };
    /// assert_eq!(n.target_len(), 11025);
    /// ```
    #[must_use]
    pub fn target_len(&self) -> usize {
        (f64::from(self.sample_rate) * self.duration).round() as usize
    }
}

fn default_true() -> bool {
    true
}

fn default_checkpoint() -> PathBuf {
    PathBuf::from("model/audio.mpk")
}

impl Config {
    /// Semantic checks that serde cannot express.
    ///
    /// # Errors
    /// Returns `CoreError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<(), CoreError> {
        let rt = &self.runtime;
        rt.device.parse::<DeviceRequest>()?;

        if rt.epochs == 0 {
            return Err(invalid("runtime.epochs must be at least 1"));
        }
        if !(rt.learning_rate.is_finite() && rt.learning_rate > 0.0) {
            return Err(invalid(format!(
                "runtime.learning_rate must be a positive number, got {}",
                rt.learning_rate
            )));
        }
        if rt.loader.batch_size == 0 {
            return Err(invalid("runtime.loader.batch_size must be at least 1"));
        }
        if rt.transform.name.trim().is_empty() {
            return Err(invalid("runtime.transform.name is empty"));
        }
        if rt.model.name.trim().is_empty() {
            return Err(invalid("runtime.model.name is empty"));
        }

        let ann = &self.dataset.annotations;
        if ann.input.is_empty() || ann.target.is_empty() {
            return Err(invalid("dataset.annotations.input/target must name columns"));
        }
        if ann.input == ann.target {
            return Err(invalid(format!(
                "dataset.annotations.input and target are the same column '{}'",
                ann.input
            )));
        }

        let norm = &self.dataset.normalize;
        if norm.sample_rate == 0 {
            return Err(invalid("dataset.normalize.sample_rate must be positive"));
        }
        if !(norm.duration.is_finite() && norm.duration > 0.0) {
            return Err(invalid(format!(
                "dataset.normalize.duration must be positive, got {}",
                norm.duration
            )));
        }
        if norm.target_len() == 0 {
            return Err(invalid("dataset.normalize: sample_rate × duration rounds to 0 samples"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Config(msg.into())
}

/// Parse and validate a YAML document.
///
/// # Errors
/// Returns an error if the YAML is malformed, a required key is missing,
/// or validation fails.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content).context("YAML parsing error")?;
    config.validate()?;
    Ok(config)
}

/// Charge un fichier YAML de configuration et le valide.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
///
/// # Example
/// ```no_run
/// use ac_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config.yml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let config =
        parse_config(&content).with_context(|| format!("In configuration {}", path.display()))?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
runtime:
  device: auto
  epochs: 3
  learning_rate: 0.001
  loader:
    batch_size: 8
    shuffle: true
  transform:
    name: mfcc
    params:
      n_mfcc: 13
  model:
    name: custom
dataset:
  folder_path: audio
  annotations:
    train_csv: train.csv
    test_csv: test.csv
    input: file
    target: class
  normalize:
    sample_rate: 16000
    duration: 4
";

    #[test]
    fn parses_minimal_document() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.runtime.epochs, 3);
        assert_eq!(config.runtime.loader.batch_size, 8);
        assert!(config.runtime.loader.shuffle);
        assert_eq!(config.runtime.loader.num_workers, 0);
        assert_eq!(config.runtime.checkpoint, PathBuf::from("model/audio.mpk"));
        assert!(config.runtime.seed.is_none());
        assert!(!config.runtime.evaluate);
        assert!(config.dataset.normalize.resample);
        assert!(!config.dataset.normalize.truncate);
        assert_eq!(config.dataset.normalize.target_len(), 64000);
        assert!(config.runtime.transform.params.is_mapping());
    }

    #[test]
    fn missing_key_fails_at_load() {
        let broken = MINIMAL.replace("  epochs: 3\n", "");
        let err = parse_config(&broken).unwrap_err();
        assert!(format!("{err:#}").contains("epochs"), "{err:#}");
    }

    #[test]
    fn unknown_loader_option_is_rejected() {
        let broken = MINIMAL.replace("shuffle: true", "shuffle: true\n    prefetch: 2");
        let err = parse_config(&broken).unwrap_err();
        assert!(format!("{err:#}").contains("prefetch"), "{err:#}");
    }

    #[test]
    fn null_transform_params_allowed() {
        let doc = MINIMAL.replace("    params:\n      n_mfcc: 13\n", "    params:\n");
        let config = parse_config(&doc).unwrap();
        assert!(config.runtime.transform.params.is_null());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_lr = MINIMAL.replace("learning_rate: 0.001", "learning_rate: 0.0");
        assert!(parse_config(&zero_lr).is_err());

        let zero_batch = MINIMAL.replace("batch_size: 8", "batch_size: 0");
        assert!(parse_config(&zero_batch).is_err());

        let bad_device = MINIMAL.replace("device: auto", "device: tpu");
        let err = parse_config(&bad_device).unwrap_err();
        assert!(format!("{err:#}").contains("tpu"));

        let same_col = MINIMAL.replace("target: class", "target: file");
        assert!(parse_config(&same_col).is_err());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("definitely/not/here.yml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::FileNotFound { .. })
        ));
    }
}
