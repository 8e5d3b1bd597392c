//! Checkpoint persistence with burn's named MessagePack recorder.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use crate::error::ModelError;
use crate::model::AudioCnn;

const EXTENSION: &str = "mpk";

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

fn checkpoint_error(path: &Path, reason: impl ToString) -> ModelError {
    ModelError::Checkpoint {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Write the model parameters to `path`.
///
/// The record is written next to the target under a `-partial` name and
/// renamed into place once complete. The recorder always uses the `.mpk`
/// extension; the final path is returned.
///
/// # Errors
/// Returns `ModelError::Checkpoint` if the directory, the record, or the
/// rename fails.
pub fn save_checkpoint<B: Backend>(model: &AudioCnn<B>, path: &Path) -> Result<PathBuf, ModelError> {
    let target = path.with_extension(EXTENSION);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| checkpoint_error(parent, e))?;
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| checkpoint_error(&target, "path has no file name"))?;
    let partial = target.with_file_name(format!("{stem}-partial.tmp"));

    model
        .clone()
        .save_file(partial.clone(), &recorder())
        .map_err(|e| checkpoint_error(&target, e))?;

    let written = partial.with_extension(EXTENSION);
    std::fs::rename(&written, &target).map_err(|e| checkpoint_error(&target, e))?;

    log::info!("Checkpoint saved to {}", target.display());
    Ok(target)
}

/// Restore parameters from `path` into `model`, which must have the same topology.
///
/// # Errors
/// Returns `ModelError::Checkpoint` if the file is missing or does not match.
pub fn load_checkpoint<B: Backend>(
    model: AudioCnn<B>,
    path: &Path,
    device: &B::Device,
) -> Result<AudioCnn<B>, ModelError> {
    let target = path.with_extension(EXTENSION);
    if !target.exists() {
        return Err(checkpoint_error(&target, "file not found"));
    }
    model
        .load_file(target.clone(), &recorder(), device)
        .map_err(|e| checkpoint_error(&target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioCnnConfig, init_model};
    use ac_core::FeatureShape;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type B = NdArray;

    fn input(device: &NdArrayDevice) -> Tensor<B, 4> {
        let values: Vec<f32> = (0..16 * 24).map(|i| ((i * 7) % 13) as f32 / 13.0).collect();
        Tensor::from_data(TensorData::new(values, [1, 1, 16, 24]), device)
    }

    #[test]
    fn save_then_load_reproduces_outputs() {
        let device = NdArrayDevice::Cpu;
        let dir = tempfile::tempdir().unwrap();
        let config = AudioCnnConfig::new(3, FeatureShape::new(16, 24));

        B::seed(&device, 1);
        let trained = init_model::<B>("custom", &config, &device).unwrap();
        let path = save_checkpoint(&trained, &dir.path().join("nested/audio.mpk")).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested/audio-partial.mpk").exists());

        B::seed(&device, 2);
        let fresh = init_model::<B>("custom", &config, &device).unwrap();
        let restored = load_checkpoint(fresh, &path, &device).unwrap();

        let expected = trained.forward(input(&device)).into_data().to_vec::<f32>().unwrap();
        let actual = restored.forward(input(&device)).into_data().to_vec::<f32>().unwrap();
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_checkpoint_is_an_error() {
        let device = NdArrayDevice::Cpu;
        let config = AudioCnnConfig::new(2, FeatureShape::new(8, 8));
        let model = init_model::<B>("custom", &config, &device).unwrap();
        let err = load_checkpoint(model, Path::new("/nonexistent/model.mpk"), &device).unwrap_err();
        assert!(matches!(err, ModelError::Checkpoint { .. }));
    }
}
