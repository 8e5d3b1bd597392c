use std::path::PathBuf;
use std::sync::Arc;

use ac_audio::{Normalizer, SpectralTransform};
use ac_core::annotations::{count_classes, read_annotations};
use ac_core::config::{Config, LoaderOptions};
use ac_core::{ComputeDevice, CoreError, LabelIndex, Manifest};
use ac_model::device::{CpuBackend, GpuBackend, cpu_device, gpu_device};
use ac_model::{AudioCnnConfig, init_model, save_checkpoint};
use ac_train::{AudioDataset, BatchLoader, EpochReport, Trainer};
use anyhow::{Context, Result, bail};
use burn::tensor::backend::AutodiffBackend;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub checkpoint: PathBuf,
    pub num_classes: usize,
    pub reports: Vec<EpochReport>,
}

/// Train on the backend matching `device`.
///
/// # Errors
/// See [`run`].
pub fn run_on_device(config: &Config, device: ComputeDevice) -> Result<RunOutcome> {
    match device {
        ComputeDevice::Cpu => run::<CpuBackend>(config, cpu_device()),
        ComputeDevice::Gpu => run::<GpuBackend>(config, gpu_device()),
    }
}

/// Full training run: manifests, transform, model, loaders, epochs, checkpoint.
///
/// Everything that depends only on the configuration (transform, model) is
/// built before the first audio file is opened.
///
/// # Errors
/// Fails fast on the first configuration, manifest, sample, or checkpoint error.
pub fn run<B: AutodiffBackend>(config: &Config, device: B::Device) -> Result<RunOutcome> {
    let runtime = &config.runtime;
    let dataset = &config.dataset;

    let annotations = read_annotations(&dataset.annotations)?;
    if annotations.train.is_empty() {
        return Err(CoreError::EmptyManifest {
            path: annotations.train.source.display().to_string(),
        }
        .into());
    }
    let num_classes = count_classes(&annotations);
    let labels = Arc::new(LabelIndex::from_annotations(&annotations));
    log::info!(
        "{num_classes} classes over {} train / {} test rows",
        annotations.train.len(),
        annotations.test.len()
    );
    log::debug!("Class order: {:?}", labels.labels());

    let normalizer = Normalizer::from_config(&dataset.normalize);
    let transform = Arc::new(
        SpectralTransform::from_config(&runtime.transform, normalizer.sample_rate())
            .context("Building runtime.transform")?,
    );
    let shape = transform.output_shape(normalizer.target_len());
    log::info!("Feature shape {shape} from {} samples", normalizer.target_len());

    if let Some(seed) = runtime.seed {
        B::seed(&device, seed);
    }
    let model = init_model::<B>(
        &runtime.model.name,
        &AudioCnnConfig::new(num_classes, shape),
        &device,
    )?;

    let make_dataset = |manifest: Manifest| {
        AudioDataset::new(
            dataset.folder_path.clone(),
            manifest,
            Arc::clone(&labels),
            normalizer.clone(),
            Arc::clone(&transform),
        )
    };

    let train_loader = BatchLoader::new(
        make_dataset(annotations.train),
        runtime.loader.clone(),
        runtime.seed,
    )?;
    if train_loader.num_batches() == 0 {
        bail!(
            "Training set yields no batch (batch_size {} with drop_last)",
            runtime.loader.batch_size
        );
    }

    let eval_loader = if runtime.evaluate {
        if annotations.test.is_empty() {
            return Err(CoreError::EmptyManifest {
                path: annotations.test.source.display().to_string(),
            }
            .into());
        }
        let options = LoaderOptions {
            shuffle: false,
            drop_last: false,
            ..runtime.loader.clone()
        };
        Some(BatchLoader::new(make_dataset(annotations.test), options, runtime.seed)?)
    } else {
        None
    };

    let trainer = Trainer::new(model, runtime.learning_rate, device);
    let (model, reports) = trainer.train_all_epochs(
        &train_loader,
        runtime.epochs,
        eval_loader.as_ref(),
        |report| println!("{report}"),
    )?;
    println!("Finished training");

    let checkpoint = save_checkpoint(&model, &runtime.checkpoint)?;
    Ok(RunOutcome {
        checkpoint,
        num_classes,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::path::Path;

    use super::*;
    use ac_core::config::parse_config;
    use ac_model::ModelError;

    fn write_tone(path: &Path, freq: f32, len: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..len {
            let v = (2.0 * std::f32::consts::PI * freq * i as f32 / 8000.0).sin();
            writer.write_sample((v * 10000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Four clips per split, two low tones labelled 0 and two high tones labelled 1.
    fn fixture(root: &Path, model: &str, evaluate: bool) -> Config {
        let audio = root.join("audio");
        std::fs::create_dir_all(&audio).unwrap();
        for split in ["train", "test"] {
            let mut csv = String::from("file,class\n");
            for (i, (freq, label)) in [(200.0, 0), (250.0, 0), (1500.0, 1), (1800.0, 1)]
                .into_iter()
                .enumerate()
            {
                let name = format!("{split}_{i}.wav");
                write_tone(&audio.join(&name), freq, 6000);
                writeln!(csv, "{name},{label}").unwrap();
            }
            std::fs::write(root.join(format!("{split}.csv")), csv).unwrap();
        }

        let yaml = format!(
            r"
runtime:
  device: cpu
  seed: 5
  epochs: 2
  learning_rate: 0.001
  evaluate: {evaluate}
  checkpoint: {checkpoint}
  loader: {{ batch_size: 2, shuffle: true, num_workers: 2 }}
  transform:
    name: mel
    params: {{ n_fft: 256, n_mels: 32 }}
  model: {{ name: {model} }}
dataset:
  folder_path: {audio}
  annotations:
    train_csv: {train}
    test_csv: {test}
    input: file
    target: class
  normalize: {{ sample_rate: 8000, duration: 1 }}
",
            checkpoint = root.join("model/audio.mpk").display(),
            audio = audio.display(),
            train = root.join("train.csv").display(),
            test = root.join("test.csv").display(),
        );
        parse_config(&yaml).unwrap()
    }

    #[test]
    fn trains_and_writes_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path(), "custom", true);
        let outcome = run_on_device(&config, ComputeDevice::Cpu).unwrap();

        assert_eq!(outcome.num_classes, 2);
        assert_eq!(outcome.reports.len(), 2);
        assert!(outcome.reports.iter().all(|r| r.eval.is_some()));
        assert_eq!(outcome.checkpoint, dir.path().join("model/audio.mpk"));
        assert!(outcome.checkpoint.exists());
    }

    #[test]
    fn unknown_model_fails_before_any_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture(dir.path(), "unsupported", false);
        // Point at a folder with no audio: loading a batch would fail differently.
        config.dataset.folder_path = dir.path().join("missing");
        let err = run_on_device(&config, ComputeDevice::Cpu).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::NotFound(name)) if name == "unsupported"
        ));
        assert!(!dir.path().join("model/audio.mpk").exists());
    }

    #[test]
    fn unknown_transform_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture(dir.path(), "custom", false);
        config.runtime.transform.name = "cqt".into();
        let err = run_on_device(&config, ComputeDevice::Cpu).unwrap_err();
        assert!(format!("{err:#}").contains("Transform not found: cqt"));
    }

    #[test]
    fn empty_training_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path(), "custom", false);
        std::fs::write(dir.path().join("train.csv"), "file,class\n").unwrap();
        let err = run_on_device(&config, ComputeDevice::Cpu).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::EmptyManifest { .. })
        ));
    }
}
