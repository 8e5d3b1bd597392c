use std::fmt;

use ac_model::AudioCnn;
use anyhow::{Result, anyhow, bail};
use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;

use crate::dataset::SampleSource;
use crate::loader::{BatchLoader, FeatureBatch};

/// Test-split metrics of one epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalReport {
    pub loss: f32,
    /// Fraction of correctly classified samples, in `[0, 1]`.
    pub accuracy: f32,
}

/// Losses of one epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    /// Zero-based.
    pub epoch: usize,
    /// Loss of the final batch.
    pub last_loss: f32,
    /// Mean over all batches of the epoch.
    pub mean_loss: f32,
    pub eval: Option<EvalReport>,
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch: {} | Loss: {} | Mean: {}",
            self.epoch, self.last_loss, self.mean_loss
        )?;
        if let Some(eval) = self.eval {
            write!(f, " | Test loss: {} | Accuracy: {}", eval.loss, eval.accuracy)?;
        }
        Ok(())
    }
}

/// Move a CPU batch onto `device` as `[len, 1, bins, frames]` features and integer targets.
fn batch_tensors<B: Backend>(
    batch: FeatureBatch,
    device: &B::Device,
) -> (Tensor<B, 4>, Tensor<B, 1, Int>) {
    let dims = [batch.len, 1, batch.shape.bins, batch.shape.frames];
    let inputs = Tensor::from_data(TensorData::new(batch.features, dims), device);
    let targets = Tensor::from_data(TensorData::new(batch.labels, [batch.len]), device);
    (inputs, targets)
}

/// Adam + cross-entropy training loop.
pub struct Trainer<B: AutodiffBackend> {
    model: AudioCnn<B>,
    optimizer: OptimizerAdaptor<Adam, AudioCnn<B>, B>,
    loss: CrossEntropyLoss<B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(model: AudioCnn<B>, learning_rate: f64, device: B::Device) -> Self {
        let optimizer = AdamConfig::new().init::<B, AudioCnn<B>>();
        let loss = CrossEntropyLossConfig::new().init(&device);
        Self {
            model,
            optimizer,
            loss,
            learning_rate,
            device,
        }
    }

    /// One optimization step; returns the batch loss.
    fn step(&mut self, batch: FeatureBatch) -> f32 {
        let (inputs, targets) = batch_tensors::<B>(batch, &self.device);
        let logits = self.model.forward_logits(inputs);
        let loss = self.loss.forward(logits, targets);
        let value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);
        value
    }

    /// One pass over the training loader.
    ///
    /// # Errors
    /// Propagates the first sample failure; fails if the loader yields no batch.
    pub fn train_epoch<S: SampleSource>(
        &mut self,
        loader: &BatchLoader<S>,
        epoch: usize,
    ) -> Result<EpochReport> {
        let mut last_loss = f32::NAN;
        let mut total = 0.0f64;
        let mut count = 0usize;
        for (i, batch) in loader.epoch(epoch).enumerate() {
            let batch = batch?;
            last_loss = self.step(batch);
            total += f64::from(last_loss);
            count += 1;
            log::debug!("Epoch {epoch} batch {i}: loss {last_loss}");
        }
        if count == 0 {
            bail!("Training loader yielded no batch in epoch {epoch}");
        }
        Ok(EpochReport {
            epoch,
            last_loss,
            mean_loss: (total / count as f64) as f32,
            eval: None,
        })
    }

    /// Mean loss and accuracy of the current model, without gradients.
    ///
    /// # Errors
    /// Propagates sample failures.
    pub fn evaluate<S: SampleSource>(&self, loader: &BatchLoader<S>) -> Result<EvalReport> {
        let model = self.model.valid();
        let loss_fn = CrossEntropyLossConfig::new().init(&self.device);

        let mut total_loss = 0.0f64;
        let mut batches = 0usize;
        let mut correct = 0usize;
        let mut seen = 0usize;
        for batch in loader.epoch(0) {
            let batch = batch?;
            let len = batch.len;
            let labels = batch.labels.clone();
            let (inputs, targets) = batch_tensors::<B::InnerBackend>(batch, &self.device);

            let logits = model.forward_logits(inputs);
            let loss = loss_fn.forward(logits.clone(), targets);
            total_loss += f64::from(loss.into_scalar().elem::<f32>());
            batches += 1;

            let predicted = logits
                .argmax(1)
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;
            correct += predicted.iter().zip(&labels).filter(|(p, l)| p == l).count();
            seen += len;
        }
        if batches == 0 {
            bail!("Evaluation loader yielded no batch");
        }
        Ok(EvalReport {
            loss: (total_loss / batches as f64) as f32,
            accuracy: correct as f32 / seen as f32,
        })
    }

    /// Train for `epochs` epochs, reporting each one to `on_epoch`.
    ///
    /// When `eval_loader` is given the test split is evaluated after every epoch.
    ///
    /// # Errors
    /// Fails fast on the first sample or evaluation error.
    pub fn train_all_epochs<S: SampleSource>(
        mut self,
        loader: &BatchLoader<S>,
        epochs: usize,
        eval_loader: Option<&BatchLoader<S>>,
        mut on_epoch: impl FnMut(&EpochReport),
    ) -> Result<(AudioCnn<B>, Vec<EpochReport>)> {
        let mut reports = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let mut report = self.train_epoch(loader, epoch)?;
            if let Some(eval_loader) = eval_loader {
                report.eval = Some(self.evaluate(eval_loader)?);
            }
            log::info!("{report}");
            on_epoch(&report);
            reports.push(report);
        }
        Ok((self.model, reports))
    }
}
