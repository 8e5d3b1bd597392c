use ac_core::FeatureShape;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::error::ModelError;

const CHANNELS: [usize; 5] = [1, 16, 32, 64, 128];
const KERNEL: usize = 3;
const PADDING: usize = 2;
const POOL: usize = 2;

/// Architectures selectable through `runtime.model.name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Four conv blocks, then a linear classifier.
    Custom,
}

impl ModelKind {
    /// # Errors
    /// Returns `ModelError::NotFound` for any name other than `custom`.
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        match name.trim() {
            "custom" => Ok(Self::Custom),
            other => Err(ModelError::NotFound(other.to_string())),
        }
    }
}

/// Conv2d → ReLU → MaxPool2d.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    activation: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [KERNEL, KERNEL])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(PADDING, PADDING))
            .init(device);
        let pool = MaxPool2dConfig::new([POOL, POOL])
            .with_strides([POOL, POOL])
            .init();
        Self {
            conv,
            activation: Relu::new(),
            pool,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.activation.forward(self.conv.forward(x)))
    }
}

/// Shape of the network for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioCnnConfig {
    pub num_classes: usize,
    /// `bins × frames` of every feature tensor.
    pub input: FeatureShape,
}

/// Spatial size after one conv block: the padded conv grows by 2, the pool halves.
fn block_output(size: usize) -> usize {
    (size + 2 * PADDING + 1 - KERNEL) / POOL
}

impl AudioCnnConfig {
    #[must_use]
    pub fn new(num_classes: usize, input: FeatureShape) -> Self {
        Self { num_classes, input }
    }

    /// Height and width of the last block's output.
    #[must_use]
    pub fn final_map(&self) -> (usize, usize) {
        let mut h = self.input.bins;
        let mut w = self.input.frames;
        for _ in 1..CHANNELS.len() {
            h = block_output(h);
            w = block_output(w);
        }
        (h, w)
    }

    /// Input width of the linear classifier.
    ///
    /// # Example
    /// ```
    /// use ac_core::FeatureShape;
    /// use ac_model::AudioCnnConfig;
    /// // 128 mels × 321 frames: 128→65→33→17→9, 321→161→81→41→21
    /// let config = AudioCnnConfig::new(10, FeatureShape::new(128, 321));
    /// assert_eq!(config.flattened_width(), 128 * 9 * 21);
    /// ```
    #[must_use]
    pub fn flattened_width(&self) -> usize {
        let (h, w) = self.final_map();
        CHANNELS[CHANNELS.len() - 1] * h * w
    }

    /// # Errors
    /// Returns `ModelError::InvalidConfig` for zero classes or an empty feature map.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_classes == 0 {
            return Err(ModelError::InvalidConfig("num_classes must be positive".into()));
        }
        if self.input.is_empty() || self.flattened_width() == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "feature shape {} is too small for four conv blocks",
                self.input
            )));
        }
        Ok(())
    }

    /// Build the network on `device` with freshly initialized weights.
    ///
    /// # Errors
    /// See [`AudioCnnConfig::validate`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<AudioCnn<B>, ModelError> {
        self.validate()?;
        let blocks = CHANNELS
            .windows(2)
            .map(|pair| ConvBlock::new(pair[0], pair[1], device))
            .collect();
        let linear = LinearConfig::new(self.flattened_width(), self.num_classes).init(device);
        Ok(AudioCnn { blocks, linear })
    }
}

/// CNN classifier over `[batch, 1, bins, frames]` feature tensors.
#[derive(Module, Debug)]
pub struct AudioCnn<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    linear: Linear<B>,
}

impl<B: Backend> AudioCnn<B> {
    /// Pre-softmax class scores, `[batch, num_classes]`.
    pub fn forward_logits(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = input;
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.linear.forward(x.flatten::<2>(1, 3))
    }

    /// Class probabilities, `[batch, num_classes]`, each row summing to 1.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward_logits(input), 1)
    }
}

/// Build the architecture named `name`.
///
/// # Errors
/// - `ModelError::NotFound` if the name is unknown.
/// - `ModelError::InvalidConfig` if the shape cannot feed the network.
pub fn init_model<B: Backend>(
    name: &str,
    config: &AudioCnnConfig,
    device: &B::Device,
) -> Result<AudioCnn<B>, ModelError> {
    match ModelKind::from_name(name)? {
        ModelKind::Custom => {
            let model = config.init(device)?;
            log::info!(
                "Model 'custom': {} classes, input {}, flattened width {}",
                config.num_classes,
                config.input,
                config.flattened_width()
            );
            Ok(model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type B = NdArray;

    #[test]
    fn unknown_model_is_rejected() {
        let config = AudioCnnConfig::new(3, FeatureShape::new(40, 40));
        let err = init_model::<B>("unsupported", &config, &NdArrayDevice::Cpu).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(ref n) if n == "unsupported"));
        assert_eq!(err.to_string(), "Model not found: unsupported");
    }

    #[test]
    fn block_output_follows_pad_and_pool() {
        assert_eq!(block_output(128), 65);
        assert_eq!(block_output(1), 1);
        assert_eq!(block_output(0), 1);
        let config = AudioCnnConfig::new(2, FeatureShape::new(1, 1));
        assert_eq!(config.final_map(), (1, 1));
        assert_eq!(config.flattened_width(), 128);
    }

    #[test]
    fn zero_classes_is_invalid() {
        let config = AudioCnnConfig::new(0, FeatureShape::new(40, 40));
        assert!(config.validate().is_err());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let device = NdArrayDevice::Cpu;
        let config = AudioCnnConfig::new(4, FeatureShape::new(20, 30));
        let model = init_model::<B>("custom", &config, &device).unwrap();

        let values: Vec<f32> = (0..2 * 20 * 30).map(|i| (i % 17) as f32 / 17.0).collect();
        let input = Tensor::<B, 4>::from_data(TensorData::new(values, [2, 1, 20, 30]), &device);

        let probs = model.forward(input);
        assert_eq!(probs.dims(), [2, 4]);
        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "row sum {s}");
        }
    }
}
