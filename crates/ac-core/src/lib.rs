/// Configuration, manifests, and shared types for audiocnn.
///
/// This crate contains the configuration loader, the annotation reader,
/// device request parsing, and the feature types used across the workspace.

pub mod annotations;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;

pub use annotations::{Annotations, LabelIndex, Manifest};
pub use config::Config;
pub use device::{ComputeDevice, DeviceRequest};
pub use error::CoreError;
pub use frame::{FeatureShape, Spectrogram};
