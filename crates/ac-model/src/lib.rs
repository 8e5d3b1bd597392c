/// CNN classifier, accelerator probing, and checkpoints for audiocnn.
///
/// The network is written against burn's `Backend` trait; the binary picks
/// NdArray or wgpu at startup.

pub mod checkpoint;
pub mod device;
pub mod error;
pub mod model;

pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use error::ModelError;
pub use model::{AudioCnn, AudioCnnConfig, ModelKind, init_model};
