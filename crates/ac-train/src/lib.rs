/// Sample pipeline, batch loading and the training loop for audiocnn.

pub mod dataset;
pub mod loader;
pub mod trainer;

pub use dataset::{AudioDataset, Sample, SampleSource};
pub use loader::{BatchLoader, FeatureBatch};
pub use trainer::{EpochReport, EvalReport, Trainer};
