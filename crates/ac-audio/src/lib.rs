// Audio decoding, normalization, and spectral features for audiocnn.

pub mod decode;
pub mod error;
pub mod mel;
pub mod mfcc;
pub mod normalize;
pub mod resample;
pub mod stft;
pub mod transform;

pub use error::AudioError;
pub use normalize::Normalizer;
pub use transform::{SpectralTransform, TransformKind};
