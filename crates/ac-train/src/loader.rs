use ac_core::FeatureShape;
use ac_core::config::LoaderOptions;
use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::dataset::{Sample, SampleSource};

/// Samples of one batch, stacked CPU-side.
///
/// `features` is `[len, 1, bins, frames]` in row-major order.
#[derive(Clone, Debug)]
pub struct FeatureBatch {
    pub features: Vec<f32>,
    pub labels: Vec<i64>,
    pub shape: FeatureShape,
    pub len: usize,
}

impl FeatureBatch {
    fn from_samples(samples: Vec<Sample>, shape: FeatureShape) -> Self {
        let len = samples.len();
        let mut features = Vec::with_capacity(len * shape.len());
        let mut labels = Vec::with_capacity(len);
        for sample in samples {
            features.extend_from_slice(&sample.features.data);
            labels.push(sample.label as i64);
        }
        Self {
            features,
            labels,
            shape,
            len,
        }
    }
}

/// Groups samples of a source into batches, epoch after epoch.
///
/// With `num_workers > 0` the samples of a batch are fetched on a dedicated
/// rayon pool. Batches themselves are produced one at a time, in order.
pub struct BatchLoader<S> {
    source: S,
    options: LoaderOptions,
    seed: Option<u64>,
    pool: Option<rayon::ThreadPool>,
}

impl<S: SampleSource> BatchLoader<S> {
    /// # Errors
    /// Returns an error for a zero batch size or if the worker pool cannot start.
    pub fn new(source: S, options: LoaderOptions, seed: Option<u64>) -> Result<Self> {
        if options.batch_size == 0 {
            bail!("runtime.loader.batch_size must be positive");
        }
        let pool = if options.num_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.num_workers)
                .thread_name(|i| format!("loader-{i}"))
                .build()
                .context("Failed to start loader worker pool")?;
            Some(pool)
        } else {
            None
        };
        log::debug!(
            "Loader: {} samples, batch {}, shuffle {}, {} workers",
            source.len(),
            options.batch_size,
            options.shuffle,
            options.num_workers
        );
        Ok(Self {
            source,
            options,
            seed,
            pool,
        })
    }

    /// Batches yielded per epoch.
    pub fn num_batches(&self) -> usize {
        let n = self.source.len();
        let b = self.options.batch_size;
        if self.options.drop_last { n / b } else { n.div_ceil(b) }
    }

    /// Sample order of `epoch`: identity, or a permutation seeded with `seed + epoch`.
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.source.len()).collect();
        if self.options.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(epoch as u64)),
                None => StdRng::from_entropy(),
            };
            order.shuffle(&mut rng);
        }
        order
    }

    /// Batches of one epoch. Each batch is loaded when the iterator reaches it.
    pub fn epoch(&self, epoch: usize) -> impl Iterator<Item = Result<FeatureBatch>> + '_ {
        let batch_size = self.options.batch_size;
        let drop_last = self.options.drop_last;
        let batches: Vec<Vec<usize>> = self
            .order(epoch)
            .chunks(batch_size)
            .filter(|chunk| !drop_last || chunk.len() == batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        batches.into_iter().map(move |indices| self.load(&indices))
    }

    fn load(&self, indices: &[usize]) -> Result<FeatureBatch> {
        let samples = match &self.pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&i| self.source.get(i))
                    .collect::<Result<Vec<_>>>()
            })?,
            None => indices
                .iter()
                .map(|&i| self.source.get(i))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(FeatureBatch::from_samples(samples, self.source.shape()))
    }
}
