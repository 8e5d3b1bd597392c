//! Sample rate conversion using rubato.

use rubato::{FftFixedIn, Resampler};

use crate::error::AudioError;

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Resample a mono signal from `source_rate` to `target_rate`.
///
/// The resampler delay is removed, so sample 0 stays at index 0, and the
/// output holds exactly `ceil(len × target / source)` samples.
///
/// # Errors
/// Returns `AudioError::Resample` if rubato rejects the rates.
pub fn resample_mono(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1,
    )?;

    let input_frames = samples.len();
    let expected_output_frames =
        (input_frames as f64 * f64::from(target_rate) / f64::from(source_rate)).ceil() as usize;
    // The first `delay` output frames precede sample 0 of the input.
    let delay = resampler.output_delay();
    let wanted = delay + expected_output_frames;
    let mut output = Vec::with_capacity(wanted + CHUNK_SIZE);

    // Zero chunks past the end flush the filter tail.
    let mut pos = 0;
    while output.len() < wanted {
        let needed = resampler.input_frames_next();
        let mut chunk = vec![0.0f32; needed];
        if pos < input_frames {
            let copy_frames = needed.min(input_frames - pos);
            chunk[..copy_frames].copy_from_slice(&samples[pos..pos + copy_frames]);
        }

        let input = vec![chunk];
        let processed = resampler.process(&input, None)?;
        if let Some(channel) = processed.first() {
            output.extend_from_slice(channel);
        }
        pos += needed;
    }

    output.drain(..delay);
    output.truncate(expected_output_frames);
    Ok(output)
}
