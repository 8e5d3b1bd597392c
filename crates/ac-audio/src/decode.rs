use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono waveform and its native sample rate.
#[derive(Clone, Debug)]
pub struct Waveform {
    /// Mono samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

/// Decode an audio file into mono f32 samples.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia. Multi-channel audio is
/// averaged down to one channel; the native sample rate is kept.
///
/// # Errors
/// Returns an error if the file cannot be opened, declares no sample rate,
/// holds a corrupt packet, is empty, or ends before its declared length.
///
/// # Example
/// ```no_run
/// use ac_audio::decode::decode_file;
/// let waveform = decode_file("clip.wav").unwrap();
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<Waveform> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognized audio format in {}", path.display()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track found")?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .with_context(|| format!("No sample rate declared in {}", path.display()))?;
    let expected_frames = track.codec_params.n_frames;
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Corrupt audio packet in {}", path.display()));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .with_context(|| format!("Corrupt audio frame in {}", path.display()))?;

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono
        for chunk in buf.samples().chunks(channels) {
            samples.push(chunk.iter().sum::<f32>() / channels as f32);
        }
    }

    if samples.is_empty() {
        bail!("No audio samples in {}", path.display());
    }
    // An early end of stream leaves fewer frames than the header declares.
    if let Some(expected) = expected_frames
        && (samples.len() as u64) < expected
    {
        bail!(
            "Truncated audio file {}: decoded {} of {expected} frames",
            path.display(),
            samples.len()
        );
    }

    log::debug!(
        "Decoded {} samples @ {}Hz ({} ch) from {}",
        samples.len(),
        sample_rate,
        channels,
        path.display()
    );

    Ok(Waveform {
        samples,
        sample_rate,
    })
}
