use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use std::path::Path;

use crate::errors::{StudioError, StudioResult};

/// Save a sample buffer as the canonical output format: mono, 32-bit float WAV.
///
/// Multi-dimensional buffers are flattened by the caller; here the slice is
/// already one-dimensional.
pub fn save_audio(samples: &[f32], path: &Path, sample_rate: u32) -> StudioResult<()> {
    if sample_rate == 0 {
        return Err(StudioError::AudioProcessing(
            "Sample rate must be positive".to_string(),
        ));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    debug!(
        "Saved WAV {} ({} samples, {} Hz)",
        path.display(),
        samples.len(),
        sample_rate
    );
    Ok(())
}

/// Read a WAV file as mono float samples.
///
/// Supports 8/16/24/32-bit integer and 32-bit float PCM. For multi-channel
/// input only the first channel is kept.
pub fn read_audio(path: &Path) -> StudioResult<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(StudioError::AudioProcessing(format!(
                "Unsupported WAV format in {}: {:?}, {} bits",
                path.display(),
                format,
                bits
            )));
        }
    };

    let samples = if channels > 1 {
        interleaved.iter().step_by(channels).copied().collect()
    } else {
        interleaved
    };

    Ok((samples, spec.sample_rate))
}

/// Whether the file is a WAV that `read_audio` can decode
pub fn is_readable_wav(path: &Path) -> bool {
    WavReader::open(path).is_ok()
}
