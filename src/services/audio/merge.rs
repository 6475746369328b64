use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::wav::{read_audio, save_audio};
use crate::errors::StudioResult;

/// Number of zero samples for a gap of `silence_ms` at `sample_rate`
pub fn silence_len(sample_rate: u32, silence_ms: u32) -> usize {
    (sample_rate as u64 * silence_ms as u64 / 1000) as usize
}

/// Concatenate segments with a zero gap between every pair.
///
/// No gap is added after the last segment. An empty input yields a single
/// zero sample so the output is always a valid, non-empty file.
pub fn merge_samples(segments: &[Vec<f32>], sample_rate: u32, silence_ms: u32) -> Vec<f32> {
    if segments.is_empty() {
        return vec![0.0];
    }

    let gap = silence_len(sample_rate, silence_ms);
    let total = segments.iter().map(Vec::len).sum::<usize>() + gap * (segments.len() - 1);

    let mut merged = Vec::with_capacity(total);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            merged.resize(merged.len() + gap, 0.0);
        }
        merged.extend_from_slice(segment);
    }

    merged
}

/// Merge audio files into one WAV at `sample_rate`.
///
/// Inputs are decoded in parallel; the output keeps input order. Inputs are
/// taken as already being at `sample_rate`, no resampling happens here.
pub fn merge_audio_files(
    paths: &[PathBuf],
    output: &Path,
    sample_rate: u32,
    silence_ms: u32,
) -> StudioResult<PathBuf> {
    info!(
        "Merging {} audio files into {} ({} ms gaps)",
        paths.len(),
        output.display(),
        silence_ms
    );

    let segments = paths
        .par_iter()
        .map(|path| {
            let (samples, rate) = read_audio(path)?;
            if rate != sample_rate {
                debug!(
                    "{} is {} Hz, merging at {} Hz",
                    path.display(),
                    rate,
                    sample_rate
                );
            }
            Ok(samples)
        })
        .collect::<StudioResult<Vec<_>>>()?;

    let merged = merge_samples(&segments, sample_rate, silence_ms);
    save_audio(&merged, output, sample_rate)?;

    Ok(output.to_path_buf())
}
