use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::process::Command;

use super::tools::ffmpeg;
use super::wav::{is_readable_wav, save_audio};
use crate::errors::{StudioError, StudioResult};
use crate::models::OutputFormat;
use crate::utils::common::run_blocking;

pub const DEFAULT_MP3_BITRATE: &str = "192k";

// Sample rate used when ffmpeg normalises a reference recording
const FALLBACK_SAMPLE_RATE: u32 = 24000;

/// Encode a WAV file as MP3 with libmp3lame.
///
/// Without `mp3_path` the output sits beside the input with an `.mp3`
/// extension.
pub async fn convert_to_mp3(
    wav_path: &Path,
    mp3_path: Option<&Path>,
    bitrate: &str,
) -> StudioResult<PathBuf> {
    let tool = ffmpeg().ok_or_else(|| {
        StudioError::EncoderUnavailable("ffmpeg is required for MP3 export".to_string())
    })?;
    if !tool.meets_min_version() {
        warn!("{}, MP3 encoding may fail", tool.status_line());
    }

    let output = mp3_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| wav_path.with_extension("mp3"));

    info!("Encoding {} -> {} ({})", wav_path.display(), output.display(), bitrate);

    let result = Command::new(&tool.path)
        .arg("-i")
        .arg(wav_path)
        .args(["-codec:a", "libmp3lame", "-b:a", bitrate, "-y"])
        .arg(&output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(StudioError::AudioProcessing(format!(
            "ffmpeg failed to encode {}: {}",
            wav_path.display(),
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    Ok(output)
}

/// Convert to the requested format, passing WAV through untouched
pub async fn maybe_convert(path: PathBuf, format: OutputFormat) -> StudioResult<PathBuf> {
    match format {
        OutputFormat::Wav => Ok(path),
        OutputFormat::Mp3 => convert_to_mp3(&path, None, DEFAULT_MP3_BITRATE).await,
    }
}

fn converted_path(path: &Path, dir: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reference".to_string());
    dir.join(format!("{}_converted.wav", stem))
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Make sure a reference recording is a WAV the models can read.
///
/// A readable `.wav` is returned as is. Anything else is decoded in process
/// first, then handed to ffmpeg as a last resort. Converted files land beside
/// the input.
pub async fn ensure_wav(path: &Path) -> StudioResult<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_wav_in(path, dir).await
}

/// `ensure_wav` writing any converted file into `dir`
pub async fn ensure_wav_in(path: &Path, dir: &Path) -> StudioResult<PathBuf> {
    if !path.exists() {
        return Err(StudioError::InvalidInput(format!(
            "Reference audio not found: {}",
            path.display()
        )));
    }

    if has_wav_extension(path) && is_readable_wav(path) {
        return Ok(path.to_path_buf());
    }

    tokio::fs::create_dir_all(dir).await?;
    let target = converted_path(path, dir);

    let source = path.to_path_buf();
    let decode_target = target.clone();
    let decoded = run_blocking("Decoder", move || {
        let (samples, sample_rate) = decode_first_channel(&source)?;
        save_audio(&samples, &decode_target, sample_rate)
    })
    .await;

    match decoded {
        Ok(()) => {
            debug!("Decoded {} to {}", path.display(), target.display());
            return Ok(target);
        }
        Err(e) => debug!("In-process decode of {} failed: {}", path.display(), e),
    }

    match ffmpeg_to_wav(path, &target).await {
        Ok(()) => Ok(target),
        Err(e) => {
            warn!("Could not convert {} to WAV: {}", path.display(), e);
            Err(StudioError::InvalidInput(format!(
                "Unreadable reference audio {}: {}",
                path.display(),
                e
            )))
        }
    }
}

async fn ffmpeg_to_wav(input: &Path, output: &Path) -> StudioResult<()> {
    let tool = ffmpeg().ok_or_else(|| {
        StudioError::EncoderUnavailable("ffmpeg is required to convert this file".to_string())
    })?;

    let status = Command::new(&tool.path)
        .arg("-i")
        .arg(input)
        .arg("-ar")
        .arg(FALLBACK_SAMPLE_RATE.to_string())
        .args(["-ac", "1", "-y"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(StudioError::AudioProcessing(format!(
            "ffmpeg exited with {}",
            status
        )));
    }
    Ok(())
}

fn symphonia_error(context: &str, err: SymphoniaError) -> StudioError {
    StudioError::AudioProcessing(format!("{}: {}", context, err))
}

/// Decode any container symphonia knows, keeping the first channel
pub fn decode_first_channel(path: &Path) -> StudioResult<(Vec<f32>, u32)> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| symphonia_error("Unrecognised audio format", e))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StudioError::AudioProcessing("No audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| symphonia_error("Unsupported codec", e))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(symphonia_error("Failed to read packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                let frames = decoded.frames();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                // Planar layout, channel 0 comes first
                buf.copy_planar_ref(decoded);
                samples.extend_from_slice(&buf.samples()[..frames]);
            }
            Err(SymphoniaError::DecodeError(e)) => debug!("Skipping corrupt packet: {}", e),
            Err(e) => return Err(symphonia_error("Decode failed", e)),
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| StudioError::AudioProcessing("Unknown sample rate".to_string()))?;
    if samples.is_empty() {
        return Err(StudioError::AudioProcessing(format!(
            "No samples decoded from {}",
            path.display()
        )));
    }

    Ok((samples, sample_rate))
}
