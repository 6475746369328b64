use std::path::Path;

use crate::commands::Studio;
use crate::config::registry::ModelRegistry;
use crate::config::{AppConfig, default_config_path};
use crate::errors::{StudioError, StudioResult};
use crate::models::GenerationMode;
use crate::services::audio::{ExternalTool, ffmpeg};

const MODES: [GenerationMode; 4] = [
    GenerationMode::Preset,
    GenerationMode::Clone,
    GenerationMode::Design,
    GenerationMode::Dialogue,
];

pub fn models(studio: &Studio, mode: Option<GenerationMode>, voices: bool) -> StudioResult<()> {
    for line in model_listing(studio.orchestrator.registry(), mode, voices)? {
        println!("{}", line);
    }
    Ok(())
}

/// Lines printed by `models`, filtered to one mode when given
fn model_listing(
    registry: &ModelRegistry,
    mode: Option<GenerationMode>,
    voices: bool,
) -> StudioResult<Vec<String>> {
    let names = match mode {
        Some(mode) => registry.names_for(mode),
        None => registry.names(),
    };
    let mut lines = Vec::new();
    for name in names {
        let descriptor = registry.require(name)?;
        let supported: Vec<&str> = MODES
            .iter()
            .filter(|m| descriptor.supports(**m))
            .map(|m| m.operation())
            .collect();
        lines.push(format!(
            "{:<28} {:>6} Hz  {}",
            descriptor.name, descriptor.sample_rate, descriptor.description
        ));
        lines.push(format!("{:<28} {}", "", supported.join(", ")));
        if voices {
            let presets = descriptor.family.preset_voices();
            if !presets.is_empty() {
                lines.push(format!("{:<28} voices: {}", "", presets.join(" ")));
            }
        }
    }
    Ok(lines)
}

pub async fn check(studio: &Studio) -> StudioResult<()> {
    let server_ok = studio.loader.is_healthy().await;
    println!(
        "Inference server {}: {}",
        studio.loader.endpoint(),
        if server_ok { "ok" } else { "not responding" }
    );
    println!("{}", encoder_status(ffmpeg()));
    println!("Output: {}", studio.config.output_dir.display());
    println!("Voices: {}", studio.config.voices_dir.display());

    if server_ok {
        Ok(())
    } else {
        Err(StudioError::RuntimeFailure(
            "Inference server is not reachable".to_string(),
        ))
    }
}

fn encoder_status(tool: Option<&ExternalTool>) -> String {
    match tool {
        Some(tool) => format!("MP3 encoder: {}", tool.status_line()),
        None => "MP3 encoder: ffmpeg not found, MP3 output disabled".to_string(),
    }
}

pub fn init_config(path: Option<&Path>, force: bool) -> StudioResult<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if path.exists() && !force {
        return Err(StudioError::InvalidInput(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }
    AppConfig::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::path::PathBuf;

    #[test]
    fn test_model_listing_filters_by_mode() {
        let registry = ModelRegistry::builtin();
        let all = model_listing(&registry, None, false).unwrap();
        assert_eq!(all.len(), registry.len() * 2);

        let design = model_listing(&registry, Some(GenerationMode::Design), false).unwrap();
        assert_eq!(design.len(), 2);
        assert!(design[0].starts_with("Qwen3-TTS-VoiceDesign"));

        let dialogue = model_listing(&registry, Some(GenerationMode::Dialogue), false).unwrap();
        assert!(dialogue[0].starts_with("Dia-1.6B"));
    }

    #[test]
    fn test_model_listing_includes_preset_voices() {
        let registry = ModelRegistry::builtin();
        let lines = model_listing(&registry, Some(GenerationMode::Clone), true).unwrap();
        assert!(lines.iter().any(|l| l.contains("voices: conversational_a conversational_b")));
        assert!(!lines.iter().any(|l| l.starts_with("Kokoro-82M")));

        let lines = model_listing(&registry, Some(GenerationMode::Design), true).unwrap();
        assert!(!lines.iter().any(|l| l.contains("voices:")));

        let lines = model_listing(&registry, Some(GenerationMode::Preset), true).unwrap();
        assert!(lines.iter().any(|l| l.contains("af_heart")));
    }

    #[test]
    fn test_encoder_status() {
        assert!(encoder_status(None).contains("MP3 output disabled"));

        let tool = ExternalTool {
            name: "ffmpeg".into(),
            path: PathBuf::from("/usr/bin/ffmpeg"),
            description: "Audio encoder and converter".into(),
            version: Some(Version::new(3, 0, 0)),
            min_version: Version::new(4, 0, 0),
        };
        let status = encoder_status(Some(&tool));
        assert!(status.starts_with("MP3 encoder: ffmpeg 3.0.0"));
        assert!(status.contains("older than the supported 4.0.0"));
    }
}
