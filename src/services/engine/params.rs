use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::registry::{ModelFamily, kokoro_lang_code, qwen3_language};
use crate::errors::{StudioError, StudioResult};
use crate::models::GenerationMode;

/// Keyword arguments for one native generate call.
///
/// Only the fields a family understands are set; unset fields are left out
/// of the wire form entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateParams {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruct: Option<String>,
}

impl GenerateParams {
    fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// How the voice is specified once the orchestrator has validated a request
#[derive(Debug, Clone, Copy)]
pub enum NativeVoice<'a> {
    Preset(&'a str),
    Clone {
        ref_audio: &'a Path,
        ref_text: Option<&'a str>,
        base_voice: Option<&'a str>,
    },
    Design {
        description: &'a str,
        language: Option<&'a str>,
    },
    Dialogue,
}

impl NativeVoice<'_> {
    pub fn mode(&self) -> GenerationMode {
        match self {
            NativeVoice::Preset(_) => GenerationMode::Preset,
            NativeVoice::Clone { .. } => GenerationMode::Clone,
            NativeVoice::Design { .. } => GenerationMode::Design,
            NativeVoice::Dialogue => GenerationMode::Dialogue,
        }
    }
}

/// Everything a family needs to build its call
#[derive(Debug, Clone, Copy)]
pub struct CallInput<'a> {
    pub text: &'a str,
    pub speed: f32,
    /// Style instruction, forwarded only where the family accepts one
    pub instruct: Option<&'a str>,
    pub voice: NativeVoice<'a>,
}

// Single-speaker CSM generation always uses speaker 0
const CSM_SPEAKER: u32 = 0;

impl ModelFamily {
    /// Map a validated call onto this family's native keyword arguments.
    pub fn build_params(&self, model: &str, input: &CallInput<'_>) -> StudioResult<GenerateParams> {
        let mode = input.voice.mode();
        if !self.supports(mode) {
            return Err(StudioError::unsupported(model, mode.operation()));
        }

        let mut params = GenerateParams::text(input.text);
        let instruct = input
            .instruct
            .map(str::trim)
            .filter(|s| !s.is_empty() && self.accepts_style_instruction())
            .map(str::to_string);

        match (*self, input.voice) {
            (ModelFamily::Kokoro, NativeVoice::Preset(voice)) => {
                params.voice = Some(voice.to_string());
                params.speed = Some(input.speed);
                params.lang_code = Some(kokoro_lang_code(voice));
            }
            (
                ModelFamily::Qwen3Base | ModelFamily::Qwen3CustomVoice,
                NativeVoice::Preset(voice),
            ) => {
                params.voice = Some(voice.to_string());
                params.language = Some(qwen3_language(voice).to_string());
                params.instruct = instruct;
            }
            (ModelFamily::Csm, NativeVoice::Preset(voice)) => {
                params.voice = Some(voice.to_string());
                params.speaker = Some(CSM_SPEAKER);
            }
            (
                family,
                NativeVoice::Clone {
                    ref_audio,
                    ref_text,
                    base_voice,
                },
            ) => {
                params.ref_audio = Some(ref_audio.to_string_lossy().into_owned());
                params.ref_text = ref_text
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);

                if family.requires_base_voice() {
                    let base = base_voice.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
                        StudioError::InvalidInput(format!(
                            "Model '{}' needs a base voice for cloning",
                            model
                        ))
                    })?;
                    params.voice = Some(base.to_string());
                    params.instruct = instruct;
                }
                if family == ModelFamily::Csm {
                    params.speaker = Some(CSM_SPEAKER);
                }
            }
            (ModelFamily::Qwen3VoiceDesign, NativeVoice::Design { description, language }) => {
                params.instruct = Some(description.to_string());
                params.lang_code = language
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("auto"))
                    .map(str::to_string);
            }
            (ModelFamily::Dia, NativeVoice::Dialogue) => {}
            _ => return Err(StudioError::unsupported(model, mode.operation())),
        }

        Ok(params)
    }
}
