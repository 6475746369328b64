//! Generation orchestrator
//!
//! One driver for every mode: validate, check the model can do it, prepare
//! the reference audio, build the native call, run it on a cached handle and
//! persist what comes back.

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::config::registry::{ModelDescriptor, ModelRegistry};
use crate::errors::{StudioError, StudioResult};
use crate::models::{
    GeneratedAudio, GenerationMode, GenerationRequest, VoiceProfile, VoiceSelector,
};
use crate::services::audio::{ensure_wav_in, maybe_convert, save_audio};
use crate::services::cache::ModelCache;
use crate::services::engine::{CallInput, NativeVoice};
use crate::services::voices::VoiceLibrary;
use crate::utils::common::{output_path, run_blocking};

pub struct Orchestrator {
    config: Arc<AppConfig>,
    cache: Arc<ModelCache>,
    voices: Arc<VoiceLibrary>,
}

impl Orchestrator {
    pub fn new(config: Arc<AppConfig>, cache: Arc<ModelCache>, voices: Arc<VoiceLibrary>) -> Self {
        Self {
            config,
            cache,
            voices,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.cache.registry()
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn voices(&self) -> &VoiceLibrary {
        &self.voices
    }

    /// Look up a saved voice by slug or display name
    pub fn resolve_saved(&self, name: &str) -> StudioResult<VoiceProfile> {
        self.voices.find(name)
    }

    /// Generate one file for `request`.
    pub async fn generate(&self, request: &GenerationRequest) -> StudioResult<GeneratedAudio> {
        match &request.voice {
            VoiceSelector::Saved { name, base_voice } => {
                let profile = self.resolve_saved(name)?;
                let mut resolved =
                    GenerationRequest::from_profile(request.text.clone(), &profile, base_voice.clone());
                if resolved.ref_text.is_none() {
                    resolved.ref_text = request.ref_text.clone();
                }
                resolved.speed = request.speed;
                resolved.instruct = request.instruct.clone();
                resolved.output_format = request.output_format;
                self.run(&resolved).await
            }
            _ => self.run(request).await,
        }
    }

    pub async fn generate_speech(
        &self,
        text: &str,
        model: &str,
        voice: &str,
        speed: f32,
    ) -> StudioResult<GeneratedAudio> {
        let request = GenerationRequest::preset(text, model, voice).with_speed(speed);
        self.generate(&request).await
    }

    pub async fn clone_voice(
        &self,
        text: &str,
        model: &str,
        reference: &Path,
        ref_text: Option<&str>,
        base_voice: Option<&str>,
    ) -> StudioResult<GeneratedAudio> {
        let mut request = GenerationRequest::new(
            text,
            model,
            VoiceSelector::Clone {
                reference: reference.to_path_buf(),
                base_voice: base_voice.map(str::to_string),
            },
        );
        request.ref_text = ref_text.map(str::to_string);
        self.generate(&request).await
    }

    pub async fn design_voice(
        &self,
        text: &str,
        model: &str,
        description: &str,
        language: Option<&str>,
    ) -> StudioResult<GeneratedAudio> {
        let mut request =
            GenerationRequest::new(text, model, VoiceSelector::Design(description.to_string()));
        request.language = language.map(str::to_string);
        self.generate(&request).await
    }

    pub async fn generate_dialogue(&self, script: &str, model: &str) -> StudioResult<GeneratedAudio> {
        self.generate(&GenerationRequest::new(script, model, VoiceSelector::Dialogue))
            .await
    }

    fn validate(&self, request: &GenerationRequest) -> StudioResult<&ModelDescriptor> {
        let mode = request.mode();
        if request.text.trim().is_empty() {
            let what = if mode == GenerationMode::Dialogue { "Script" } else { "Text" };
            return Err(StudioError::InvalidInput(format!("{} cannot be empty", what)));
        }

        let chars = request.text.chars().count();
        if chars > self.config.text_char_limit_warning {
            warn!(
                "Text is {} characters, generation on {} may be slow",
                chars, request.model
            );
        }

        let descriptor = self.registry().require(&request.model)?;
        if !descriptor.supports(mode) {
            return Err(StudioError::unsupported(&descriptor.name, mode.operation()));
        }

        match &request.voice {
            VoiceSelector::Preset(voice) if voice.trim().is_empty() => {
                Err(StudioError::InvalidInput("Voice cannot be empty".to_string()))
            }
            VoiceSelector::Design(description) if description.trim().is_empty() => Err(
                StudioError::InvalidInput("Voice description cannot be empty".to_string()),
            ),
            VoiceSelector::Clone { reference, .. } if !reference.is_file() => {
                Err(StudioError::InvalidInput(format!(
                    "Reference audio not found: {}",
                    reference.display()
                )))
            }
            _ => Ok(descriptor),
        }
    }

    async fn run(&self, request: &GenerationRequest) -> StudioResult<GeneratedAudio> {
        let descriptor = self.validate(request)?;
        let mode = request.mode();

        let ref_audio = match &request.voice {
            VoiceSelector::Clone { reference, .. } => {
                Some(ensure_wav_in(reference, &self.config.uploads_dir).await?)
            }
            _ => None,
        };

        let voice = native_voice(request, ref_audio.as_deref())?;
        let params = descriptor.family.build_params(
            &descriptor.name,
            &CallInput {
                text: &request.text,
                speed: request.speed,
                instruct: request.instruct.as_deref(),
                voice,
            },
        )?;

        let handle = self.cache.acquire(&descriptor.name).await?;

        info!(
            "Generating {} with {} ({})",
            mode,
            descriptor.name,
            request.voice.label()
        );
        let started = Instant::now();
        let samples = handle.synthesize(params).await?;
        drop(handle);

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let wav_path = output_path(&self.config.output_dir, mode.file_prefix(), "wav");
        let num_samples = samples.len();
        let sample_rate = descriptor.sample_rate;
        let target = wav_path.clone();
        run_blocking("WAV writer", move || save_audio(&samples, &target, sample_rate)).await?;

        info!(
            "Generated {} samples with {} in {:?} -> {}",
            num_samples,
            descriptor.name,
            started.elapsed(),
            wav_path.display()
        );

        let path = maybe_convert(wav_path, request.output_format).await?;

        Ok(GeneratedAudio {
            path,
            model: descriptor.name.clone(),
            sample_rate: descriptor.sample_rate,
            num_samples,
        })
    }
}

fn native_voice<'a>(
    request: &'a GenerationRequest,
    ref_audio: Option<&'a Path>,
) -> StudioResult<NativeVoice<'a>> {
    Ok(match &request.voice {
        VoiceSelector::Preset(voice) => NativeVoice::Preset(voice.trim()),
        VoiceSelector::Clone { base_voice, .. } => NativeVoice::Clone {
            ref_audio: ref_audio.ok_or_else(|| {
                StudioError::InvalidInput("Reference audio is required".to_string())
            })?,
            ref_text: request.transcript(),
            base_voice: base_voice.as_deref(),
        },
        VoiceSelector::Design(description) => NativeVoice::Design {
            description: description.trim(),
            language: request.language.as_deref(),
        },
        VoiceSelector::Dialogue => NativeVoice::Dialogue,
        VoiceSelector::Saved { name, .. } => {
            return Err(StudioError::RuntimeFailure(format!(
                "Saved voice '{}' was not resolved",
                name
            )));
        }
    })
}
