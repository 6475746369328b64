use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

use crate::errors::{StudioError, StudioResult};
use crate::models::{GeneratedAudio, GenerationRequest, OutputFormat, VoiceSelector};
use crate::services::orchestrator::Orchestrator;
use crate::services::progress::{ProgressUpdate, report};

pub const MAX_SLOTS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompareSlot {
    pub model: String,
    /// `Preset` or `Saved`
    pub voice: VoiceSelector,
}

impl CompareSlot {
    pub fn new(model: impl Into<String>, voice: VoiceSelector) -> Self {
        Self {
            model: model.into(),
            voice,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub text: String,
    pub slots: Vec<CompareSlot>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    /// One entry per slot, `None` where the slot was skipped or failed
    pub outputs: Vec<Option<GeneratedAudio>>,
    /// "Voice {n}: reason" lines
    pub failures: Vec<String>,
}

impl CompareReport {
    pub fn succeeded(&self) -> usize {
        self.outputs.iter().filter(|o| o.is_some()).count()
    }
}

/// Same text through up to four voices, one after another
pub struct VoiceComparison {
    orchestrator: Arc<Orchestrator>,
}

impl VoiceComparison {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    fn validate(&self, request: &CompareRequest) -> StudioResult<()> {
        if request.text.trim().is_empty() {
            return Err(StudioError::InvalidInput("Text cannot be empty".to_string()));
        }
        if request.slots.is_empty() || request.slots.len() > MAX_SLOTS {
            return Err(StudioError::InvalidInput(format!(
                "Compare takes 1 to {} voices, got {}",
                MAX_SLOTS,
                request.slots.len()
            )));
        }

        let chars = request.text.chars().count();
        let limit = self.orchestrator.config().text_char_limit_warning;
        if chars > limit {
            warn!("Text is {} chars. Inputs over {} may be slow.", chars, limit);
        }
        Ok(())
    }

    fn slot_request(
        &self,
        request: &CompareRequest,
        slot: &CompareSlot,
    ) -> StudioResult<GenerationRequest> {
        let generation = match &slot.voice {
            VoiceSelector::Preset(voice) => {
                GenerationRequest::preset(request.text.as_str(), slot.model.as_str(), voice.as_str())
            }
            VoiceSelector::Saved { name, base_voice } => {
                let profile = self.orchestrator.resolve_saved(name)?;
                GenerationRequest::from_profile(request.text.as_str(), &profile, base_voice.clone())
            }
            other => {
                return Err(StudioError::InvalidInput(format!(
                    "Compare slots take a preset or saved voice, got {}",
                    other.label()
                )));
            }
        };
        Ok(generation.with_format(request.output_format))
    }

    pub async fn run(
        &self,
        request: &CompareRequest,
        progress: Option<&Sender<ProgressUpdate>>,
    ) -> StudioResult<CompareReport> {
        self.validate(request)?;

        let total = request.slots.len();
        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();

        report(progress, ProgressUpdate::Started { total }).await;

        for (index, slot) in request.slots.iter().enumerate() {
            let label = format!("Voice {}", index + 1);

            let generation = match self.slot_request(request, slot) {
                Ok(generation) => generation,
                Err(e) => {
                    warn!("{}: skipped: {}", label, e);
                    failures.push(format!("{}: {}", label, e));
                    outputs.push(None);
                    continue;
                }
            };

            if !self.orchestrator.cache().is_loaded(&generation.model) {
                report(progress, ProgressUpdate::LoadingModel(generation.model.clone())).await;
            }
            report(
                progress,
                ProgressUpdate::ItemStarted {
                    index,
                    total,
                    label: label.clone(),
                },
            )
            .await;

            match self.orchestrator.generate(&generation).await {
                Ok(audio) => {
                    report(progress, ProgressUpdate::ItemCompleted { index, label }).await;
                    outputs.push(Some(audio));
                }
                Err(e) => {
                    warn!("{} failed: {}", label, e);
                    failures.push(format!("{}: {}", label, e));
                    report(
                        progress,
                        ProgressUpdate::ItemFailed {
                            index,
                            label,
                            reason: e.to_string(),
                        },
                    )
                    .await;
                    outputs.push(None);
                }
            }
        }

        if outputs.iter().all(Option::is_none) {
            return Err(StudioError::BatchFailed(failures.join("\n")));
        }

        report(progress, ProgressUpdate::Completed).await;
        Ok(CompareReport { outputs, failures })
    }
}
