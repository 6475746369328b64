use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

use crate::errors::{StudioError, StudioResult};
use crate::models::{Chapter, GenerationRequest, VoiceProfile, VoiceSelector};
use crate::services::archive::create_zip;
use crate::services::audio::merge_audio_files;
use crate::services::orchestrator::Orchestrator;
use crate::services::progress::{ProgressUpdate, report};
use crate::services::text::split_text;
use crate::utils::common::{run_blocking, timestamp_ms};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudiobookRequest {
    pub chapters: Vec<Chapter>,
    /// Chapter orders to render, all chapters when `None`
    #[serde(default)]
    pub selection: Option<Vec<usize>>,
    pub model: String,
    /// `Preset` or `Saved`
    pub voice: VoiceSelector,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterFailure {
    pub order: usize,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudiobookReport {
    pub archive: PathBuf,
    pub chapter_files: Vec<PathBuf>,
    pub failures: Vec<ChapterFailure>,
    /// Human-readable status, one line per event
    pub log: Vec<String>,
}

impl AudiobookReport {
    pub fn log_text(&self) -> String {
        self.log.join("\n")
    }
}

/// How every chunk of the book is voiced, decided once per run
enum BookVoice {
    Preset(String),
    Saved {
        profile: VoiceProfile,
        base_voice: Option<String>,
    },
}

/// Renders chapters one after another and packs them into a ZIP
pub struct AudiobookPipeline {
    orchestrator: Arc<Orchestrator>,
}

impl AudiobookPipeline {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    fn resolve_voice(&self, voice: &VoiceSelector) -> StudioResult<BookVoice> {
        match voice {
            VoiceSelector::Preset(name) => Ok(BookVoice::Preset(name.clone())),
            VoiceSelector::Saved { name, base_voice } => Ok(BookVoice::Saved {
                profile: self.orchestrator.resolve_saved(name)?,
                base_voice: base_voice.clone(),
            }),
            other => Err(StudioError::InvalidInput(format!(
                "Audiobooks need a preset or saved voice, got {}",
                other.label()
            ))),
        }
    }

    fn chunk_request(&self, request: &AudiobookRequest, voice: &BookVoice, chunk: &str) -> GenerationRequest {
        match voice {
            BookVoice::Preset(name) => {
                GenerationRequest::preset(chunk, request.model.as_str(), name.as_str())
                    .with_speed(request.speed)
            }
            BookVoice::Saved {
                profile,
                base_voice,
            } => GenerationRequest::from_profile(chunk, profile, base_voice.clone()),
        }
    }

    pub async fn run(
        &self,
        request: &AudiobookRequest,
        progress: Option<&Sender<ProgressUpdate>>,
    ) -> StudioResult<AudiobookReport> {
        let voice = self.resolve_voice(&request.voice)?;

        let selected: Vec<&Chapter> = match &request.selection {
            Some(orders) => request
                .chapters
                .iter()
                .filter(|c| orders.contains(&c.order))
                .collect(),
            None => request.chapters.iter().collect(),
        };
        if selected.is_empty() {
            return Err(StudioError::InvalidInput(
                "No valid chapters selected".to_string(),
            ));
        }

        let config = self.orchestrator.config();
        tokio::fs::create_dir_all(&config.output_dir).await?;
        let stamp = timestamp_ms();
        let total = selected.len();

        let mut log = Vec::new();
        let mut chapter_files = Vec::new();
        let mut failures = Vec::new();

        report(progress, ProgressUpdate::Started { total }).await;

        for (index, chapter) in selected.into_iter().enumerate() {
            log.push(format!("[{}/{}] Generating: {}", index + 1, total, chapter.title));
            report(
                progress,
                ProgressUpdate::ItemStarted {
                    index,
                    total,
                    label: chapter.label(),
                },
            )
            .await;

            let target = config
                .output_dir
                .join(format!("audiobook_{}_ch{:03}.wav", stamp, chapter.order));

            match self.render_chapter(request, &voice, chapter, &target, progress).await {
                Ok(true) => {
                    log.push(format!("  Done: {}", chapter.title));
                    chapter_files.push(target);
                    report(
                        progress,
                        ProgressUpdate::ItemCompleted {
                            index,
                            label: chapter.label(),
                        },
                    )
                    .await;
                }
                Ok(false) => log.push(format!("  Skipped (empty): {}", chapter.title)),
                Err(e) => {
                    warn!("Chapter {} failed: {}", chapter.label(), e);
                    log.push(format!("  FAILED: {}: {}", chapter.title, e));
                    failures.push(ChapterFailure {
                        order: chapter.order,
                        title: chapter.title.clone(),
                        reason: e.to_string(),
                    });
                    report(
                        progress,
                        ProgressUpdate::ItemFailed {
                            index,
                            label: chapter.label(),
                            reason: e.to_string(),
                        },
                    )
                    .await;
                }
            }
        }

        if chapter_files.is_empty() {
            log.push("No chapters were generated successfully.".to_string());
            return Err(StudioError::BatchFailed(log.join("\n")));
        }

        report(progress, ProgressUpdate::Packaging).await;
        let archive = {
            let files = chapter_files.clone();
            let output = config.output_dir.join(format!("audiobook_{}.zip", stamp));
            run_blocking("Archive", move || create_zip(&files, &output)).await?
        };
        log.push(format!(
            "Done! {} chapters packaged into ZIP.",
            chapter_files.len()
        ));
        info!("Audiobook written to {}", archive.display());
        report(progress, ProgressUpdate::Completed).await;

        Ok(AudiobookReport {
            archive,
            chapter_files,
            failures,
            log,
        })
    }

    /// Voice one chapter into `target`. `Ok(false)` when it had no text.
    async fn render_chapter(
        &self,
        request: &AudiobookRequest,
        voice: &BookVoice,
        chapter: &Chapter,
        target: &Path,
        progress: Option<&Sender<ProgressUpdate>>,
    ) -> StudioResult<bool> {
        let config = self.orchestrator.config();
        let chunks: Vec<String> = split_text(&chapter.content, config.chunk_max_chars)
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();

        let mut chunk_files = Vec::with_capacity(chunks.len());
        let mut sample_rate = config.default_sample_rate;

        for (i, chunk) in chunks.iter().enumerate() {
            report(
                progress,
                ProgressUpdate::Chunk {
                    current: i + 1,
                    total: chunks.len(),
                },
            )
            .await;

            let generated = match self
                .orchestrator
                .generate(&self.chunk_request(request, voice, chunk))
                .await
            {
                Ok(generated) => generated,
                Err(e) => {
                    remove_all(&chunk_files).await;
                    return Err(e);
                }
            };
            sample_rate = generated.sample_rate;
            chunk_files.push(generated.path);
        }

        match chunk_files.as_slice() {
            [] => Ok(false),
            [single] => {
                move_chunk(single, target).await?;
                Ok(true)
            }
            _ => {
                let files = chunk_files.clone();
                let output = target.to_path_buf();
                let silence_ms = config.merge_silence_ms;
                let merged = run_blocking("Merge", move || {
                    merge_audio_files(&files, &output, sample_rate, silence_ms)
                })
                .await;
                remove_all(&chunk_files).await;
                merged.map(|_| true)
            }
        }
    }
}

/// Rename a lone chunk to the chapter file, dropping the chunk if that fails
async fn move_chunk(chunk: &Path, target: &Path) -> StudioResult<()> {
    if let Err(e) = tokio::fs::rename(chunk, target).await {
        remove_all(&[chunk.to_path_buf()]).await;
        return Err(e.into());
    }
    Ok(())
}

/// Delete intermediate chunk files. Missing files are fine.
async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}
