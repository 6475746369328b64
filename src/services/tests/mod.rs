use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;

use super::audio::{read_audio, save_audio, silence_len};
use super::audiobook::{AudiobookPipeline, AudiobookRequest};
use super::cache::ModelCache;
use super::compare::{CompareRequest, CompareSlot, VoiceComparison};
use super::engine::{GenerateParams, ModelLoader, SegmentStream, SpeechModel};
use super::orchestrator::Orchestrator;
use super::progress::ProgressUpdate;
use super::voices::VoiceLibrary;
use crate::config::AppConfig;
use crate::config::registry::{ModelDescriptor, ModelRegistry};
use crate::errors::{StudioError, StudioResult};
use crate::models::{AudioSegment, Chapter, GenerationRequest, VoiceSelector};

/// Samples per scripted segment; every call yields two segments
pub const SEGMENT_LEN: usize = 1200;
/// Text containing this fails at generation time
pub const FAIL_MARKER: &str = "[fail]";
/// Text containing this yields an empty stream
pub const SILENT_MARKER: &str = "[silent]";

/// In-process stand-in for the inference server.
///
/// Counts loads and records every generate call.
#[derive(Default)]
pub struct ScriptedLoader {
    loads: AtomicUsize,
    failing_loads: Vec<String>,
    calls: Arc<Mutex<Vec<(String, GenerateParams)>>>,
}

impl ScriptedLoader {
    pub fn failing_load(mut self, model: &str) -> Self {
        self.failing_loads.push(model.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// (model name, params) of every generate call so far
    pub fn calls(&self) -> Vec<(String, GenerateParams)> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl ModelLoader for ScriptedLoader {
    async fn load(&self, descriptor: &ModelDescriptor) -> StudioResult<Box<dyn SpeechModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing_loads.contains(&descriptor.name) {
            return Err(StudioError::RuntimeFailure(format!(
                "missing weights for {}",
                descriptor.repo_id
            )));
        }
        Ok(Box::new(ScriptedModel {
            name: descriptor.name.clone(),
            sample_rate: descriptor.sample_rate,
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct ScriptedModel {
    name: String,
    sample_rate: u32,
    calls: Arc<Mutex<Vec<(String, GenerateParams)>>>,
}

#[async_trait::async_trait]
impl SpeechModel for ScriptedModel {
    async fn generate(&self, params: GenerateParams) -> StudioResult<SegmentStream> {
        let text = params.text.clone();
        self.calls.lock().push((self.name.clone(), params));

        if text.contains(FAIL_MARKER) {
            return Err(StudioError::RuntimeFailure("scripted failure".to_string()));
        }
        if text.contains(SILENT_MARKER) {
            return Ok(stream::empty().boxed());
        }

        let segments: Vec<StudioResult<AudioSegment>> = (0..2)
            .map(|_| Ok(AudioSegment::new(vec![0.1; SEGMENT_LEN], self.sample_rate)))
            .collect();
        Ok(stream::iter(segments).boxed())
    }
}

struct Studio {
    dir: TempDir,
    config: Arc<AppConfig>,
    loader: Arc<ScriptedLoader>,
    orchestrator: Arc<Orchestrator>,
}

impl Studio {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::rooted_at(dir.path());
        adjust(&mut config);
        let config = Arc::new(config);

        let loader = Arc::new(ScriptedLoader::default());
        let cache = Arc::new(
            ModelCache::new(
                Arc::new(ModelRegistry::builtin()),
                loader.clone(),
                config.max_cached_models,
            )
            .unwrap(),
        );
        let voices = Arc::new(VoiceLibrary::new(config.voices_dir.clone()));
        let orchestrator = Arc::new(Orchestrator::new(config.clone(), cache, voices));

        Self {
            dir,
            config,
            loader,
            orchestrator,
        }
    }

    fn reference(&self) -> PathBuf {
        let path = self.dir.path().join("reference.wav");
        save_audio(&vec![0.3; 4800], &path, 24000).unwrap();
        path
    }

    fn output_files(&self) -> Vec<PathBuf> {
        list_files(&self.config.output_dir)
    }

    fn last_params(&self) -> GenerateParams {
        self.loader.calls().last().unwrap().1.clone()
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries.map(|e| e.unwrap().path()).collect();
    files.sort();
    files
}

fn drain(mut rx: mpsc::Receiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn test_kokoro_preset_writes_one_24k_file() {
    let studio = Studio::new();

    let audio = studio
        .orchestrator
        .generate_speech("Hello world.", "Kokoro-82M", "bf_emma", 1.0)
        .await
        .unwrap();

    assert_eq!(studio.output_files(), vec![audio.path.clone()]);
    let name = audio.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("tts_") && name.ends_with(".wav"), "{}", name);

    let (samples, rate) = read_audio(&audio.path).unwrap();
    assert_eq!(rate, 24000);
    assert_eq!(samples.len(), 2 * SEGMENT_LEN);
    assert_eq!(audio.num_samples, 2 * SEGMENT_LEN);

    let params = studio.last_params();
    assert_eq!(params.lang_code.as_deref(), Some("b"));
    assert_eq!(params.voice.as_deref(), Some("bf_emma"));
    assert_eq!(params.speed, Some(1.0));
    assert_eq!(studio.loader.load_count(), 1);
}

#[tokio::test]
async fn test_repeat_requests_reuse_the_loaded_model() {
    let studio = Studio::new();
    for _ in 0..3 {
        studio
            .orchestrator
            .generate_speech("Again.", "Kokoro-82M", "af_heart", 1.2)
            .await
            .unwrap();
    }
    assert_eq!(studio.loader.load_count(), 1);
    assert_eq!(studio.output_files().len(), 3);
}

#[tokio::test]
async fn test_clone_on_non_cloning_model_touches_nothing() {
    let studio = Studio::new();
    // The reference does not even exist: the capability check comes first
    let missing = studio.dir.path().join("missing.wav");

    let err = studio
        .orchestrator
        .clone_voice("Hi there.", "Kokoro-82M", &missing, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::UnsupportedOperation { ref model, .. } if model == "Kokoro-82M"));
    assert!(studio.output_files().is_empty());
    assert_eq!(studio.loader.load_count(), 0);
}

#[tokio::test]
async fn test_clone_forwards_reference_and_transcript() {
    let studio = Studio::new();
    let reference = studio.reference();

    studio
        .orchestrator
        .clone_voice("Hi there.", "CSM-1B", &reference, Some("  sample words "), None)
        .await
        .unwrap();

    let params = studio.last_params();
    assert_eq!(params.ref_audio.as_deref(), reference.to_str());
    assert_eq!(params.ref_text.as_deref(), Some("sample words"));
    assert_eq!(params.speaker, Some(0));
}

#[tokio::test]
async fn test_custom_voice_clone_without_base_voice_fails_before_load() {
    let studio = Studio::new();
    let reference = studio.reference();

    let err = studio
        .orchestrator
        .clone_voice("Hi.", "Qwen3-TTS-CustomVoice", &reference, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::InvalidInput(_)));
    assert_eq!(studio.loader.load_count(), 0);
}

#[tokio::test]
async fn test_missing_reference_is_invalid_input() {
    let studio = Studio::new();
    let err = studio
        .orchestrator
        .clone_voice("Hi.", "Qwen3-TTS-Base", Path::new("/nonexistent/ref.wav"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::InvalidInput(_)));
    assert_eq!(studio.loader.load_count(), 0);
}

#[tokio::test]
async fn test_saved_voice_uses_profile_model_and_transcript() {
    let studio = Studio::new();
    let reference = studio.reference();
    studio
        .orchestrator
        .voices()
        .save("Narrator", &reference, "The quick brown fox.", "Qwen3-TTS-Base", None)
        .await
        .unwrap();

    // The request names Kokoro, the profile's model wins
    let request = GenerationRequest::new("Read this.", "Kokoro-82M", VoiceSelector::saved("narrator"));
    let audio = studio.orchestrator.generate(&request).await.unwrap();

    assert_eq!(audio.model, "Qwen3-TTS-Base");
    let name = audio.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("clone_"));

    let (model, params) = studio.loader.calls().pop().unwrap();
    assert_eq!(model, "Qwen3-TTS-Base");
    assert_eq!(params.ref_text.as_deref(), Some("The quick brown fox."));
    assert!(params.ref_audio.unwrap().ends_with("reference.wav"));
}

#[tokio::test]
async fn test_unknown_saved_voice() {
    let studio = Studio::new();
    let request = GenerationRequest::new("Hi.", "Qwen3-TTS-Base", VoiceSelector::saved("nobody"));
    let err = studio.orchestrator.generate(&request).await.unwrap_err();
    assert!(matches!(err, StudioError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_voice_name_keeps_original() {
    let studio = Studio::new();
    let reference = studio.reference();
    let voices = studio.orchestrator.voices();

    voices
        .save("Old Friend", &reference, "first", "CSM-1B", None)
        .await
        .unwrap();
    let err = voices
        .save("old_friend", &reference, "second", "CSM-1B", None)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::DuplicateName(_)));
    assert_eq!(voices.get("old-friend").unwrap().ref_text, "first");
    assert_eq!(voices.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_design_validation_and_language() {
    let studio = Studio::new();

    let err = studio
        .orchestrator
        .design_voice("Hello.", "Qwen3-TTS-VoiceDesign", "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::InvalidInput(_)));
    assert_eq!(studio.loader.load_count(), 0);

    let audio = studio
        .orchestrator
        .design_voice("Hello.", "Qwen3-TTS-VoiceDesign", "an old sea captain", Some("auto"))
        .await
        .unwrap();
    assert!(audio.path.file_name().unwrap().to_string_lossy().starts_with("voicedesign_"));

    let params = studio.last_params();
    assert_eq!(params.instruct.as_deref(), Some("an old sea captain"));
    assert_eq!(params.lang_code, None);

    let err = studio
        .orchestrator
        .design_voice("Hello.", "Kokoro-82M", "warm", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::UnsupportedOperation { .. }));
}

#[tokio::test]
async fn test_dialogue_runs_at_dia_rate() {
    let studio = Studio::new();
    let audio = studio
        .orchestrator
        .generate_dialogue("[S1] Hello. [S2] Hi!", "Dia-1.6B")
        .await
        .unwrap();

    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(read_audio(&audio.path).unwrap().1, 44100);
    assert_eq!(studio.last_params(), GenerateParams {
        text: "[S1] Hello. [S2] Hi!".to_string(),
        ..Default::default()
    });

    let err = studio
        .orchestrator
        .generate_dialogue("  ", "Dia-1.6B")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Script cannot be empty"));
}

#[tokio::test]
async fn test_empty_stream_is_runtime_failure() {
    let studio = Studio::new();
    let err = studio
        .orchestrator
        .generate_speech("Nothing [silent]", "CSM-1B", "conversational_a", 1.0)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::EmptyOutput { .. }));
    assert!(studio.output_files().is_empty());
}

#[tokio::test]
async fn test_empty_text_and_unknown_model() {
    let studio = Studio::new();
    let err = studio
        .orchestrator
        .generate_speech(" \n ", "Kokoro-82M", "af_heart", 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::InvalidInput(_)));

    let err = studio
        .orchestrator
        .generate_speech("Hi.", "NoSuchModel", "af_heart", 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::UnknownModel(_)));
}

fn three_chapters() -> Vec<Chapter> {
    vec![
        Chapter::new("One", "The first chapter. It is short.", 0),
        Chapter::new("Two", "The second chapter [fail] breaks.", 1),
        Chapter::new("Three", "The third chapter ends the book.", 2),
    ]
}

#[tokio::test]
async fn test_audiobook_isolates_chapter_failure() {
    let studio = Studio::new();
    let pipeline = AudiobookPipeline::new(studio.orchestrator.clone());
    let request = AudiobookRequest {
        chapters: three_chapters(),
        selection: None,
        model: "Kokoro-82M".to_string(),
        voice: VoiceSelector::Preset("af_heart".to_string()),
        speed: 1.0,
    };

    let (tx, rx) = mpsc::channel(64);
    let report = pipeline.run(&request, Some(&tx)).await.unwrap();
    drop(tx);

    let archive = zip::ZipArchive::new(File::open(&report.archive).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(report.chapter_files.len(), 2);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].order, 1);
    assert_eq!(report.failures[0].title, "Two");
    assert!(report.log.iter().any(|l| l.contains("FAILED: Two")));
    assert!(report.log_text().contains("Done! 2 chapters packaged into ZIP."));

    for (file, order) in report.chapter_files.iter().zip([0, 2]) {
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(&format!("_ch{:03}.wav", order)), "{}", name);
    }

    let updates = drain(rx);
    assert_eq!(updates.first(), Some(&ProgressUpdate::Started { total: 3 }));
    assert!(updates.iter().any(|u| matches!(u, ProgressUpdate::ItemFailed { index: 1, .. })));
    assert_eq!(updates.last(), Some(&ProgressUpdate::Completed));
}

#[tokio::test]
async fn test_audiobook_merges_chunks_and_removes_them() {
    let studio = Studio::with_config(|c| c.chunk_max_chars = 30);
    let pipeline = AudiobookPipeline::new(studio.orchestrator.clone());
    let request = AudiobookRequest {
        chapters: vec![Chapter::new(
            "Long",
            "First sentence is here. Second sentence follows. Third one ends it.",
            0,
        )],
        selection: None,
        model: "Kokoro-82M".to_string(),
        voice: VoiceSelector::Preset("af_heart".to_string()),
        speed: 1.0,
    };

    let report = pipeline.run(&request, None).await.unwrap();
    assert_eq!(studio.loader.calls().len(), 3);

    let (samples, rate) = read_audio(&report.chapter_files[0]).unwrap();
    let gap = silence_len(rate, studio.config.merge_silence_ms);
    assert_eq!(samples.len(), 3 * 2 * SEGMENT_LEN + 2 * gap);

    // Only the chapter file and the archive remain
    let remaining = studio.output_files();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&report.archive));
    assert!(remaining.contains(&report.chapter_files[0]));
}

#[tokio::test]
async fn test_audiobook_selection_and_total_failure() {
    let studio = Studio::new();
    let pipeline = AudiobookPipeline::new(studio.orchestrator.clone());
    let mut request = AudiobookRequest {
        chapters: three_chapters(),
        selection: Some(vec![1]),
        model: "Kokoro-82M".to_string(),
        voice: VoiceSelector::Preset("af_heart".to_string()),
        speed: 1.0,
    };

    match pipeline.run(&request, None).await {
        Err(StudioError::BatchFailed(log)) => {
            assert!(log.contains("FAILED: Two"));
            assert!(log.contains("No chapters were generated successfully."));
        }
        other => panic!("expected batch failure, got {:?}", other.map(|r| r.archive)),
    }

    request.selection = Some(vec![7]);
    assert!(matches!(
        pipeline.run(&request, None).await,
        Err(StudioError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_audiobook_missing_saved_voice_fails_up_front() {
    let studio = Studio::new();
    let pipeline = AudiobookPipeline::new(studio.orchestrator.clone());
    let request = AudiobookRequest {
        chapters: three_chapters(),
        selection: None,
        model: "Qwen3-TTS-Base".to_string(),
        voice: VoiceSelector::saved("ghost"),
        speed: 1.0,
    };

    assert!(matches!(
        pipeline.run(&request, None).await,
        Err(StudioError::NotFound(_))
    ));
    assert!(studio.loader.calls().is_empty());
}

#[tokio::test]
async fn test_compare_skips_and_reports_by_slot() {
    let studio = Studio::new();
    let comparison = VoiceComparison::new(studio.orchestrator.clone());
    let request = CompareRequest {
        text: "Compare these voices.".to_string(),
        slots: vec![
            CompareSlot::new("Kokoro-82M", VoiceSelector::Preset("am_adam".to_string())),
            CompareSlot::new("Qwen3-TTS-Base", VoiceSelector::saved("nobody")),
            CompareSlot::new("CSM-1B", VoiceSelector::Preset("conversational_b".to_string())),
        ],
        output_format: Default::default(),
    };

    let (tx, rx) = mpsc::channel(64);
    let report = comparison.run(&request, Some(&tx)).await.unwrap();
    drop(tx);

    assert_eq!(report.outputs.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert!(report.outputs[1].is_none());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].starts_with("Voice 2: "));

    let loading: Vec<_> = drain(rx)
        .into_iter()
        .filter_map(|u| match u {
            ProgressUpdate::LoadingModel(model) => Some(model),
            _ => None,
        })
        .collect();
    assert_eq!(loading, vec!["Kokoro-82M", "CSM-1B"]);
}

#[tokio::test]
async fn test_compare_limits_and_total_failure() {
    let studio = Studio::new();
    let comparison = VoiceComparison::new(studio.orchestrator.clone());

    let slot = CompareSlot::new("Kokoro-82M", VoiceSelector::Preset("af_heart".to_string()));
    let too_many = CompareRequest {
        text: "Hi.".to_string(),
        slots: vec![slot; 5],
        output_format: Default::default(),
    };
    assert!(matches!(
        comparison.run(&too_many, None).await,
        Err(StudioError::InvalidInput(_))
    ));

    let all_fail = CompareRequest {
        text: "This will [fail].".to_string(),
        slots: vec![CompareSlot::new(
            "Kokoro-82M",
            VoiceSelector::Preset("af_heart".to_string()),
        )],
        output_format: Default::default(),
    };
    match comparison.run(&all_fail, None).await {
        Err(StudioError::BatchFailed(message)) => assert!(message.starts_with("Voice 1: ")),
        other => panic!("expected batch failure, got {:?}", other.map(|r| r.failures)),
    }
}
