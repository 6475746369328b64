//! Static model registry
//!
//! Every synthesis model the studio knows about is described here once, at
//! process start. Model-specific behaviour hangs off [`ModelFamily`] so the
//! orchestrator never branches on model name strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{StudioError, StudioResult};
use crate::models::GenerationMode;

pub const DEFAULT_SAMPLE_RATE: u32 = 24000;
pub const DIA_SAMPLE_RATE: u32 = 44100;

/// Kokoro voice ids grouped by language
pub const KOKORO_VOICES: &[(&str, &[&str])] = &[
    ("American English - Female", &[
        "af_heart", "af_alloy", "af_aoede", "af_bella", "af_jessica",
        "af_kore", "af_nicole", "af_nova", "af_river", "af_sarah", "af_sky",
    ]),
    ("American English - Male", &[
        "am_adam", "am_echo", "am_eric", "am_fenrir", "am_liam",
        "am_michael", "am_onyx", "am_puck", "am_santa",
    ]),
    ("British English - Female", &["bf_alice", "bf_emma", "bf_isabella", "bf_lily"]),
    ("British English - Male", &["bm_daniel", "bm_fable", "bm_george", "bm_lewis"]),
    ("Japanese - Female", &["jf_alpha", "jf_gongitsune", "jf_nezumi", "jf_tebukuro"]),
    ("Japanese - Male", &["jm_kumo"]),
    ("Chinese - Female", &["zf_xiaobei", "zf_xiaoni", "zf_xiaoxiao", "zf_xiaoyi"]),
    ("Chinese - Male", &["zm_yunjian", "zm_yunxi", "zm_yunxia", "zm_yunyang"]),
    ("Spanish", &["ef_dora", "em_alex", "em_santa"]),
    ("French", &["ff_siwis"]),
    ("Hindi", &["hf_alpha", "hf_beta", "hm_omega", "hm_psi"]),
    ("Italian", &["if_sara", "im_nicola"]),
    ("Portuguese", &["pf_dora", "pm_alex", "pm_santa"]),
];

pub const QWEN3_ENGLISH_VOICES: &[&str] = &["Chelsie", "Ryan", "Aiden"];
pub const QWEN3_CHINESE_VOICES: &[&str] = &["Vivian", "Serena", "Uncle_Fu", "Dylan", "Eric"];
pub const CSM_VOICES: &[&str] = &["conversational_a", "conversational_b"];

/// Kokoro language codes keyed by the first letter of the voice id
const KOKORO_LANG_PREFIXES: &[char] = &['a', 'b', 'j', 'z', 'e', 'f', 'h', 'i', 'p'];

/// Model families. One variant per distinct native call convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Kokoro,
    Qwen3Base,
    Qwen3CustomVoice,
    Qwen3VoiceDesign,
    Csm,
    Dia,
}

impl ModelFamily {
    pub fn supports(&self, mode: GenerationMode) -> bool {
        use GenerationMode::*;
        match self {
            ModelFamily::Kokoro => matches!(mode, Preset),
            ModelFamily::Qwen3Base | ModelFamily::Qwen3CustomVoice | ModelFamily::Csm => {
                matches!(mode, Preset | Clone)
            }
            ModelFamily::Qwen3VoiceDesign => matches!(mode, Design),
            ModelFamily::Dia => matches!(mode, Dialogue),
        }
    }

    /// Cloning on these models also needs a named base speaker
    pub fn requires_base_voice(&self) -> bool {
        matches!(self, ModelFamily::Qwen3CustomVoice)
    }

    /// Whether a free-form style instruction is forwarded in preset/clone mode
    pub fn accepts_style_instruction(&self) -> bool {
        matches!(self, ModelFamily::Qwen3CustomVoice)
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            ModelFamily::Dia => DIA_SAMPLE_RATE,
            _ => DEFAULT_SAMPLE_RATE,
        }
    }

    /// Preset voices offered for this family, in display order
    pub fn preset_voices(&self) -> Vec<&'static str> {
        match self {
            ModelFamily::Kokoro => KOKORO_VOICES
                .iter()
                .flat_map(|(_, voices)| voices.iter().copied())
                .collect(),
            ModelFamily::Qwen3Base | ModelFamily::Qwen3CustomVoice => QWEN3_ENGLISH_VOICES
                .iter()
                .chain(QWEN3_CHINESE_VOICES.iter())
                .copied()
                .collect(),
            ModelFamily::Csm => CSM_VOICES.to_vec(),
            ModelFamily::Qwen3VoiceDesign | ModelFamily::Dia => Vec::new(),
        }
    }
}

/// Static metadata for one synthesis model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub repo_id: String,
    pub supports_cloning: bool,
    pub description: String,
    pub sample_rate: u32,
    pub family: ModelFamily,
}

impl ModelDescriptor {
    pub fn new(
        name: &str,
        repo_id: &str,
        supports_cloning: bool,
        description: &str,
        family: ModelFamily,
    ) -> Self {
        Self {
            name: name.to_string(),
            repo_id: repo_id.to_string(),
            supports_cloning,
            description: description.to_string(),
            sample_rate: family.sample_rate(),
            family,
        }
    }

    pub fn supports(&self, mode: GenerationMode) -> bool {
        if mode == GenerationMode::Clone && !self.supports_cloning {
            return false;
        }
        self.family.supports(mode)
    }
}

/// Name → descriptor lookup, insertion order preserved for listings
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    descriptors: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    pub fn new(descriptors: Vec<ModelDescriptor>) -> StudioResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            if index.insert(descriptor.name.clone(), i).is_some() {
                return Err(StudioError::Configuration(format!(
                    "Duplicate model name in registry: {}",
                    descriptor.name
                )));
            }
        }
        Ok(Self { descriptors, index })
    }

    /// The models shipped with the studio
    pub fn builtin() -> Self {
        let descriptors = vec![
            ModelDescriptor::new(
                "Kokoro-82M",
                "mlx-community/Kokoro-82M-bf16",
                false,
                "Fast TTS, 50+ preset voices (~200MB)",
                ModelFamily::Kokoro,
            ),
            ModelDescriptor::new(
                "Qwen3-TTS-Base",
                "mlx-community/Qwen3-TTS-12Hz-0.6B-Base-bf16",
                true,
                "Higher quality + voice cloning (~1.2GB)",
                ModelFamily::Qwen3Base,
            ),
            ModelDescriptor::new(
                "Qwen3-TTS-CustomVoice",
                "mlx-community/Qwen3-TTS-12Hz-0.6B-CustomVoice-8bit",
                true,
                "Cloning with emotion control (~800MB)",
                ModelFamily::Qwen3CustomVoice,
            ),
            ModelDescriptor::new(
                "Qwen3-TTS-Base-1.7B",
                "mlx-community/Qwen3-TTS-12Hz-1.7B-Base-bf16",
                true,
                "1.7B base model, higher quality (~3.4GB)",
                ModelFamily::Qwen3Base,
            ),
            ModelDescriptor::new(
                "Qwen3-TTS-CustomVoice-1.7B",
                "mlx-community/Qwen3-TTS-12Hz-1.7B-CustomVoice-bf16",
                true,
                "1.7B cloning with emotion control (~3.4GB)",
                ModelFamily::Qwen3CustomVoice,
            ),
            ModelDescriptor::new(
                "Qwen3-TTS-VoiceDesign",
                "mlx-community/Qwen3-TTS-12Hz-1.7B-VoiceDesign-bf16",
                false,
                "Design voices from text descriptions (~3.4GB)",
                ModelFamily::Qwen3VoiceDesign,
            ),
            ModelDescriptor::new(
                "CSM-1B",
                "mlx-community/csm-1b",
                true,
                "Sesame conversational voice cloning (~2GB)",
                ModelFamily::Csm,
            ),
            ModelDescriptor::new(
                "Dia-1.6B",
                "mlx-community/Dia-1.6B-bf16",
                false,
                "Multi-speaker dialogue generation (~3.2GB)",
                ModelFamily::Dia,
            ),
        ];

        // Names above are distinct
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { descriptors, index }
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Like [`get`](Self::get) but fails with `UnknownModel`
    pub fn require(&self, name: &str) -> StudioResult<&ModelDescriptor> {
        self.get(name)
            .ok_or_else(|| StudioError::UnknownModel(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Models usable for the given mode, in registry order
    pub fn names_for(&self, mode: GenerationMode) -> Vec<&str> {
        self.descriptors
            .iter()
            .filter(|d| d.supports(mode))
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Derive Kokoro's lang_code from the voice prefix
pub fn kokoro_lang_code(voice: &str) -> String {
    let mut chars = voice.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(_)) if KOKORO_LANG_PREFIXES.contains(&first) => first.to_string(),
        _ => "a".to_string(),
    }
}

/// Determine the Qwen3 language from the preset voice name
pub fn qwen3_language(voice: &str) -> &'static str {
    if QWEN3_CHINESE_VOICES.contains(&voice) {
        "Chinese"
    } else {
        "English"
    }
}
