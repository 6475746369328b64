use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::library::VoiceProfile;

/// Generation modes, one per orchestrator driver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Preset,
    Clone,
    Design,
    Dialogue,
}

impl GenerationMode {
    /// File name prefix for generated output
    pub fn file_prefix(&self) -> &'static str {
        match self {
            GenerationMode::Preset => "tts",
            GenerationMode::Clone => "clone",
            GenerationMode::Design => "voicedesign",
            GenerationMode::Dialogue => "dialogue",
        }
    }

    /// Human-readable operation name used in error messages
    pub fn operation(&self) -> &'static str {
        match self {
            GenerationMode::Preset => "preset voices",
            GenerationMode::Clone => "voice cloning",
            GenerationMode::Design => "voice design",
            GenerationMode::Dialogue => "dialogue generation",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// Which voice a request speaks with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSelector {
    /// A preset voice id of the target model
    Preset(String),
    /// Clone from a reference recording
    Clone {
        reference: PathBuf,
        /// Base speaker, required by CustomVoice models
        #[serde(default)]
        base_voice: Option<String>,
    },
    /// A voice profile from the library, by slug or display name
    Saved {
        name: String,
        #[serde(default)]
        base_voice: Option<String>,
    },
    /// Natural-language voice description
    Design(String),
    /// Speaker tags live in the text itself
    Dialogue,
}

impl VoiceSelector {
    pub fn mode(&self) -> GenerationMode {
        match self {
            VoiceSelector::Preset(_) => GenerationMode::Preset,
            VoiceSelector::Clone { .. } | VoiceSelector::Saved { .. } => GenerationMode::Clone,
            VoiceSelector::Design(_) => GenerationMode::Design,
            VoiceSelector::Dialogue => GenerationMode::Dialogue,
        }
    }

    pub fn saved(name: impl Into<String>) -> Self {
        VoiceSelector::Saved {
            name: name.into(),
            base_voice: None,
        }
    }

    /// Short label for logs and batch status lines
    pub fn label(&self) -> String {
        match self {
            VoiceSelector::Preset(voice) => voice.clone(),
            VoiceSelector::Clone { reference, .. } => format!("clone of {}", reference.display()),
            VoiceSelector::Saved { name, .. } => format!("saved voice '{}'", name),
            VoiceSelector::Design(_) => "designed voice".to_string(),
            VoiceSelector::Dialogue => "dialogue".to_string(),
        }
    }
}

/// Output container requested by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(OutputFormat::Wav),
            "mp3" => Ok(OutputFormat::Mp3),
            other => Err(format!("Unsupported output format: {}", other)),
        }
    }
}

/// Request to generate speech
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text to synthesize
    pub text: String,

    /// Registry name of the target model
    pub model: String,

    pub voice: VoiceSelector,

    /// Transcript of the reference audio, improves clone fidelity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_text: Option<String>,

    /// Playback-rate hint, 1.0 is normal speed
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Style instruction (emotion, delivery) for models that accept one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruct: Option<String>,

    /// Language hint for voice design, "auto" lets the model decide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_speed() -> f32 {
    1.0
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>, model: impl Into<String>, voice: VoiceSelector) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            voice,
            ref_text: None,
            speed: default_speed(),
            instruct: None,
            language: None,
            output_format: OutputFormat::Wav,
        }
    }

    pub fn preset(text: impl Into<String>, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self::new(text, model, VoiceSelector::Preset(voice.into()))
    }

    /// Clone request speaking with a saved profile: its model, reference
    /// recording and transcript. A `base_voice` given here wins over the
    /// profile's own.
    pub fn from_profile(
        text: impl Into<String>,
        profile: &VoiceProfile,
        base_voice: Option<String>,
    ) -> Self {
        let mut request = Self::new(
            text,
            profile.model.clone(),
            VoiceSelector::Clone {
                reference: profile.ref_audio_path.clone(),
                base_voice: base_voice.or_else(|| profile.base_voice.clone()),
            },
        );
        request.ref_text = profile.transcript().map(str::to_string);
        request
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_ref_text(mut self, ref_text: impl Into<String>) -> Self {
        self.ref_text = Some(ref_text.into());
        self
    }

    pub fn with_instruct(mut self, instruct: impl Into<String>) -> Self {
        self.instruct = Some(instruct.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn mode(&self) -> GenerationMode {
        self.voice.mode()
    }

    /// Trimmed transcript, `None` when blank
    pub fn transcript(&self) -> Option<&str> {
        self.ref_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// One unit of mono samples produced by a generation step
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Result of a generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAudio {
    /// Path to the generated audio file
    pub path: PathBuf,
    pub model: String,
    pub sample_rate: u32,
    pub num_samples: usize,
}

impl GeneratedAudio {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples as f64 / self.sample_rate as f64
    }
}
