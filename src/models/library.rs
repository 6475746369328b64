use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Saved reference voice, stored as `voices/<slug>/voice.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceProfile {
    pub name: String,
    pub slug: String,

    /// Transcript of the reference recording, empty when unknown
    #[serde(default)]
    pub ref_text: String,

    /// Model the profile was recorded for
    pub model: String,

    #[serde(default)]
    pub base_voice: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Filled in on lookup, never written to the manifest
    #[serde(skip)]
    pub ref_audio_path: PathBuf,
}

impl VoiceProfile {
    pub fn transcript(&self) -> Option<&str> {
        let text = self.ref_text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// One chapter of a parsed document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    /// Zero-based position in the document
    pub order: usize,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>, order: usize) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            order,
        }
    }

    /// "3: Title" style label used in listings and status logs
    pub fn label(&self) -> String {
        format!("{}: {}", self.order, self.title)
    }
}
