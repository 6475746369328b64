//! Command line interface for the studio

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::{GenerationMode, OutputFormat, VoiceSelector};
use crate::services::compare::CompareSlot;

/// Prefix that marks a voice argument as a saved profile
pub const SAVED_PREFIX: &str = "saved:";

/// Local text-to-speech studio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file, defaults to the per-user one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Speak text with a preset or saved voice
    Speak(SpeakCommand),

    /// Clone a voice from a reference recording
    Clone(CloneCommand),

    /// Speak with a voice described in words
    Design(DesignCommand),

    /// Render a tagged multi-speaker script
    Dialogue(DialogueCommand),

    /// Turn an EPUB or text file into one audio file per chapter
    Audiobook(AudiobookCommand),

    /// Show the chapters found in a book
    Chapters(ChaptersCommand),

    /// Same text through up to four voices
    Compare(CompareCommand),

    /// Manage saved voices
    #[command(subcommand)]
    Voices(VoicesCommand),

    /// List models and their capabilities
    Models {
        /// Only models usable for this mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Also list each model's preset voices
        #[arg(long)]
        voices: bool,
    },

    /// Check the inference server and the MP3 encoder
    Check,

    /// Write a config file with default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Generation mode filter for `models`
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeArg {
    Preset,
    Clone,
    Design,
    Dialogue,
}

impl From<ModeArg> for GenerationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Preset => GenerationMode::Preset,
            ModeArg::Clone => GenerationMode::Clone,
            ModeArg::Design => GenerationMode::Design,
            ModeArg::Dialogue => GenerationMode::Dialogue,
        }
    }
}

/// Audio container for results
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    Wav,
    Mp3,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wav => OutputFormat::Wav,
            FormatArg::Mp3 => OutputFormat::Mp3,
        }
    }
}

#[derive(Parser, Debug)]
pub struct SpeakCommand {
    /// Text to speak
    pub text: String,

    #[arg(short, long, default_value = "Kokoro-82M")]
    pub model: String,

    /// Preset voice id, or `saved:<name>` for a library voice
    #[arg(long, default_value = "af_heart")]
    pub voice: String,

    /// Base speaker for saved voices on CustomVoice models
    #[arg(long)]
    pub base_voice: Option<String>,

    /// Playback speed, Kokoro only
    #[arg(short, long, default_value_t = 1.0)]
    pub speed: f32,

    /// Style instruction, CustomVoice models only
    #[arg(long)]
    pub instruct: Option<String>,

    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: FormatArg,
}

#[derive(Parser, Debug)]
pub struct CloneCommand {
    pub text: String,

    /// Reference recording, any format the decoder or ffmpeg understands
    #[arg(short, long)]
    pub reference: PathBuf,

    /// What is said in the reference recording
    #[arg(long)]
    pub ref_text: Option<String>,

    #[arg(short, long, default_value = "Qwen3-TTS-Base")]
    pub model: String,

    #[arg(long)]
    pub base_voice: Option<String>,

    #[arg(long)]
    pub instruct: Option<String>,

    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: FormatArg,
}

#[derive(Parser, Debug)]
pub struct DesignCommand {
    pub text: String,

    /// Voice description, e.g. "a calm elderly narrator"
    #[arg(short, long)]
    pub description: String,

    /// Language name, or "auto"
    #[arg(short, long)]
    pub language: Option<String>,

    #[arg(short, long, default_value = "Qwen3-TTS-VoiceDesign")]
    pub model: String,

    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: FormatArg,
}

#[derive(Parser, Debug)]
pub struct DialogueCommand {
    /// Script with [S1]/[S2] speaker tags
    pub script: String,

    #[arg(short, long, default_value = "Dia-1.6B")]
    pub model: String,

    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: FormatArg,
}

#[derive(Parser, Debug)]
pub struct AudiobookCommand {
    /// .epub or .txt file
    pub book: PathBuf,

    /// Chapter numbers to render, all when omitted
    #[arg(long, value_delimiter = ',')]
    pub chapters: Option<Vec<usize>>,

    #[arg(short, long, default_value = "Kokoro-82M")]
    pub model: String,

    /// Preset voice id, or `saved:<name>`
    #[arg(long, default_value = "af_heart")]
    pub voice: String,

    #[arg(short, long, default_value_t = 1.0)]
    pub speed: f32,
}

#[derive(Parser, Debug)]
pub struct ChaptersCommand {
    pub book: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CompareCommand {
    pub text: String,

    /// `model=voice`, repeat up to four times. Voices may be `saved:<name>`.
    #[arg(long = "slot", required = true, value_parser = parse_slot)]
    pub slots: Vec<CompareSlot>,

    #[arg(short, long, value_enum, default_value = "wav")]
    pub format: FormatArg,
}

#[derive(Subcommand, Debug)]
pub enum VoicesCommand {
    /// List saved voices
    List,

    /// Save a reference recording as a named voice
    Save {
        name: String,

        #[arg(short, long)]
        reference: PathBuf,

        /// Transcript of the reference
        #[arg(long, default_value = "")]
        ref_text: String,

        #[arg(short, long, default_value = "Qwen3-TTS-Base")]
        model: String,

        #[arg(long)]
        base_voice: Option<String>,
    },

    /// Delete a saved voice
    Delete { name: String },
}

/// Map a voice argument onto a selector: `saved:<name>` or a preset id
pub fn parse_voice(voice: &str, base_voice: Option<String>) -> VoiceSelector {
    match voice.strip_prefix(SAVED_PREFIX) {
        Some(name) => VoiceSelector::Saved {
            name: name.trim().to_string(),
            base_voice,
        },
        None => VoiceSelector::Preset(voice.to_string()),
    }
}

fn parse_slot(arg: &str) -> Result<CompareSlot, String> {
    let (model, voice) = arg
        .split_once('=')
        .ok_or_else(|| format!("Expected model=voice, got '{}'", arg))?;
    let (model, voice) = (model.trim(), voice.trim());
    if model.is_empty() || voice.is_empty() {
        return Err(format!("Expected model=voice, got '{}'", arg));
    }
    Ok(CompareSlot::new(model, parse_voice(voice, None)))
}
