// Domain models module
// Contains core data structures used throughout the application

pub mod tts;
pub mod library;

pub use tts::{
    AudioSegment, GeneratedAudio, GenerationMode, GenerationRequest, OutputFormat, VoiceSelector,
};
pub use library::{Chapter, VoiceProfile};
