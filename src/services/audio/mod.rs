// Audio assembly: WAV persistence, merging and format conversion

pub mod convert;
pub mod merge;
pub mod tools;
pub mod wav;

pub use convert::{convert_to_mp3, ensure_wav, ensure_wav_in, maybe_convert};
pub use merge::{merge_audio_files, merge_samples, silence_len};
pub use tools::{ExternalTool, ffmpeg};
pub use wav::{read_audio, save_audio};
