// Services module
// Business logic, one file or directory per concern

pub mod archive; // ZIP packaging
pub mod audio; // WAV IO, merging, format conversion
pub mod audiobook; // Chapter-by-chapter batch generation
pub mod cache; // Bounded LRU of loaded models
pub mod compare; // Side-by-side voice comparison
pub mod documents; // EPUB and plain-text chapter extraction
pub mod engine; // Model runtime seam
pub mod orchestrator; // Single-request generation driver
pub mod progress; // Batch progress events
pub mod text; // Sentence splitting and chunking
pub mod voices; // Saved voice profiles

#[cfg(test)]
pub(crate) mod tests;
