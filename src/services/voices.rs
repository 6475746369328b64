use chrono::Utc;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{StudioError, StudioResult};
use crate::models::VoiceProfile;
use crate::services::audio::ensure_wav;

const MANIFEST_FILE: &str = "voice.json";
const REFERENCE_FILE: &str = "reference.wav";

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid pattern"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").expect("valid pattern"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid pattern"));

/// Directory-safe identifier for a display name
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = NON_WORD.replace_all(lowered.trim(), "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    HYPHEN_RUNS
        .replace_all(&hyphenated, "-")
        .trim_matches('-')
        .to_string()
}

/// Saved voices, one directory per profile under `root`
#[derive(Debug, Clone)]
pub struct VoiceLibrary {
    root: PathBuf,
}

impl VoiceLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a profile. Anything that is not already a slug (empty,
    /// `..`, separators, upper case) never resolves.
    fn voice_dir(&self, slug: &str) -> StudioResult<PathBuf> {
        if slug.is_empty() || slugify(slug) != slug {
            return Err(StudioError::NotFound(format!("Voice '{}' not found", slug)));
        }
        Ok(self.root.join(slug))
    }

    fn read_manifest(&self, slug: &str) -> StudioResult<VoiceProfile> {
        let dir = self.voice_dir(slug)?;
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(StudioError::NotFound(format!("Voice '{}' not found", slug)));
        }

        let mut profile: VoiceProfile = serde_json::from_str(&fs::read_to_string(manifest_path)?)?;
        profile.ref_audio_path = dir.join(REFERENCE_FILE);
        Ok(profile)
    }

    /// All saved voices, sorted by name ignoring case
    pub fn list(&self) -> StudioResult<Vec<VoiceProfile>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut voices = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().join(MANIFEST_FILE).is_file() {
                continue;
            }
            let slug = entry.file_name().to_string_lossy().into_owned();
            match self.read_manifest(&slug) {
                Ok(profile) => voices.push(profile),
                Err(e) => warn!("Skipping unreadable voice '{}': {}", slug, e),
            }
        }

        voices.sort_by_key(|v| v.name.to_lowercase());
        Ok(voices)
    }

    pub fn get(&self, slug: &str) -> StudioResult<VoiceProfile> {
        self.read_manifest(slug)
    }

    /// Look a voice up by slug, then by exact display name
    pub fn find(&self, name_or_slug: &str) -> StudioResult<VoiceProfile> {
        let key = name_or_slug.trim();
        if let Ok(dir) = self.voice_dir(key) {
            if dir.join(MANIFEST_FILE).is_file() {
                return self.read_manifest(key);
            }
        }

        self.list()?
            .into_iter()
            .find(|v| v.name == key)
            .ok_or_else(|| StudioError::NotFound(format!("Voice '{}' not found", name_or_slug)))
    }

    /// Store a new profile.
    ///
    /// The reference is normalised to WAV before it is copied in. An existing
    /// profile with the same slug is never touched.
    pub async fn save(
        &self,
        name: &str,
        ref_audio: &Path,
        ref_text: &str,
        model: &str,
        base_voice: Option<&str>,
    ) -> StudioResult<VoiceProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudioError::EmptyName);
        }
        let slug = slugify(name);
        let dir = self.voice_dir(&slug).map_err(|_| StudioError::EmptyName)?;
        if dir.exists() {
            return Err(StudioError::DuplicateName(name.to_string()));
        }

        let reference = ensure_wav(ref_audio).await?;

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir(&dir).await?;

        let profile = VoiceProfile {
            name: name.to_string(),
            slug: slug.clone(),
            ref_text: ref_text.trim().to_string(),
            model: model.to_string(),
            base_voice: base_voice.map(str::to_string),
            created_at: Utc::now(),
            ref_audio_path: dir.join(REFERENCE_FILE),
        };

        if let Err(e) = self.write_profile(&profile, &reference, &dir).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                warn!("Could not remove partial voice {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }

        info!("Saved voice '{}' as {}", profile.name, slug);
        Ok(profile)
    }

    async fn write_profile(
        &self,
        profile: &VoiceProfile,
        reference: &Path,
        dir: &Path,
    ) -> StudioResult<()> {
        tokio::fs::copy(reference, &profile.ref_audio_path).await?;
        let json = serde_json::to_string_pretty(profile)?;
        tokio::fs::write(dir.join(MANIFEST_FILE), json).await?;
        Ok(())
    }

    pub fn delete(&self, slug: &str) -> StudioResult<()> {
        let dir = self.voice_dir(slug)?;
        if !dir.is_dir() {
            return Err(StudioError::NotFound(format!("Voice '{}' not found", slug)));
        }
        fs::remove_dir_all(&dir)?;
        info!("Deleted voice {}", slug);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::audio::save_audio;

    fn reference(dir: &Path) -> PathBuf {
        let path = dir.join("ref.wav");
        save_audio(&vec![0.2; 2400], &path, 24000).unwrap();
        path
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  My Voice!  "), "my-voice");
        assert_eq!(slugify("Narrator__Two  -- x"), "narrator-two-x");
        assert_eq!(slugify("Émile's take"), "émiles-take");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("-dash-"), "dash");
    }

    #[tokio::test]
    async fn test_save_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path().join("voices"));
        let ref_audio = reference(dir.path());

        let saved = library
            .save("Zed Narrator", &ref_audio, " Hello there. ", "Qwen3-TTS-Base", None)
            .await
            .unwrap();
        assert_eq!(saved.slug, "zed-narrator");
        assert_eq!(saved.ref_text, "Hello there.");
        library
            .save("alice", &ref_audio, "", "CSM-1B", None)
            .await
            .unwrap();

        let fetched = library.get("zed-narrator").unwrap();
        assert_eq!(fetched.name, "Zed Narrator");
        assert!(fetched.ref_audio_path.is_file());
        assert_eq!(fetched.transcript(), Some("Hello there."));

        let names: Vec<_> = library.list().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["alice", "Zed Narrator"]);

        library.delete("alice").unwrap();
        assert!(matches!(library.get("alice"), Err(StudioError::NotFound(_))));
        assert!(matches!(library.delete("alice"), Err(StudioError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path().join("voices"));
        let ref_audio = reference(dir.path());

        library
            .save("My Voice", &ref_audio, "original", "Qwen3-TTS-Base", None)
            .await
            .unwrap();
        let err = library
            .save("my   voice!", &ref_audio, "replacement", "CSM-1B", None)
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::DuplicateName(_)));
        let kept = library.get("my-voice").unwrap();
        assert_eq!(kept.ref_text, "original");
        assert_eq!(kept.model, "Qwen3-TTS-Base");
    }

    #[tokio::test]
    async fn test_empty_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path());
        let ref_audio = reference(dir.path());

        for name in ["", "   ", "?!*"] {
            let err = library
                .save(name, &ref_audio, "", "CSM-1B", None)
                .await
                .unwrap_err();
            assert!(matches!(err, StudioError::EmptyName), "name {:?}", name);
        }
    }

    #[tokio::test]
    async fn test_missing_reference_leaves_no_directory() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path().join("voices"));

        let err = library
            .save("Ghost", &dir.path().join("missing.wav"), "", "CSM-1B", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::InvalidInput(_)));
        assert!(!dir.path().join("voices").join("ghost").exists());
    }

    #[tokio::test]
    async fn test_non_slug_keys_never_leave_the_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path().join("voices"));
        let ref_audio = reference(dir.path());
        library
            .save("Kept", &ref_audio, "", "CSM-1B", None)
            .await
            .unwrap();

        let sibling = dir.path().join("output");
        std::fs::create_dir(&sibling).unwrap();
        std::fs::write(sibling.join("keep.wav"), b"data").unwrap();
        // A manifest outside the library must not be readable through it
        std::fs::create_dir(dir.path().join("x")).unwrap();
        std::fs::write(dir.path().join("x").join(MANIFEST_FILE), "{}").unwrap();

        for key in ["..", "../output", "../x", ".", "kept/..", "/tmp", "Kept", ""] {
            assert!(
                matches!(library.delete(key), Err(StudioError::NotFound(_))),
                "delete {:?}",
                key
            );
            assert!(
                matches!(library.get(key), Err(StudioError::NotFound(_))),
                "get {:?}",
                key
            );
        }
        assert!(matches!(library.find("../x"), Err(StudioError::NotFound(_))));

        assert!(sibling.join("keep.wav").is_file());
        assert!(dir.path().join("voices").is_dir());
        assert_eq!(library.get("kept").unwrap().name, "Kept");
        // Display names still resolve through find
        assert_eq!(library.find("Kept").unwrap().slug, "kept");
    }

    #[tokio::test]
    async fn test_find_by_slug_then_name() {
        let dir = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(dir.path().join("voices"));
        let ref_audio = reference(dir.path());
        library
            .save("Deep Voice", &ref_audio, "", "CSM-1B", Some("conversational_a"))
            .await
            .unwrap();

        assert_eq!(library.find("deep-voice").unwrap().name, "Deep Voice");
        assert_eq!(library.find("Deep Voice").unwrap().slug, "deep-voice");
        assert_eq!(
            library.find("Deep Voice").unwrap().base_voice.as_deref(),
            Some("conversational_a")
        );
        assert!(matches!(library.find("deep"), Err(StudioError::NotFound(_))));
    }
}
