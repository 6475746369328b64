use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// An external binary the studio shells out to
#[derive(Debug, Clone)]
pub struct ExternalTool {
    pub name: String,
    pub path: PathBuf,
    pub description: String,
    pub version: Option<Version>,
    pub min_version: Version,
}

impl ExternalTool {
    pub fn meets_min_version(&self) -> bool {
        self.version
            .as_ref()
            .map_or(true, |version| version >= &self.min_version)
    }

    /// One line for diagnostics output
    pub fn status_line(&self) -> String {
        let version = self
            .version
            .as_ref()
            .map_or_else(|| "version unknown".to_string(), Version::to_string);
        let mut line = format!(
            "{} {} at {} ({})",
            self.name,
            version,
            self.path.display(),
            self.description
        );
        if !self.meets_min_version() {
            line.push_str(&format!(", older than the supported {}", self.min_version));
        }
        line
    }
}

static FFMPEG_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ffmpeg version (\d+\.\d+(?:\.\d+)?)").expect("ffmpeg version pattern is valid")
});

// Looked up once per process
static FFMPEG: Lazy<Option<ExternalTool>> = Lazy::new(detect_ffmpeg);

/// Find ffmpeg on PATH and read its version
fn detect_ffmpeg() -> Option<ExternalTool> {
    let path = match which::which("ffmpeg") {
        Ok(path) => path,
        Err(_) => {
            warn!("ffmpeg not found in PATH, MP3 export and non-WAV fallback are disabled");
            return None;
        }
    };

    let version = ffmpeg_version_at(&path);
    match &version {
        Some(version) => info!("Found ffmpeg {} at {}", version, path.display()),
        None => info!("Found ffmpeg at {} (version unknown)", path.display()),
    }

    Some(ExternalTool {
        name: "ffmpeg".to_string(),
        path,
        description: "Audio encoder and converter".to_string(),
        version,
        min_version: Version::new(4, 0, 0),
    })
}

fn ffmpeg_version_at(path: &std::path::Path) -> Option<Version> {
    let output = Command::new(path)
        .arg("-version")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("ffmpeg -version exited with {}", output.status);
        return None;
    }

    parse_ffmpeg_version(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the first line of `ffmpeg -version`, padding missing components
pub fn parse_ffmpeg_version(output: &str) -> Option<Version> {
    let caps = FFMPEG_VERSION_RE.captures(output)?;
    let raw = caps.get(1)?.as_str();
    let normalized = match raw.split('.').count() {
        2 => format!("{}.0", raw),
        _ => raw.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// The ffmpeg install, if any
pub fn ffmpeg() -> Option<&'static ExternalTool> {
    FFMPEG.as_ref()
}
