//! Common utility functions used across the studio

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{StudioError, StudioResult};

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds since the epoch, strictly increasing within the process.
///
/// Two calls in the same millisecond get consecutive values.
pub fn timestamp_ms() -> u64 {
    let now = now_ms();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// `{dir}/{prefix}_{timestamp}.{ext}`
pub fn output_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", prefix, timestamp_ms(), ext))
}

/// Run blocking file or codec work on the blocking thread pool
pub async fn run_blocking<T, F>(task: &str, f: F) -> StudioResult<T>
where
    F: FnOnce() -> StudioResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StudioError::RuntimeFailure(format!("{} task failed: {}", task, e)))?
}

/// Check if a file exists and has valid content (non-zero size)
pub fn file_exists_and_valid(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
