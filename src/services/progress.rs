use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

/// Progress of a batch run (audiobook or comparison)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProgressUpdate {
    /// Run accepted, `total` items queued
    Started { total: usize },
    /// A cold model load is about to happen
    LoadingModel(String),
    /// Item `index` (zero-based) of `total` began
    ItemStarted { index: usize, total: usize, label: String },
    /// Chunk `current` (one-based) of `total` inside the current item
    Chunk { current: usize, total: usize },
    ItemCompleted { index: usize, label: String },
    ItemFailed { index: usize, label: String, reason: String },
    /// Writing the final archive
    Packaging,
    Completed,
}

/// Send an update if anyone is listening. A closed receiver is not an error.
pub async fn report(sender: Option<&Sender<ProgressUpdate>>, update: ProgressUpdate) {
    if let Some(sender) = sender {
        if sender.send(update).await.is_err() {
            debug!("Progress receiver dropped");
        }
    }
}
