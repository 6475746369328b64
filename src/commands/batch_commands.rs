use log::error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cli::{AudiobookCommand, CompareCommand, parse_voice};
use crate::commands::Studio;
use crate::errors::{StudioError, StudioResult};
use crate::services::audiobook::{AudiobookPipeline, AudiobookRequest};
use crate::services::compare::{CompareRequest, VoiceComparison};
use crate::services::documents::parse_file;
use crate::services::progress::ProgressUpdate;
use crate::utils::common::file_exists_and_valid;

/// Print progress to stderr until the sender side is dropped
fn spawn_progress_printer() -> (mpsc::Sender<ProgressUpdate>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            match update {
                ProgressUpdate::Started { total } => eprintln!("Queued {} items", total),
                ProgressUpdate::LoadingModel(model) => eprintln!("Loading {}...", model),
                ProgressUpdate::ItemStarted { index, total, label } => {
                    eprintln!("[{}/{}] {}", index + 1, total, label)
                }
                ProgressUpdate::Chunk { current, total } => eprintln!("  chunk {}/{}", current, total),
                ProgressUpdate::ItemCompleted { label, .. } => eprintln!("  done: {}", label),
                ProgressUpdate::ItemFailed { label, reason, .. } => {
                    eprintln!("  failed: {}: {}", label, reason)
                }
                ProgressUpdate::Packaging => eprintln!("Packaging..."),
                ProgressUpdate::Completed => eprintln!("Finished"),
            }
        }
    });
    (tx, printer)
}

async fn finish_printer(tx: mpsc::Sender<ProgressUpdate>, printer: JoinHandle<()>) {
    drop(tx);
    if let Err(e) = printer.await {
        error!("Progress printer failed: {}", e);
    }
}

pub async fn audiobook(studio: &Studio, cmd: AudiobookCommand) -> StudioResult<()> {
    if !file_exists_and_valid(&cmd.book) {
        return Err(StudioError::InvalidInput(format!(
            "Book not found or empty: {}",
            cmd.book.display()
        )));
    }

    let request = AudiobookRequest {
        chapters: parse_file(&cmd.book)?,
        selection: cmd.chapters,
        model: cmd.model,
        voice: parse_voice(&cmd.voice, None),
        speed: cmd.speed,
    };

    let pipeline = AudiobookPipeline::new(studio.orchestrator.clone());
    let (tx, printer) = spawn_progress_printer();
    let result = pipeline.run(&request, Some(&tx)).await;
    finish_printer(tx, printer).await;

    let report = result?;
    println!("{}", report.log_text());
    println!("{}", report.archive.display());
    Ok(())
}

pub async fn compare(studio: &Studio, cmd: CompareCommand) -> StudioResult<()> {
    let request = CompareRequest {
        text: cmd.text,
        slots: cmd.slots,
        output_format: cmd.format.into(),
    };

    let comparison = VoiceComparison::new(studio.orchestrator.clone());
    let (tx, printer) = spawn_progress_printer();
    let result = comparison.run(&request, Some(&tx)).await;
    finish_printer(tx, printer).await;

    let report = result?;
    for (i, output) in report.outputs.iter().enumerate() {
        match output {
            Some(audio) => println!("Voice {}: {}", i + 1, audio.path.display()),
            None => println!("Voice {}: -", i + 1),
        }
    }
    for failure in &report.failures {
        eprintln!("{}", failure);
    }
    Ok(())
}
