use log::info;

use crate::cli::{ChaptersCommand, VoicesCommand};
use crate::commands::Studio;
use crate::errors::StudioResult;
use crate::services::documents::parse_file;
use crate::services::voices::slugify;

pub async fn voices(studio: &Studio, cmd: VoicesCommand) -> StudioResult<()> {
    let library = studio.orchestrator.voices();
    match cmd {
        VoicesCommand::List => {
            let profiles = library.list()?;
            if profiles.is_empty() {
                println!("No saved voices in {}", library.root().display());
            }
            for profile in profiles {
                let base = profile
                    .base_voice
                    .as_deref()
                    .map(|b| format!(", base {}", b))
                    .unwrap_or_default();
                println!(
                    "{:<24} {:<28} saved {}{}",
                    profile.name,
                    profile.model,
                    profile.created_at.format("%Y-%m-%d %H:%M"),
                    base
                );
            }
        }
        VoicesCommand::Save {
            name,
            reference,
            ref_text,
            model,
            base_voice,
        } => {
            // Fail on an unknown model before anything is copied
            studio.orchestrator.registry().require(&model)?;
            let profile = library
                .save(&name, &reference, &ref_text, &model, base_voice.as_deref())
                .await?;
            println!("Saved '{}' as {}", profile.name, profile.slug);
        }
        VoicesCommand::Delete { name } => {
            let slug = match library.find(&name) {
                Ok(profile) => profile.slug,
                Err(_) => slugify(&name),
            };
            library.delete(&slug)?;
            info!("Deleted voice {}", slug);
            println!("Deleted {}", slug);
        }
    }
    Ok(())
}

pub fn chapters(cmd: ChaptersCommand) -> StudioResult<()> {
    let chapters = parse_file(&cmd.book)?;
    for chapter in &chapters {
        println!(
            "{:>3}  {}  ({} chars)",
            chapter.order,
            chapter.title,
            chapter.content.chars().count()
        );
    }
    println!("{} chapters", chapters.len());
    Ok(())
}
