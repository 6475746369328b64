use crate::cli::{CloneCommand, DesignCommand, DialogueCommand, SpeakCommand, parse_voice};
use crate::commands::Studio;
use crate::errors::StudioResult;
use crate::models::{GeneratedAudio, GenerationRequest, VoiceSelector};

fn print_result(audio: &GeneratedAudio) {
    println!(
        "{} ({:.1}s, {})",
        audio.path.display(),
        audio.duration_secs(),
        audio.model
    );
}

pub async fn speak(studio: &Studio, cmd: SpeakCommand) -> StudioResult<()> {
    let mut request = GenerationRequest::new(
        cmd.text,
        cmd.model,
        parse_voice(&cmd.voice, cmd.base_voice),
    )
    .with_speed(cmd.speed)
    .with_format(cmd.format.into());
    if let Some(instruct) = cmd.instruct {
        request = request.with_instruct(instruct);
    }

    let audio = studio.orchestrator.generate(&request).await?;
    print_result(&audio);
    Ok(())
}

pub async fn clone(studio: &Studio, cmd: CloneCommand) -> StudioResult<()> {
    let mut request = GenerationRequest::new(
        cmd.text,
        cmd.model,
        VoiceSelector::Clone {
            reference: cmd.reference,
            base_voice: cmd.base_voice,
        },
    )
    .with_format(cmd.format.into());
    if let Some(ref_text) = cmd.ref_text {
        request = request.with_ref_text(ref_text);
    }
    if let Some(instruct) = cmd.instruct {
        request = request.with_instruct(instruct);
    }

    let audio = studio.orchestrator.generate(&request).await?;
    print_result(&audio);
    Ok(())
}

pub async fn design(studio: &Studio, cmd: DesignCommand) -> StudioResult<()> {
    let mut request =
        GenerationRequest::new(cmd.text, cmd.model, VoiceSelector::Design(cmd.description))
            .with_format(cmd.format.into());
    if let Some(language) = cmd.language {
        request = request.with_language(language);
    }

    let audio = studio.orchestrator.generate(&request).await?;
    print_result(&audio);
    Ok(())
}

pub async fn dialogue(studio: &Studio, cmd: DialogueCommand) -> StudioResult<()> {
    let request = GenerationRequest::new(cmd.script, cmd.model, VoiceSelector::Dialogue)
        .with_format(cmd.format.into());
    let audio = studio.orchestrator.generate(&request).await?;
    print_result(&audio);
    Ok(())
}
