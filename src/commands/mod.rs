// Command handlers for the CLI, grouped by area
pub mod batch_commands;
pub mod library_commands;
pub mod tts_commands;
pub mod utility_commands;

use log::debug;
use std::sync::Arc;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::config::registry::ModelRegistry;
use crate::errors::StudioResult;
use crate::services::cache::ModelCache;
use crate::services::engine::RemoteLoader;
use crate::services::orchestrator::Orchestrator;
use crate::services::voices::VoiceLibrary;

/// Everything a command needs, built once per invocation
pub struct Studio {
    pub config: Arc<AppConfig>,
    pub loader: Arc<RemoteLoader>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Studio {
    pub fn open(config: AppConfig) -> StudioResult<Self> {
        config.ensure_dirs()?;
        let config = Arc::new(config);

        let loader = Arc::new(RemoteLoader::new(
            &config.inference_endpoint,
            config.request_timeout_secs,
        )?);
        let cache = Arc::new(ModelCache::new(
            Arc::new(ModelRegistry::builtin()),
            loader.clone(),
            config.max_cached_models,
        )?);
        let voices = Arc::new(VoiceLibrary::new(config.voices_dir.clone()));
        debug!("Using inference server at {}", loader.endpoint());

        Ok(Self {
            orchestrator: Arc::new(Orchestrator::new(config.clone(), cache, voices)),
            loader,
            config,
        })
    }
}

/// Run one parsed command line
pub async fn dispatch(cli: Cli) -> StudioResult<()> {
    if let Commands::InitConfig { force } = &cli.command {
        return utility_commands::init_config(cli.config.as_deref(), *force);
    }

    let studio = Studio::open(AppConfig::load(cli.config.as_deref())?)?;
    match cli.command {
        Commands::Speak(cmd) => tts_commands::speak(&studio, cmd).await,
        Commands::Clone(cmd) => tts_commands::clone(&studio, cmd).await,
        Commands::Design(cmd) => tts_commands::design(&studio, cmd).await,
        Commands::Dialogue(cmd) => tts_commands::dialogue(&studio, cmd).await,
        Commands::Audiobook(cmd) => batch_commands::audiobook(&studio, cmd).await,
        Commands::Compare(cmd) => batch_commands::compare(&studio, cmd).await,
        Commands::Chapters(cmd) => library_commands::chapters(cmd),
        Commands::Voices(cmd) => library_commands::voices(&studio, cmd).await,
        Commands::Models { mode, voices } => {
            utility_commands::models(&studio, mode.map(Into::into), voices)
        }
        Commands::Check => utility_commands::check(&studio).await,
        Commands::InitConfig { .. } => Ok(()),
    }
}
