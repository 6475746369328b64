use clap::Parser;

use tts_studio::cli::Cli;
use tts_studio::commands;
use tts_studio::utils::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        logger::init_with_filter("info,tts_studio=debug");
    } else {
        logger::init_logger();
    }

    if let Err(e) = commands::dispatch(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
