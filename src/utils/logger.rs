use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

const DEFAULT_FILTER: &str = "warn,tts_studio=info";

/// Set up `log` output on stderr. `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    init_with_filter(DEFAULT_FILTER);
}

/// Same as `init_logger` with a different fallback filter, used by `--verbose`
pub fn init_with_filter(default_filter: &str) {
    let mut builder = clamped_builder();
    builder.parse_env(Env::default().filter_or("RUST_LOG", default_filter));

    // A second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}

/// Stderr builder with the chatty dependencies held down. Filters parsed
/// afterwards replace these for any module they name.
fn clamped_builder() -> Builder {
    let mut builder = Builder::new();

    // HTTP plumbing is chatty at debug
    builder
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("rustls", LevelFilter::Warn)
        .filter_module("mio", LevelFilter::Error)
        .filter_module("tokio_util", LevelFilter::Error)
        .filter_module("symphonia_core", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);
    builder
}
