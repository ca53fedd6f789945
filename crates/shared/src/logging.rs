use log::LevelFilter;

/// Modules that are too chatty at the dashboard's default level.
const QUIET_MODULES: [&str; 3] = ["actix_server", "reqwest", "hyper"];

/// Maps a `LOG_LEVEL` value to a filter. Case-insensitive; anything
/// unrecognised falls back to INFO.
pub fn level_filter_from_str(level: &str) -> LevelFilter {
    match level.trim().to_uppercase().as_str() {
        "OFF" => LevelFilter::Off,
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "INFO" => LevelFilter::Info,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

pub fn init_logging(level: &str) {
    let level_filter = level_filter_from_str(level);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level_filter);
    for module in QUIET_MODULES {
        builder.filter_module(module, level_filter.min(LevelFilter::Warn));
    }

    // A second call (tests, embedding) keeps the first logger.
    if builder.try_init().is_ok() {
        log::debug!("Logging initialized at {}", level_filter);
    }
}
