use tracing::Level;

/// Map a textual level from configuration onto a `tracing::Level`.
///
/// Unknown values fall back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Initialize tracing for the relay at the given level.
///
/// Uses `try_init` so tests and the binary can call this more than once.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init();
}
