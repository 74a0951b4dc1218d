use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,godot_assistant=info,docs_indexer=info";

/// Sets up the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Diagnostics go to stderr so they never mix with chat output.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(e) = result {
        eprintln!("Logger already initialized: {}", e);
    }
}
