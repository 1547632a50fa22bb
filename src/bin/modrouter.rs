use modrouter::cli::run_cli;
use modrouter::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    // CLI output goes to stdout; keep logs quiet unless asked for
    let mut log_config = LogConfig::from_env();
    if std::env::var("MODROUTER_LOG_LEVEL").is_err() {
        log_config.log_level = "warn".to_string();
    }
    init_logging_with_config(&log_config)?;
    run_cli()
}
