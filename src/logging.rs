//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for command output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `log_level` (e.g. `"debug"`, `"portfolio_rag=trace"`) wins over `RUST_LOG`,
/// which wins over the default `info`. Colors are off when `no_color` is set
/// or `NO_COLOR` is present in the environment.
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> Result<()> {
    let filter = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    };
    let env_filter =
        EnvFilter::try_new(&filter).map_err(|e| anyhow!("Invalid log filter: {}", e))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to init logging: {}", e))?;

    Ok(())
}
