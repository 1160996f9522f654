use alloy_primitives::I256;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use yansi::Paint;

/// Installs the global tracing subscriber, writing to stderr.
pub fn subscriber(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Formats a balance delta with an explicit sign, gains in green and losses in red.
pub fn format_delta(delta: I256) -> String {
    if delta.is_negative() {
        delta.red().to_string()
    } else if delta.is_zero() {
        delta.dim().to_string()
    } else {
        format!("+{delta}").green().to_string()
    }
}
