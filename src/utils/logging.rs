use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

/// Log file prefix of the long running `track` command.
pub const TRACK_PREFIX: &str = "track";
/// Log file prefix of the one shot actions.
pub const CLI_PREFIX: &str = "cli";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Sets up logging into daily rotated files in `logs_dir`. With `verbose` everything down to trace
/// is logged and mirrored to stderr, otherwise `RUST_LOG` or info decides and the console stays
/// quiet. Stderr keeps logs out of reports piped from stdout.
pub fn enable_logging(prefix: &str, logs_dir: &Path, verbose: bool) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(logs_dir)?;

    let stderr = std::io::stderr.with_filter(move |_| verbose);
    let level = if verbose {
        LevelFilter::TRACE.to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(&level))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .pretty()
        .init();
    Ok(())
}

/// Logs of dependencies are left out, only this crate's targets pass.
fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace('-', "_")
    ))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
