use std::error::Error;
use std::path::Path;

use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_FILE_PREFIX: &str = "activity-timer";
const MAX_LOG_FILES: usize = 5;

/// Sends logs to a daily rolling file under `<state_dir>/logs`, and to stderr
/// when `show_stderr` is set. `RUST_LOG` overrides `level`.
pub fn enable_logging(state_dir: &Path, level: &str, show_stderr: bool) -> Result<(), Box<dyn Error>> {
	let appender = tracing_appender::rolling::Builder::new()
		.rotation(Rotation::DAILY)
		.max_log_files(MAX_LOG_FILES)
		.filename_prefix(LOG_FILE_PREFIX)
		.build(state_dir.join("logs"))?;

	let stderr = std::io::stderr.with_filter(move |_| show_stderr);

	tracing_subscriber::fmt()
		.with_env_filter(log_filter(level))
		.with_ansi(false)
		.with_writer(stderr.and(appender))
		.try_init()
		.map_err(|err| -> Box<dyn Error> { err })?;
	Ok(())
}

/// `RUST_LOG` when it is set and valid, otherwise `level` for this crate only.
fn log_filter(level: &str) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(level))
}

fn crate_filter(level: &str) -> EnvFilter {
	EnvFilter::new(format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_")))
}

#[cfg(test)]
pub static TEST_LOGGING: std::sync::LazyLock<()> = std::sync::LazyLock::new(|| {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::level_filters::LevelFilter::TRACE)
		.with_test_writer()
		.try_init();
});
