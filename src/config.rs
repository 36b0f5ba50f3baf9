use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::ticker::DEFAULT_TICK;

const APP_DIR_NAME: &str = "activity_timer";
const CONFIG_FILE: &str = "config.toml";
const STATE_DIR_ENV: &str = "ACTIVITY_TIMER_STATE_DIR";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse config {path}: {source}")]
	Decode {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("tick_millis must be positive")]
	ZeroTick,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub state_dir: Option<PathBuf>,
	pub tick_millis: u64,
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			state_dir: None,
			tick_millis: DEFAULT_TICK.as_millis() as u64,
			log_level: DEFAULT_LOG_LEVEL.to_string(),
		}
	}
}

impl Config {
	pub fn tick(&self) -> Duration {
		Duration::from_millis(self.tick_millis)
	}
}

/// Settings resolved from the command line, the config file and the
/// environment, in that order of precedence.
#[derive(Debug, Clone)]
pub struct Settings {
	pub state_dir: PathBuf,
	pub config: Config,
}

pub fn resolve_settings(
	cli_state_dir: Option<PathBuf>,
	cli_config: Option<PathBuf>,
) -> Result<Settings, ConfigError> {
	let cli_state_dir = cli_state_dir.map(absolutize);
	let config_path = match cli_config {
		Some(path) => absolutize(path),
		None => cli_state_dir
			.clone()
			.unwrap_or_else(default_state_dir)
			.join(CONFIG_FILE),
	};
	let config = load_config(&config_path)?;

	let state_dir = cli_state_dir
		.or_else(|| config.state_dir.clone().map(absolutize))
		.unwrap_or_else(default_state_dir);

	Ok(Settings { state_dir, config })
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
		Err(source) => {
			return Err(ConfigError::Io {
				path: path.to_path_buf(),
				source,
			});
		}
	};

	let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Decode {
		path: path.to_path_buf(),
		source,
	})?;
	if config.tick_millis == 0 {
		return Err(ConfigError::ZeroTick);
	}

	Ok(config)
}

fn default_state_dir() -> PathBuf {
	if let Some(path) = env::var_os(STATE_DIR_ENV) {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR_NAME);
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR_NAME);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join(APP_DIR_NAME);
	}

	PathBuf::from(format!(".{APP_DIR_NAME}"))
}

fn absolutize(path: PathBuf) -> PathBuf {
	if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	}
}
