//! Settings for [crate::event_loop::EventLoop]

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::LogStrategy;

pub const FRAME_HZ_VAR: &str = "ASYNC_HELPERS_FRAME_HZ";
pub const STALL_MS_VAR: &str = "ASYNC_HELPERS_STALL_MS";
pub const LOG_VAR: &str = "ASYNC_HELPERS_LOG";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopConfig {
	/// Time between rendering frames. [None] makes the loop a non-rendering
	/// host where frame requests fail.
	pub frame_interval: Option<Duration>,
	/// How long the loop waits for an outside wake when it has nothing else to
	/// do before giving up. [None] waits forever.
	pub stall_timeout: Option<Duration>,
	pub log: LogStrategy,
}
impl LoopConfig {
	pub fn frame_interval(self, frame_interval: Option<Duration>) -> Self {
		Self { frame_interval, ..self }
	}
	pub fn stall_timeout(self, stall_timeout: Option<Duration>) -> Self {
		Self { stall_timeout, ..self }
	}
	pub fn log(self, log: LogStrategy) -> Self { Self { log, ..self } }

	/// Override the defaults with any of the variables [FRAME_HZ_VAR],
	/// [STALL_MS_VAR] and [LOG_VAR] that are set. A frame rate of 0 disables
	/// frames.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| env::var(var).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
		let mut cfg = Self::default();
		if let Some(value) = lookup(FRAME_HZ_VAR) {
			cfg.frame_interval = match parse_num(FRAME_HZ_VAR, value)? {
				0 => None,
				hz => Some(Duration::from_secs(1) / hz),
			};
		}
		if let Some(value) = lookup(STALL_MS_VAR) {
			cfg.stall_timeout = Some(Duration::from_millis(parse_num(STALL_MS_VAR, value)?.into()));
		}
		if let Some(value) = lookup(LOG_VAR) {
			cfg.log = match value.trim() {
				"" => return Err(ConfigError { var: LOG_VAR, value, reason: "empty log target" }),
				"stderr" => LogStrategy::StdErr,
				"discard" => LogStrategy::Discard,
				path => LogStrategy::File(PathBuf::from(path)),
			};
		}
		Ok(cfg)
	}
}
impl Default for LoopConfig {
	fn default() -> Self {
		Self {
			frame_interval: Some(Duration::from_secs(1) / 60),
			stall_timeout: None,
			log: LogStrategy::StdErr,
		}
	}
}

fn parse_num(var: &'static str, value: String) -> Result<u32, ConfigError> {
	match value.trim().parse() {
		Ok(n) => Ok(n),
		Err(_) => Err(ConfigError { var, value, reason: "expected a non-negative integer" }),
	}
}
