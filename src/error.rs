//! Failures reported by host schedulers and the configuration layer.

use std::fmt;
use std::time::Duration;

/// A failure of the host scheduler, passed through unchanged as the output of
/// a [crate::suspension::Suspension].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
	/// No host was current on this thread when the callback was registered
	NoHost,
	/// The host does not render, so there is no next frame to wait for
	NoFrames,
	/// The host cannot represent a deadline this far in the future
	InvalidDelay(Duration),
	/// The host discarded the callback without ever running it
	Dropped,
	/// The host has no queued work, no timers, no frames and received no wake
	/// within its stall timeout
	Stalled,
}
impl fmt::Display for HostError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoHost => write!(f, "no host scheduler is current on this thread"),
			Self::NoFrames => write!(f, "the host does not produce rendering frames"),
			Self::InvalidDelay(d) => write!(f, "the host cannot schedule a timer {d:?} ahead"),
			Self::Dropped => write!(f, "the host dropped the callback without running it"),
			Self::Stalled => write!(
				f,
				"a task is waiting, but there are no timers, frames or wakers to resume it"
			),
		}
	}
}
impl std::error::Error for HostError {}

/// An environment variable held a value [crate::config::LoopConfig] could not
/// parse
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
	pub var: &'static str,
	pub value: String,
	pub reason: &'static str,
}
impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}={:?}: {}", self.var, self.value, self.reason)
	}
}
impl std::error::Error for ConfigError {}
