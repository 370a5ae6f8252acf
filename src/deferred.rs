//! Suspensions tied to one checkpoint of the current [crate::host::Host]'s
//! cycle. Each factory registers exactly one callback and nothing else, on the
//! host that is current when the suspension is first polled, so the
//! suspension may be built before a host is entered. The returned
//! [Suspension] cannot be reset or reused.

use std::time::{Duration, Instant};

use crate::suspension::Suspension;

/// Completes at the next microtask checkpoint
pub fn microtask() -> Suspension<()> {
	Suspension::on_host(|host, res| {
		host.queue_microtask(Box::new(move || res.resolve(())));
		Ok(())
	})
}

/// Completes at the next macrotask checkpoint, after every microtask queued
/// before it
pub fn macrotask() -> Suspension<()> {
	Suspension::on_host(|host, res| {
		host.queue_macrotask(Box::new(move || res.resolve(())));
		Ok(())
	})
}

/// Completes on the next rendering frame with its timestamp. Fails with
/// [crate::error::HostError::NoFrames] on hosts that don't render.
pub fn animation_frame() -> Suspension<Instant> {
	Suspension::on_host(|host, res| host.request_frame(Box::new(move |ts| res.resolve(ts))))
}

/// Completes no earlier than `delay` from now. Delays the host cannot
/// schedule fail with the host's own error.
pub fn timeout(delay: Duration) -> Suspension<()> {
	Suspension::on_host(move |host, res| host.set_timeout(delay, Box::new(move || res.resolve(()))))
}
