//! The deferred completion capability. A [Host] is whatever drives the
//! cooperative schedule: the bundled [crate::event_loop::EventLoop], a tokio
//! `LocalSet` or anything else that can run callbacks at the four checkpoints.
//!
//! Functions that need a host find it through [current]. A host becomes
//! current on a thread for the lifetime of the guard returned by [enter].

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::LocalBoxFuture;

use crate::error::HostError;
use crate::logging::Logger;

pub type Callback = Box<dyn FnOnce()>;
pub type FrameCallback = Box<dyn FnOnce(Instant)>;

pub trait Host {
	/// Run after the currently executing code unwinds, before any macrotask
	fn queue_microtask(&self, cb: Callback);
	/// Run after all queued microtasks have drained
	fn queue_macrotask(&self, cb: Callback);
	/// Run on the next rendering frame with the frame's timestamp
	fn request_frame(&self, cb: FrameCallback) -> Result<(), HostError>;
	/// Run as a macrotask no earlier than `delay` from now
	fn set_timeout(&self, delay: Duration, cb: Callback) -> Result<(), HostError>;
	/// Drive a detached task to completion
	fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
	fn logger(&self) -> &Logger;
}

thread_local! {
	static CURRENT: RefCell<Option<Rc<dyn Host>>> = const { RefCell::new(None) };
}

/// The host made current on this thread by the innermost live [HostGuard]
pub fn current() -> Option<Rc<dyn Host>> { CURRENT.with(|c| c.borrow().clone()) }

/// Make `host` current until the guard is dropped. Guards nest; dropping one
/// restores whichever host was current when it was created.
pub fn enter(host: Rc<dyn Host>) -> HostGuard {
	let prev = CURRENT.with(|c| c.replace(Some(host)));
	HostGuard { prev, _thread_bound: PhantomData }
}

#[must_use = "the host stops being current when the guard is dropped"]
pub struct HostGuard {
	prev: Option<Rc<dyn Host>>,
	_thread_bound: PhantomData<Rc<()>>,
}
impl Drop for HostGuard {
	fn drop(&mut self) {
		let prev = self.prev.take();
		CURRENT.with(|c| *c.borrow_mut() = prev)
	}
}
