//! A [Host] backed by a tokio `LocalSet`, for programs that already run a
//! tokio runtime and want the combinators to share it.

use std::cell::RefCell;
use std::future::Future;
use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::{LocalBoxFuture, poll_fn};
use tokio::task::{spawn_local, yield_now};
use tokio::time::sleep;

use crate::config::LoopConfig;
use crate::error::HostError;
use crate::event_loop::frame_after;
use crate::host::{self, Callback, FrameCallback, Host};
use crate::logging::Logger;

/// Poll `fut` with `current` as the current host. The host is entered for
/// the duration of each poll only, so tasks interleaving on the same thread
/// each see their own.
fn hosted<F: Future>(current: Rc<dyn Host>, fut: F) -> impl Future<Output = F::Output> {
	let mut fut = Box::pin(fut);
	poll_fn(move |cx| {
		let _guard = host::enter(current.clone());
		fut.as_mut().poll(cx)
	})
}

struct TokioData {
	config: LoopConfig,
	logger: Logger,
	origin: Instant,
	frames: RefCell<Vec<FrameCallback>>,
}

/// Microtasks become local tasks, macrotasks become local tasks that yield to
/// the runtime once first, timers sleep on tokio's clock and frames tick on the
/// configured interval. Every method must be called from inside a
/// [tokio::task::LocalSet].
#[derive(Clone)]
pub struct TokioHost(Rc<TokioData>);
impl TokioHost {
	pub fn new(config: LoopConfig) -> Self {
		Self(Rc::new(TokioData {
			logger: Logger::new(config.log.clone()),
			config,
			origin: Instant::now(),
			frames: RefCell::default(),
		}))
	}

	/// Await `fut` with this host current whenever it is polled
	pub async fn run_until<F: Future>(&self, fut: F) -> F::Output { hosted(Rc::new(self.clone()), fut).await }

	fn spawn_hosted(&self, fut: impl Future<Output = ()> + 'static) {
		mem::drop(spawn_local(hosted(Rc::new(self.clone()), fut)))
	}
}
impl Host for TokioHost {
	fn queue_microtask(&self, cb: Callback) { self.spawn_hosted(async move { cb() }) }
	fn queue_macrotask(&self, cb: Callback) {
		self.spawn_hosted(async move {
			yield_now().await;
			cb()
		})
	}
	fn request_frame(&self, cb: FrameCallback) -> Result<(), HostError> {
		let interval = self.0.config.frame_interval.ok_or(HostError::NoFrames)?;
		let mut frames = self.0.frames.borrow_mut();
		frames.push(cb);
		if frames.len() == 1 {
			let data = self.0.clone();
			self.spawn_hosted(async move {
				let now = Instant::now();
				let at = frame_after(data.origin, now, interval);
				sleep(at - now).await;
				let ts = Instant::now();
				let due = mem::take(&mut *data.frames.borrow_mut());
				for cb in due {
					cb(ts)
				}
			});
		}
		Ok(())
	}
	fn set_timeout(&self, delay: Duration, cb: Callback) -> Result<(), HostError> {
		if Instant::now().checked_add(delay).is_none() {
			self.0.logger.log(format_args!("refusing to schedule a timeout {delay:?} away"));
			return Err(HostError::InvalidDelay(delay));
		}
		self.spawn_hosted(async move {
			sleep(delay).await;
			cb()
		});
		Ok(())
	}
	fn spawn(&self, fut: LocalBoxFuture<'static, ()>) { self.spawn_hosted(fut) }
	fn logger(&self) -> &Logger { &self.0.logger }
}
