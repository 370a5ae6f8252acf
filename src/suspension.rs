//! Single-resolution asynchronous values

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use trait_set::trait_set;

use crate::error::HostError;
use crate::host::{self, Host};

/// The write end of a [Suspension]. Consuming it is the only way to complete
/// the suspension, so it can happen at most once.
pub struct Resolver<T>(oneshot::Sender<T>);
impl<T> Resolver<T> {
	pub fn resolve(self, value: T) {
		// an Err only means the suspension was dropped and nobody is waiting
		let _ = self.0.send(value);
	}
	pub fn is_abandoned(&self) -> bool { self.0.is_canceled() }
}

trait_set! {
	pub trait Registration<T> = FnOnce(&dyn Host, Resolver<T>) -> Result<(), HostError>;
}

enum State<T> {
	Unregistered(Box<dyn Registration<T>>),
	Failed(HostError),
	Waiting(oneshot::Receiver<T>),
	Done,
}

/// Hand the resolver to `register` along with the host current right now
fn start<T>(register: Box<dyn Registration<T>>) -> State<T> {
	let Some(host) = host::current() else { return State::Failed(HostError::NoHost) };
	let (send, recv) = oneshot::channel();
	match register(&*host, Resolver(send)) {
		Ok(()) => State::Waiting(recv),
		Err(e) => State::Failed(e),
	}
}

/// Work that completes at most once, with a value or with the reason the host
/// could not complete it. If the [Resolver] is dropped unused, the suspension
/// completes with [HostError::Dropped].
#[must_use = "a suspension does nothing unless awaited"]
pub struct Suspension<T>(State<T>);
impl<T> Suspension<T> {
	pub fn new() -> (Resolver<T>, Self) {
		let (send, recv) = oneshot::channel();
		(Resolver(send), Self(State::Waiting(recv)))
	}
	/// A suspension that completes immediately with the given host failure
	pub fn failed(err: HostError) -> Self { Self(State::Failed(err)) }
	/// A suspension that registers with whichever host is current when it is
	/// first polled. `register` runs at most once; an error it returns becomes
	/// the output, and with no current host the output is [HostError::NoHost].
	pub fn on_host(
		register: impl FnOnce(&dyn Host, Resolver<T>) -> Result<(), HostError> + 'static,
	) -> Self {
		Self(State::Unregistered(Box::new(register)))
	}
}
impl<T> Future for Suspension<T> {
	type Output = Result<T, HostError>;
	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		loop {
			match mem::replace(&mut this.0, State::Done) {
				State::Unregistered(reg) => this.0 = start(reg),
				State::Failed(e) => return Poll::Ready(Err(e)),
				State::Waiting(mut recv) => {
					let Poll::Ready(res) = recv.poll_unpin(cx) else {
						this.0 = State::Waiting(recv);
						return Poll::Pending;
					};
					return Poll::Ready(res.map_err(|oneshot::Canceled| HostError::Dropped));
				},
				State::Done => panic!("Suspension polled after completion"),
			}
		}
	}
}
