//! Pull-based sequences that hold resources and must be told when no further
//! elements will be requested.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use async_std::channel::Receiver;
use async_stream::stream;
use futures::future::{self, LocalBoxFuture, poll_fn};
use futures::{FutureExt, Stream, TryStream};
use never::Never;
use trait_set::trait_set;

/// A producer of elements on demand.
///
/// Consumers call [LazySequence::pull] until it returns `Ok(None)` or they
/// lose interest, and then call [LazySequence::close] exactly once. No pull
/// follows a close.
pub trait LazySequence {
	type Item;
	type Error;
	/// Produce the next element, `Ok(None)` if the sequence is exhausted
	fn pull(&mut self) -> LocalBoxFuture<'_, Result<Option<Self::Item>, Self::Error>>;
	/// Release whatever the sequence holds; open handles, timers, upstream
	/// producers
	fn close(&mut self) -> LocalBoxFuture<'_, ()>;
}

/// Lend `seq` to `body` and close it once the body finishes, whatever the
/// outcome. If the body panics the sequence is closed before the panic
/// resumes. Dropping the returned future before it completes skips the close;
/// the sequence is dropped instead.
pub async fn scoped<S: LazySequence, R>(mut seq: S, body: impl AsyncFnOnce(&mut S) -> R) -> R {
	let outcome = AssertUnwindSafe(body(&mut seq)).catch_unwind().await;
	seq.close().await;
	match outcome {
		Ok(r) => r,
		Err(payload) => panic::resume_unwind(payload),
	}
}

/// Pull exactly one element and close the sequence. `Ok(None)` means the
/// sequence was empty; an element that is itself optional arrives as
/// `Ok(Some(None))`.
pub async fn first<S: LazySequence>(seq: S) -> Result<Option<S::Item>, S::Error> {
	scoped(seq, async |seq| seq.pull().await).await
}

/// Adapt a lazy sequence to a [Stream] of results. The sequence is closed
/// after it is exhausted or yields an error; a stream dropped earlier just
/// drops the sequence.
pub fn into_stream<S: LazySequence>(mut seq: S) -> impl Stream<Item = Result<S::Item, S::Error>> {
	stream! {
		loop {
			match seq.pull().await {
				Ok(Some(item)) => yield Ok(item),
				Ok(None) => break,
				Err(e) => {
					yield Err(e);
					break
				},
			}
		}
		seq.close().await;
	}
}

/// Infallible sequence over an iterator. The error type is free so that it can
/// match whatever a consumer's predicate fails with.
pub struct FromIter<I, E>(Option<I>, PhantomData<fn() -> E>);
pub fn from_iter<I: IntoIterator, E>(iter: I) -> FromIter<I::IntoIter, E> {
	FromIter(Some(iter.into_iter()), PhantomData)
}
impl<I: Iterator, E> LazySequence for FromIter<I, E> {
	type Item = I::Item;
	type Error = E;
	fn pull(&mut self) -> LocalBoxFuture<'_, Result<Option<I::Item>, E>> {
		let next = self.0.as_mut().and_then(Iterator::next);
		future::ready(Ok(next)).boxed_local()
	}
	fn close(&mut self) -> LocalBoxFuture<'_, ()> {
		self.0 = None;
		future::ready(()).boxed_local()
	}
}

/// Sequence over a stream of results. Closing drops the stream along with
/// everything it captured.
pub struct FromStream<S>(Option<Pin<Box<S>>>);
pub fn from_stream<S: TryStream>(stream: S) -> FromStream<S> { FromStream(Some(Box::pin(stream))) }
impl<S: TryStream> LazySequence for FromStream<S> {
	type Item = S::Ok;
	type Error = S::Error;
	fn pull(&mut self) -> LocalBoxFuture<'_, Result<Option<S::Ok>, S::Error>> {
		match &mut self.0 {
			None => future::ready(Ok(None)).boxed_local(),
			Some(stream) =>
				async move { poll_fn(|cx| stream.as_mut().try_poll_next(cx)).await.transpose() }.boxed_local(),
		}
	}
	fn close(&mut self) -> LocalBoxFuture<'_, ()> {
		self.0 = None;
		future::ready(()).boxed_local()
	}
}

trait_set! {
	pub trait PullFn<T, E> = FnMut() -> LocalBoxFuture<'static, Result<Option<T>, E>>;
	pub trait CloseFn = FnOnce() -> LocalBoxFuture<'static, ()>;
}

/// A hand-written producer: a pull callback and an optional release callback.
/// Once closed it reports exhaustion without consulting the pull callback.
pub struct Generator<T, E> {
	pull: Box<dyn PullFn<T, E>>,
	close: Option<Box<dyn CloseFn>>,
	closed: bool,
}
impl<T, E> Generator<T, E> {
	pub fn new(pull: impl PullFn<T, E> + 'static) -> Self {
		Self { pull: Box::new(pull), close: None, closed: false }
	}
	pub fn on_close(self, close: impl CloseFn + 'static) -> Self {
		Self { close: Some(Box::new(close)), ..self }
	}
	pub fn is_closed(&self) -> bool { self.closed }
}
impl<T, E> LazySequence for Generator<T, E> {
	type Item = T;
	type Error = E;
	fn pull(&mut self) -> LocalBoxFuture<'_, Result<Option<T>, E>> {
		if self.closed {
			return future::ready(Ok(None)).boxed_local();
		}
		(self.pull)()
	}
	fn close(&mut self) -> LocalBoxFuture<'_, ()> {
		self.closed = true;
		match self.close.take() {
			Some(close) => close(),
			None => future::ready(()).boxed_local(),
		}
	}
}

/// Receiving end of a channel. Closing it makes further sends fail, which is
/// how the producers learn to stop.
impl<T> LazySequence for Receiver<T> {
	type Item = T;
	type Error = Never;
	fn pull(&mut self) -> LocalBoxFuture<'_, Result<Option<T>, Never>> {
		async move { Ok(self.recv().await.ok()) }.boxed_local()
	}
	fn close(&mut self) -> LocalBoxFuture<'_, ()> {
		Receiver::close(self);
		future::ready(()).boxed_local()
	}
}
