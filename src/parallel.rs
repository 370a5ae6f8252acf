//! Concurrent predicate combinators over finite collections.
//!
//! Every element is submitted to the predicate up front, in order, and the
//! invocations then run interleaved. [some_async], [none_async] and
//! [every_async] resolve as soon as one outcome decides the result; the
//! invocations still running at that point are handed to the current
//! [crate::host::Host] to finish, and nothing they produce affects the result.
//! Leftovers only run to completion if a host is current: without one they
//! are dropped, which cancels them, when the call returns.
//!
//! If an invocation fails, the call waits for every other invocation to settle
//! and then fails with the first failure to arrive, unless a deciding outcome
//! arrived before it. See [crate::sequential] for the ordered alternative.

use std::future::Future;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use itertools::Itertools;

use crate::host;

/// Hand invocations that are still running to the host, or drop them if
/// there is none
fn detach<Fut: Future + 'static>(pending: FuturesUnordered<Fut>) {
	if pending.is_empty() {
		return;
	}
	if let Some(host) = host::current() {
		host.spawn(Box::pin(pending.for_each(|_| async {})))
	}
}

/// Resolve to true as soon as an invocation resolves to `decisive`, or to false
/// once all of them have settled without one doing so.
async fn race<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	mut pred: impl FnMut(&T, usize) -> Fut,
	decisive: bool,
) -> Result<bool, E>
where
	E: 'static,
	Fut: Future<Output = Result<bool, E>> + 'static,
{
	let mut pending: FuturesUnordered<Fut> =
		items.into_iter().enumerate().map(|(i, item)| pred(&item, i)).collect();
	let mut failure = None;
	while let Some(outcome) = pending.next().await {
		match outcome {
			Ok(b) if b == decisive && failure.is_none() => {
				detach(pending);
				return Ok(true);
			},
			Ok(_) => (),
			Err(e) =>
				if failure.is_none() {
					failure = Some(e)
				},
		}
	}
	match failure {
		Some(e) => Err(e),
		None => Ok(false),
	}
}

/// True as soon as any invocation resolves true, false once all resolved false
pub async fn some_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	E: 'static,
	Fut: Future<Output = Result<bool, E>> + 'static,
{
	race(items, pred, true).await
}

/// False as soon as any invocation resolves true, true once all resolved false
pub async fn none_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	E: 'static,
	Fut: Future<Output = Result<bool, E>> + 'static,
{
	Ok(!race(items, pred, true).await?)
}

/// False as soon as any invocation resolves false, true once all resolved true
pub async fn every_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	E: 'static,
	Fut: Future<Output = Result<bool, E>> + 'static,
{
	Ok(!race(items, pred, false).await?)
}

/// The elements the predicate resolved true for, in their original order.
/// Every invocation runs to completion before this resolves.
pub async fn filter_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	mut pred: impl FnMut(&T, usize) -> Fut,
) -> Result<Vec<T>, E>
where
	Fut: Future<Output = Result<bool, E>>,
{
	let items = items.into_iter().collect_vec();
	let mut pending: FuturesUnordered<_> = (items.iter().enumerate())
		.map(|(i, item)| {
			let fut = pred(item, i);
			async move { (i, fut.await) }
		})
		.collect();
	let mut keep = vec![false; items.len()];
	let mut failure = None;
	while let Some((i, outcome)) = pending.next().await {
		match outcome {
			Ok(k) => keep[i] = k,
			Err(e) =>
				if failure.is_none() {
					failure = Some(e)
				},
		}
	}
	if let Some(e) = failure {
		return Err(e);
	}
	Ok(items.into_iter().zip_eq(keep).filter_map(|(item, k)| k.then_some(item)).collect())
}

#[cfg(test)]
mod test {
	use std::cell::{Cell, RefCell};
	use std::future::{Ready, pending, ready};
	use std::rc::Rc;
	use std::time::Duration;

	use futures::FutureExt;
	use futures::future::LocalBoxFuture;
	use never::Never;
	use test_executors::spin_on;

	use super::{every_async, filter_async, none_async, some_async};
	use crate::config::LoopConfig;
	use crate::deferred::timeout;
	use crate::error::HostError;
	use crate::event_loop::EventLoop;
	use crate::host::enter;
	use crate::host::test::Recorder;
	use crate::logging::LogStrategy;

	fn even(x: &u32, _: usize) -> Ready<Result<bool, Never>> { ready(Ok(x % 2 == 0)) }

	fn quiet_loop() -> EventLoop { EventLoop::new(LoopConfig::default().log(LogStrategy::Discard)) }

	#[derive(Debug, PartialEq)]
	enum Failure {
		Host(HostError),
		Pred(&'static str),
	}

	/// A predicate that sleeps for the element's first field in milliseconds
	/// and then answers with its second, counting finished invocations
	fn delayed(
		done: &Rc<Cell<u32>>,
	) -> impl FnMut(&(u64, Result<bool, &'static str>), usize) -> LocalBoxFuture<'static, Result<bool, Failure>> {
		let done = done.clone();
		move |&(ms, answer), _| {
			let done = done.clone();
			async move {
				timeout(Duration::from_millis(ms)).await.map_err(Failure::Host)?;
				done.set(done.get() + 1);
				answer.map_err(Failure::Pred)
			}
			.boxed_local()
		}
	}

	#[test]
	fn empty_defaults() {
		assert_eq!(spin_on(some_async(Vec::<u32>::new(), even)), Ok(false));
		assert_eq!(spin_on(none_async(Vec::<u32>::new(), even)), Ok(true));
		assert_eq!(spin_on(every_async(Vec::<u32>::new(), even)), Ok(true));
		assert_eq!(spin_on(filter_async(Vec::<u32>::new(), even)), Ok(vec![]));
	}

	#[test]
	fn scenarios() {
		assert_eq!(spin_on(filter_async([1, 2, 3, 4, 5], even)), Ok(vec![2, 4]));
		assert_eq!(spin_on(some_async([1, 3, 5], even)), Ok(false));
		assert_eq!(spin_on(some_async([1, 2, 3, 4, 5], even)), Ok(true));
		assert_eq!(spin_on(every_async([2, 4, 6], even)), Ok(true));
		assert_eq!(spin_on(every_async([1, 2, 3, 4, 5], even)), Ok(false));
		assert_eq!(spin_on(none_async([1, 3, 5], even)), Ok(true));
		assert_eq!(spin_on(none_async([1, 2], even)), Ok(false));
	}

	#[test]
	fn submits_everything_up_front() {
		let seen = RefCell::new(Vec::new());
		let res = spin_on(some_async([2, 4, 6], |x: &u32, i| {
			seen.borrow_mut().push(i);
			even(x, i)
		}));
		assert_eq!(res, Ok(true));
		assert_eq!(*seen.borrow(), [0, 1, 2]);
	}

	#[test]
	fn decides_on_fastest_and_leftovers_finish() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(40, Ok(false)), (5, Ok(true)), (30, Ok(false))];
		assert_eq!(lp.run_until(some_async(items, delayed(&done))).unwrap(), Ok(true));
		assert_eq!(done.get(), 1, "returned before the slower invocations settled");
		assert_eq!(lp.live_tasks(), 1);
		lp.run().unwrap();
		assert_eq!(done.get(), 3);
	}

	#[test]
	fn default_waits_for_all() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(10, Ok(true)), (5, Ok(true)), (15, Ok(true))];
		assert_eq!(lp.run_until(every_async(items, delayed(&done))).unwrap(), Ok(true));
		assert_eq!(done.get(), 3);
		assert_eq!(lp.live_tasks(), 0);
	}

	#[test]
	fn failure_waits_for_all_to_settle() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(20, Ok(true)), (5, Err("boom")), (30, Ok(true))];
		let res = lp.run_until(every_async(items, delayed(&done))).unwrap();
		assert_eq!(res, Err(Failure::Pred("boom")));
		assert_eq!(done.get(), 3);
	}

	#[test]
	fn first_failure_by_completion() {
		let lp = quiet_loop();
		let pred = |&(ms, tag): &(u64, u32), _: usize| async move {
			timeout(Duration::from_millis(ms)).await.map_err(|_| u32::MAX)?;
			Err::<bool, u32>(tag)
		};
		assert_eq!(lp.run_until(some_async([(25, 1), (5, 2), (15, 3)], pred)).unwrap(), Err(2));
	}

	#[test]
	fn decision_before_failure_wins() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(30, Err("late")), (5, Ok(false))];
		assert_eq!(lp.run_until(none_async([(30, Ok(false)), (5, Ok(true))], delayed(&done))).unwrap(), Ok(false));
		assert_eq!(lp.run_until(every_async(items, delayed(&done))).unwrap(), Ok(false));
		lp.run().unwrap();
	}

	#[test]
	fn failure_before_decision_wins() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(5, Err("early")), (20, Ok(true))];
		assert_eq!(lp.run_until(some_async(items, delayed(&done))).unwrap(), Err(Failure::Pred("early")));
		assert_eq!(done.get(), 2);
	}

	#[test]
	fn leftovers_dropped_without_host() {
		struct Alive(Rc<Cell<bool>>);
		impl Drop for Alive {
			fn drop(&mut self) { self.0.set(false) }
		}
		let alive = Rc::new(Cell::new(true));
		let res = spin_on(some_async([true, false], |&decides: &bool, _| {
			let guard = (!decides).then(|| Alive(alive.clone()));
			async move {
				let _guard = guard;
				if !decides {
					pending::<()>().await;
				}
				Ok::<_, Never>(true)
			}
		}));
		assert_eq!(res, Ok(true));
		assert!(!alive.get());
	}

	#[test]
	fn leftovers_handed_to_host() {
		let rec = Recorder::new();
		let _g = enter(rec.clone());
		let res = spin_on(every_async([1, 2, 3], |&x: &u32, _| async move {
			if x != 1 {
				pending::<()>().await;
			}
			Ok::<_, Never>(false)
		}));
		assert_eq!(res, Ok(false));
		let mut spawned = rec.spawned.borrow_mut();
		assert_eq!(spawned.len(), 1);
		assert!(spawned[0].as_mut().now_or_never().is_none(), "the stuck invocations are still running");
	}

	#[test]
	fn filter_keeps_input_order() {
		let lp = quiet_loop();
		let order = Rc::new(RefCell::new(Vec::new()));
		let pred = |&(ms, keep): &(u64, bool), i: usize| {
			let order = order.clone();
			async move {
				timeout(Duration::from_millis(ms)).await?;
				order.borrow_mut().push(i);
				Ok::<_, HostError>(keep)
			}
		};
		let items = [(30, true), (20, false), (10, true), (1, true)];
		let kept = lp.run_until(filter_async(items, pred)).unwrap();
		assert_eq!(kept, Ok(vec![(30, true), (10, true), (1, true)]));
		assert_eq!(*order.borrow(), [3, 2, 1, 0]);
	}

	#[test]
	fn filter_failure_after_settling() {
		let lp = quiet_loop();
		let done = Rc::new(Cell::new(0));
		let items = [(15, Ok(true)), (5, Err("bad")), (10, Ok(false))];
		assert_eq!(lp.run_until(filter_async(items, delayed(&done))).unwrap(), Err(Failure::Pred("bad")));
		assert_eq!(done.get(), 3);
	}
}
