use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_helpers::deferred::{macrotask, microtask, timeout};
use async_helpers::lazy::{Generator, from_stream};
use async_helpers::logging::LogStrategy;
use async_helpers::{EventLoop, HostError, LoopConfig, first, parallel, sequential};
use async_stream::stream;
use futures::FutureExt;

fn quiet_loop() -> EventLoop { EventLoop::new(LoopConfig::default().log(LogStrategy::Discard)) }

/// Resolve whether `x` is even after `x` milliseconds
async fn slow_even(x: u64) -> Result<bool, HostError> {
	timeout(Duration::from_millis(x)).await?;
	Ok(x % 2 == 0)
}

#[test]
fn both_policies_agree() {
	let lp = quiet_loop();
	for items in [vec![1, 3, 5], vec![2, 4, 6], vec![1, 2, 3, 4, 5], vec![]] {
		let seq = lp.run_until(sequential::some_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		let par = lp.run_until(parallel::some_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		assert_eq!(seq, par, "some over {items:?}");
		let seq = lp.run_until(sequential::every_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		let par = lp.run_until(parallel::every_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		assert_eq!(seq, par, "every over {items:?}");
		let seq = lp.run_until(sequential::none_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		let par = lp.run_until(parallel::none_async(items.clone(), |&x, _| slow_even(x))).unwrap();
		assert_eq!(seq, par, "none over {items:?}");
	}
	lp.run().unwrap();
}

#[test]
fn filter_in_order() {
	let lp = quiet_loop();
	let kept = lp.run_until(parallel::filter_async([5, 4, 3, 2, 1], |&x, _| slow_even(x))).unwrap();
	assert_eq!(kept, Ok(vec![4, 2]));
}

#[test]
fn checkpoints_in_order() {
	let lp = quiet_loop();
	let order = Rc::new(RefCell::new(Vec::new()));
	let track = |name: &'static str, susp: async_helpers::suspension::Suspension<()>| {
		let order = order.clone();
		async move {
			susp.await.unwrap();
			order.borrow_mut().push(name)
		}
	};
	lp.run_until(async {
		let t = track("timeout", timeout(Duration::ZERO));
		let m = track("macrotask", macrotask());
		let u = track("microtask", microtask());
		futures::join!(t, m, u);
	})
	.unwrap();
	assert_eq!(*order.borrow(), ["microtask", "macrotask", "timeout"]);
}

#[test]
fn first_of_a_stream_closes_it() {
	let lp = quiet_loop();
	let produced = Rc::new(RefCell::new(0));
	let counter = produced.clone();
	let seq = from_stream(stream! {
		for i in 1u32.. {
			if let Err(e) = timeout(Duration::from_millis(1)).await {
				yield Err(e);
				break;
			}
			*counter.borrow_mut() += 1;
			yield Ok::<_, HostError>(i);
		}
	});
	assert_eq!(lp.run_until(first(seq)).unwrap(), Ok(Some(1)));
	lp.run().unwrap();
	assert_eq!(*produced.borrow(), 1);
}

#[test]
fn unbounded_generator_stops_early() {
	let lp = quiet_loop();
	let pulls = Rc::new(RefCell::new(0u32));
	let counter = pulls.clone();
	let naturals = Generator::<u32, HostError>::new(move || {
		*counter.borrow_mut() += 1;
		let n = *counter.borrow();
		async move {
			microtask().await?;
			Ok(Some(n))
		}
		.boxed_local()
	});
	let found = sequential::find_lazy(naturals, |&n, _| async move { Ok(n * n > 200) });
	assert_eq!(lp.run_until(found).unwrap(), Ok(Some(15)));
	assert_eq!(*pulls.borrow(), 15);
}
