//! Ordered, short-circuiting predicate combinators.
//!
//! Elements are pulled one at a time and each predicate invocation is awaited
//! before the next element is pulled, so no element past the one that decides
//! the outcome is ever pulled or submitted to the predicate. The first failure,
//! from the predicate or from the sequence, ends the call. This is the only
//! policy that works for unbounded sequences; see [crate::parallel] for the
//! concurrent alternative over finite collections.
//!
//! The `_lazy` variants own a [LazySequence] and close it exactly once on
//! every exit path. The `_async` variants accept anything iterable.

use std::future::Future;

use crate::lazy::{LazySequence, from_iter, scoped};

/// Pull and test elements until the predicate resolves to `decisive`, and
/// return the element that did.
async fn decide<S, Fut>(
	seq: S,
	mut pred: impl FnMut(&S::Item, usize) -> Fut,
	decisive: bool,
) -> Result<Option<S::Item>, S::Error>
where
	S: LazySequence,
	Fut: Future<Output = Result<bool, S::Error>>,
{
	scoped(seq, async move |seq: &mut S| -> Result<Option<S::Item>, S::Error> {
		let mut index = 0;
		while let Some(item) = seq.pull().await? {
			if pred(&item, index).await? == decisive {
				return Ok(Some(item));
			}
			index += 1;
		}
		Ok(None)
	})
	.await
}

/// True as soon as the predicate holds for an element, false if none does
pub async fn some_lazy<S, Fut>(seq: S, pred: impl FnMut(&S::Item, usize) -> Fut) -> Result<bool, S::Error>
where
	S: LazySequence,
	Fut: Future<Output = Result<bool, S::Error>>,
{
	Ok(decide(seq, pred, true).await?.is_some())
}

/// False as soon as the predicate holds for an element, true if none does
pub async fn none_lazy<S, Fut>(seq: S, pred: impl FnMut(&S::Item, usize) -> Fut) -> Result<bool, S::Error>
where
	S: LazySequence,
	Fut: Future<Output = Result<bool, S::Error>>,
{
	Ok(decide(seq, pred, true).await?.is_none())
}

/// False as soon as the predicate fails to hold for an element, true if it
/// holds for all
pub async fn every_lazy<S, Fut>(seq: S, pred: impl FnMut(&S::Item, usize) -> Fut) -> Result<bool, S::Error>
where
	S: LazySequence,
	Fut: Future<Output = Result<bool, S::Error>>,
{
	Ok(decide(seq, pred, false).await?.is_none())
}

/// The first element the predicate holds for
pub async fn find_lazy<S, Fut>(
	seq: S,
	pred: impl FnMut(&S::Item, usize) -> Fut,
) -> Result<Option<S::Item>, S::Error>
where
	S: LazySequence,
	Fut: Future<Output = Result<bool, S::Error>>,
{
	decide(seq, pred, true).await
}

pub async fn some_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	Fut: Future<Output = Result<bool, E>>,
{
	some_lazy(from_iter(items), pred).await
}

pub async fn none_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	Fut: Future<Output = Result<bool, E>>,
{
	none_lazy(from_iter(items), pred).await
}

pub async fn every_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<bool, E>
where
	Fut: Future<Output = Result<bool, E>>,
{
	every_lazy(from_iter(items), pred).await
}

pub async fn find_async<T, E, Fut>(
	items: impl IntoIterator<Item = T>,
	pred: impl FnMut(&T, usize) -> Fut,
) -> Result<Option<T>, E>
where
	Fut: Future<Output = Result<bool, E>>,
{
	find_lazy(from_iter(items), pred).await
}
