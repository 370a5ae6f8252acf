//! A single-threaded cooperative [Host].
//!
//! Each cycle drains the microtask queue, promotes expired timers to
//! macrotasks, runs a rendering frame if one is due and otherwise runs a
//! single macrotask. Spawned tasks are polled as microtasks when they are
//! woken. When nothing is runnable the loop blocks on the nearest deadline or
//! on a waker, which may fire from another thread.

use std::cell::{Cell, RefCell};
use std::collections::binary_heap::PeekMut;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::mem;
use std::pin::pin;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use futures::future::LocalBoxFuture;
use futures::task::{ArcWake, waker};
use hashbrown::HashMap;

use crate::config::LoopConfig;
use crate::error::HostError;
use crate::host::{self, Callback, FrameCallback, Host};
use crate::logging::Logger;

/// Wake ID of the future passed to [EventLoop::run_until]
const MAIN: u64 = 0;

enum Job {
	Run(Callback),
	Poll(u64),
}

/// A pending timeout. The [Ord] implementation is reversed so that Rust's max
/// heap yields the earliest deadline first, ties broken by registration order
struct Timer {
	deadline: Instant,
	seq: u64,
	cb: Callback,
}
impl Eq for Timer {}
impl PartialEq for Timer {
	fn eq(&self, other: &Self) -> bool { (self.deadline, self.seq) == (other.deadline, other.seq) }
}
impl PartialOrd for Timer {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}
impl Ord for Timer {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		(other.deadline, other.seq).cmp(&(self.deadline, self.seq))
	}
}

struct TaskWaker {
	id: u64,
	wakes: Mutex<Sender<u64>>,
}
impl ArcWake for TaskWaker {
	fn wake_by_ref(arc_self: &Arc<Self>) {
		if let Ok(wakes) = arc_self.wakes.lock() {
			// fails only if the loop is gone, in which case nobody will poll the task
			let _ = wakes.send(arc_self.id);
		}
	}
}

struct Task {
	fut: LocalBoxFuture<'static, ()>,
	waker: Waker,
}

enum Step {
	Continue,
	Idle,
}

struct LoopData {
	config: LoopConfig,
	logger: Logger,
	origin: Instant,
	micro: RefCell<VecDeque<Job>>,
	macro_q: RefCell<VecDeque<Callback>>,
	frames: RefCell<Vec<FrameCallback>>,
	next_frame: Cell<Option<Instant>>,
	timers: RefCell<BinaryHeap<Timer>>,
	timer_seq: Cell<u64>,
	tasks: RefCell<HashMap<u64, Task>>,
	task_seq: Cell<u64>,
	wake_send: Sender<u64>,
	wake_recv: Receiver<u64>,
}

#[derive(Clone)]
pub struct EventLoop(Rc<LoopData>);
impl EventLoop {
	pub fn new(config: LoopConfig) -> Self {
		let (wake_send, wake_recv) = mpsc::channel();
		Self(Rc::new(LoopData {
			logger: Logger::new(config.log.clone()),
			config,
			origin: Instant::now(),
			micro: RefCell::default(),
			macro_q: RefCell::default(),
			frames: RefCell::default(),
			next_frame: Cell::new(None),
			timers: RefCell::default(),
			timer_seq: Cell::new(0),
			tasks: RefCell::default(),
			task_seq: Cell::new(MAIN + 1),
			wake_send,
			wake_recv,
		}))
	}

	pub fn config(&self) -> &LoopConfig { &self.0.config }

	/// Number of spawned tasks that haven't finished yet
	pub fn live_tasks(&self) -> usize { self.0.tasks.borrow().len() }

	/// Drive the loop until `fut` completes and return its output. Work
	/// scheduled by other tasks that is still pending at that point stays
	/// queued for the next call to [EventLoop::run] or [EventLoop::run_until].
	pub fn run_until<F: Future>(&self, fut: F) -> Result<F::Output, HostError> {
		let _guard = host::enter(Rc::new(self.clone()));
		let mut main = pin!(fut);
		let main_waker = self.waker(MAIN);
		self.0.micro.borrow_mut().push_back(Job::Poll(MAIN));
		loop {
			while self.drain_microtasks() {
				if let Poll::Ready(out) = main.as_mut().poll(&mut Context::from_waker(&main_waker)) {
					return Ok(out);
				}
			}
			self.macro_step(true)?;
		}
	}

	/// Drive the loop until no queued work, timers, frame requests or live tasks
	/// remain.
	pub fn run(&self) -> Result<(), HostError> {
		let _guard = host::enter(Rc::new(self.clone()));
		loop {
			// nothing waits on MAIN outside run_until, so stale wakes are dropped
			while self.drain_microtasks() {}
			if let Step::Idle = self.macro_step(false)? {
				return Ok(());
			}
		}
	}

	fn waker(&self, id: u64) -> Waker {
		waker(Arc::new(TaskWaker { id, wakes: Mutex::new(self.0.wake_send.clone()) }))
	}

	fn collect_wakes(&self) {
		let mut micro = self.0.micro.borrow_mut();
		micro.extend(self.0.wake_recv.try_iter().map(Job::Poll));
	}

	/// Run microtasks until the queue is empty or the main future is due to be
	/// polled. Returns true in the latter case.
	fn drain_microtasks(&self) -> bool {
		loop {
			self.collect_wakes();
			let Some(job) = self.0.micro.borrow_mut().pop_front() else { return false };
			match job {
				Job::Run(cb) => cb(),
				Job::Poll(MAIN) => return true,
				Job::Poll(id) => self.poll_task(id),
			}
		}
	}

	fn poll_task(&self, id: u64) {
		// absent if it already finished, or if duplicate wakes queued it twice
		let Some(mut task) = self.0.tasks.borrow_mut().remove(&id) else { return };
		if task.fut.as_mut().poll(&mut Context::from_waker(&task.waker)).is_pending() {
			self.0.tasks.borrow_mut().insert(id, task);
		}
	}

	fn promote_timers(&self, now: Instant) {
		let mut timers = self.0.timers.borrow_mut();
		let mut macro_q = self.0.macro_q.borrow_mut();
		while let Some(top) = timers.peek_mut() {
			if now < top.deadline {
				break;
			}
			macro_q.push_back(PeekMut::pop(top).cb);
		}
	}

	fn run_frame(&self, now: Instant) {
		self.0.next_frame.set(None);
		let callbacks = mem::take(&mut *self.0.frames.borrow_mut());
		for cb in callbacks {
			cb(now)
		}
	}

	fn macro_step(&self, main_pending: bool) -> Result<Step, HostError> {
		let now = Instant::now();
		self.promote_timers(now);
		if self.0.next_frame.get().is_some_and(|due| due <= now) {
			self.run_frame(now);
			return Ok(Step::Continue);
		}
		let next_macro = self.0.macro_q.borrow_mut().pop_front();
		if let Some(cb) = next_macro {
			cb();
			return Ok(Step::Continue);
		}
		let next_timer = self.0.timers.borrow().peek().map(|t| t.deadline);
		let deadline = match (next_timer, self.0.next_frame.get()) {
			(Some(t), Some(f)) => Some(t.min(f)),
			(t, f) => t.or(f),
		};
		if deadline.is_none() && !main_pending && self.0.tasks.borrow().is_empty() {
			return Ok(Step::Idle);
		}
		self.wait(deadline)?;
		Ok(Step::Continue)
	}

	fn wait(&self, deadline: Option<Instant>) -> Result<(), HostError> {
		let recv = &self.0.wake_recv;
		let id = match (deadline, self.0.config.stall_timeout) {
			(Some(deadline), _) => match recv.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
				Ok(id) => id,
				Err(RecvTimeoutError::Timeout) => return Ok(()),
				Err(RecvTimeoutError::Disconnected) => return Err(HostError::Stalled),
			},
			(None, Some(stall)) => match recv.recv_timeout(stall) {
				Ok(id) => id,
				Err(_) => {
					let tasks = self.0.tasks.borrow().len();
					self.0.logger.log(format_args!("event loop stalled after {stall:?} with {tasks} live tasks"));
					return Err(HostError::Stalled);
				},
			},
			(None, None) => recv.recv().map_err(|_| HostError::Stalled)?,
		};
		self.0.micro.borrow_mut().push_back(Job::Poll(id));
		Ok(())
	}

	fn next_frame_after(&self, now: Instant, interval: Duration) -> Instant {
		frame_after(self.0.origin, now, interval)
	}
}

/// The first frame strictly after `now` on the grid of `interval` anchored at
/// `origin`
pub(crate) fn frame_after(origin: Instant, now: Instant, interval: Duration) -> Instant {
	let interval = interval.as_nanos();
	if interval == 0 {
		return now;
	}
	let since = now.duration_since(origin).as_nanos();
	let wait = interval - since % interval;
	now + Duration::from_nanos(u64::try_from(wait).unwrap_or(u64::MAX))
}
impl Default for EventLoop {
	fn default() -> Self { Self::new(LoopConfig::default()) }
}
impl Host for EventLoop {
	fn queue_microtask(&self, cb: Callback) { self.0.micro.borrow_mut().push_back(Job::Run(cb)) }
	fn queue_macrotask(&self, cb: Callback) { self.0.macro_q.borrow_mut().push_back(cb) }
	fn request_frame(&self, cb: FrameCallback) -> Result<(), HostError> {
		let interval = self.0.config.frame_interval.ok_or(HostError::NoFrames)?;
		if self.0.next_frame.get().is_none() {
			self.0.next_frame.set(Some(self.next_frame_after(Instant::now(), interval)));
		}
		self.0.frames.borrow_mut().push(cb);
		Ok(())
	}
	fn set_timeout(&self, delay: Duration, cb: Callback) -> Result<(), HostError> {
		let Some(deadline) = Instant::now().checked_add(delay) else {
			self.0.logger.log(format_args!("refusing to schedule a timeout {delay:?} away"));
			return Err(HostError::InvalidDelay(delay));
		};
		let seq = self.0.timer_seq.get();
		self.0.timer_seq.set(seq + 1);
		self.0.timers.borrow_mut().push(Timer { deadline, seq, cb });
		Ok(())
	}
	fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
		let id = self.0.task_seq.get();
		self.0.task_seq.set(id + 1);
		let task = Task { fut, waker: self.waker(id) };
		self.0.tasks.borrow_mut().insert(id, task);
		self.0.micro.borrow_mut().push_back(Job::Poll(id));
	}
	fn logger(&self) -> &Logger { &self.0.logger }
}
