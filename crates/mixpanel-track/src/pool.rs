// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Worker pool running tracking calls off the caller's thread.
//!
//! The pool is a tokio runtime plus a little bookkeeping: whether it still
//! accepts work, how many units of work are outstanding, and an optional
//! concurrency limit. By default it owns a dedicated multi-thread runtime;
//! applications that already run tokio can hand it their runtime handle.

use std::future::Future;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Thread name for workers of the default runtime.
const WORKER_THREAD_NAME: &str = "mixpanel-track-worker";

struct TrackerState {
	accepting: bool,
	outstanding: usize,
}

/// Counts outstanding units of work and gates new submissions.
struct WorkTracker {
	state: Mutex<TrackerState>,
	idle: Condvar,
}

impl WorkTracker {
	fn new() -> Self {
		Self {
			state: Mutex::new(TrackerState {
				accepting: true,
				outstanding: 0,
			}),
			idle: Condvar::new(),
		}
	}

	fn lock(&self) -> MutexGuard<'_, TrackerState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Registers one unit of work, unless the tracker is closed.
	fn enter(self: &Arc<Self>) -> Option<WorkGuard> {
		let mut state = self.lock();
		if !state.accepting {
			return None;
		}
		state.outstanding += 1;
		Some(WorkGuard {
			tracker: Arc::clone(self),
		})
	}

	/// Stops accepting work. Returns true if this call closed the tracker.
	fn close(&self) -> bool {
		let mut state = self.lock();
		std::mem::replace(&mut state.accepting, false)
	}

	fn is_closed(&self) -> bool {
		!self.lock().accepting
	}

	fn outstanding(&self) -> usize {
		self.lock().outstanding
	}

	/// Waits until no work is outstanding or `timeout` elapses.
	fn wait_idle(&self, timeout: Duration) -> bool {
		let state = self.lock();
		let (state, _) = self
			.idle
			.wait_timeout_while(state, timeout, |state| state.outstanding > 0)
			.unwrap_or_else(PoisonError::into_inner);
		state.outstanding == 0
	}
}

/// Held by a unit of work for its whole lifetime, including when the runtime
/// drops it unfinished.
struct WorkGuard {
	tracker: Arc<WorkTracker>,
}

impl Drop for WorkGuard {
	fn drop(&mut self) {
		let mut state = self.tracker.lock();
		state.outstanding -= 1;
		if state.outstanding == 0 {
			self.tracker.idle.notify_all();
		}
	}
}

enum Executor {
	/// A runtime created and owned by the pool.
	Owned { runtime: Option<Runtime>, handle: Handle },
	/// A runtime owned by the embedding application.
	Shared(Handle),
}

impl Executor {
	fn handle(&self) -> &Handle {
		match self {
			Executor::Owned { handle, .. } => handle,
			Executor::Shared(handle) => handle,
		}
	}
}

/// Executes units of work for a [`MixpanelClient`](crate::MixpanelClient).
///
/// Work may run concurrently and complete in any order. Once started, a unit
/// of work always runs to completion; only work that has not started yet is
/// discarded when an owned runtime is dropped.
///
/// # Example
///
/// ```ignore
/// use mixpanel_track::{MixpanelClient, WorkerPool};
///
/// // share the application's runtime, at most 8 requests in flight
/// let pool = WorkerPool::from_handle(tokio::runtime::Handle::current())
///     .with_max_concurrency(8);
///
/// let client = MixpanelClient::builder()
///     .token("e3bc4100330c35722740fb8c6f5abddc")
///     .worker_pool(pool)
///     .build()?;
/// ```
pub struct WorkerPool {
	executor: Executor,
	limit: Option<(usize, Arc<Semaphore>)>,
	tracker: Arc<WorkTracker>,
}

impl WorkerPool {
	/// Creates a pool backed by its own multi-thread runtime, with no limit on
	/// concurrent work.
	pub fn new() -> std::io::Result<Self> {
		let runtime = Builder::new_multi_thread()
			.thread_name(WORKER_THREAD_NAME)
			.enable_all()
			.build()?;
		let handle = runtime.handle().clone();

		Ok(Self::with_executor(Executor::Owned {
			runtime: Some(runtime),
			handle,
		}))
	}

	/// Creates a pool that spawns its work onto an existing runtime.
	///
	/// The runtime must outlive the pool's outstanding work.
	pub fn from_handle(handle: Handle) -> Self {
		Self::with_executor(Executor::Shared(handle))
	}

	fn with_executor(executor: Executor) -> Self {
		Self {
			executor,
			limit: None,
			tracker: Arc::new(WorkTracker::new()),
		}
	}

	/// Bounds the number of units of work running at once.
	///
	/// Work above the limit waits in the queue until a slot frees up.
	pub fn with_max_concurrency(mut self, max: usize) -> Self {
		let max = max.max(1);
		self.limit = Some((max, Arc::new(Semaphore::new(max))));
		self
	}

	/// Returns the concurrency limit, if any.
	pub fn max_concurrency(&self) -> Option<usize> {
		self.limit.as_ref().map(|(max, _)| *max)
	}

	/// Schedules `work` and returns immediately.
	///
	/// Once the pool is closed the work is handed back untouched in `Err`.
	pub fn submit<F>(&self, work: F) -> Result<(), F>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let Some(guard) = self.tracker.enter() else {
			return Err(work);
		};
		let semaphore = self.limit.as_ref().map(|(_, semaphore)| Arc::clone(semaphore));

		self.executor.handle().spawn(async move {
			let _guard = guard;
			// the semaphore is never closed, so acquiring only waits
			let _permit = match semaphore {
				Some(semaphore) => semaphore.acquire_owned().await.ok(),
				None => None,
			};
			work.await;
		});
		Ok(())
	}

	/// Stops accepting new work. Outstanding work keeps running.
	///
	/// Calling this on a closed pool does nothing.
	pub fn close(&self) {
		if self.tracker.close() {
			info!(
				outstanding = self.tracker.outstanding(),
				"Worker pool closed to new work"
			);
		}
	}

	/// Returns true once [`WorkerPool::close`] has been called.
	pub fn is_closed(&self) -> bool {
		self.tracker.is_closed()
	}

	/// Number of submitted units of work that have not finished yet.
	pub fn outstanding(&self) -> usize {
		self.tracker.outstanding()
	}

	/// Blocks the current thread until all outstanding work has finished or
	/// `timeout` elapses, whichever comes first.
	///
	/// Returns true if the pool was idle on return. This does not close the
	/// pool.
	pub fn await_termination(&self, timeout: Duration) -> bool {
		self.tracker.wait_idle(timeout)
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		self.tracker.close();
		if let Executor::Owned { runtime, .. } = &mut self.executor {
			if let Some(runtime) = runtime.take() {
				debug!(
					outstanding = self.tracker.outstanding(),
					"Shutting down worker runtime"
				);
				// does not block, and is safe to call from within another runtime
				runtime.shutdown_background();
			}
		}
	}
}

impl std::fmt::Debug for WorkerPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field(
				"owned_runtime",
				&matches!(self.executor, Executor::Owned { .. }),
			)
			.field("max_concurrency", &self.max_concurrency())
			.field("closed", &self.is_closed())
			.field("outstanding", &self.outstanding())
			.finish()
	}
}
