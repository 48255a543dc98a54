// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Handles to the eventual outcome of a tracking call.
//!
//! A [`TrackHandle`] can be awaited from async code or waited on from a
//! blocking thread, with or without a timeout. Most callers can simply drop
//! it: the event is delivered either way.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::{Result, TrackError};

enum State {
	Pending,
	Ready(Result<()>),
	Taken,
}

impl State {
	fn take(&mut self) -> Option<Result<()>> {
		match std::mem::replace(self, State::Taken) {
			State::Pending => {
				*self = State::Pending;
				None
			}
			State::Ready(outcome) => Some(outcome),
			State::Taken => Some(Err(TrackError::OutcomeTaken)),
		}
	}

	fn is_pending(&self) -> bool {
		matches!(self, State::Pending)
	}
}

/// Shared cell between a handle and the unit of work that resolves it.
struct Slot {
	state: Mutex<State>,
	ready: Condvar,
	notify: Notify,
}

impl Slot {
	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Stores the outcome if none was stored yet. Returns false otherwise.
	fn resolve(&self, outcome: Result<()>) -> bool {
		let mut state = self.lock();
		if !state.is_pending() {
			return false;
		}
		*state = State::Ready(outcome);
		drop(state);

		self.ready.notify_all();
		self.notify.notify_one();
		true
	}
}

/// The eventual outcome of one tracking call.
///
/// Resolves to `Ok(())` when the endpoint accepted the event and to a
/// [`TrackError`] otherwise.
///
/// # Example
///
/// ```ignore
/// let handle = client.track_event("signup", "user-42");
///
/// // from async code
/// handle.await?;
///
/// // or from a blocking thread
/// // handle.wait_timeout(Duration::from_secs(5));
/// ```
pub struct TrackHandle {
	slot: Arc<Slot>,
}

impl TrackHandle {
	/// Creates a pending handle and the completer that resolves it.
	pub(crate) fn pending() -> (Self, Completer) {
		let slot = Arc::new(Slot {
			state: Mutex::new(State::Pending),
			ready: Condvar::new(),
			notify: Notify::new(),
		});
		let completer = Completer {
			slot: Some(Arc::clone(&slot)),
		};
		(Self { slot }, completer)
	}

	/// Creates a handle that is already resolved.
	pub(crate) fn ready(outcome: Result<()>) -> Self {
		let (handle, completer) = Self::pending();
		completer.complete(outcome);
		handle
	}

	/// Resolves the handle unless the unit of work already did.
	pub(crate) fn resolve(&self, outcome: Result<()>) -> bool {
		self.slot.resolve(outcome)
	}

	/// Returns true once an outcome is available.
	pub fn is_finished(&self) -> bool {
		!self.slot.lock().is_pending()
	}

	/// Takes the outcome if it is available, without blocking.
	pub fn try_outcome(&mut self) -> Option<Result<()>> {
		self.slot.lock().take()
	}

	/// Blocks the current thread until the outcome is available.
	///
	/// Do not call this from async code; await the handle instead.
	pub fn wait(self) -> Result<()> {
		let mut state = self.slot.lock();
		while state.is_pending() {
			state = self
				.slot
				.ready
				.wait(state)
				.unwrap_or_else(PoisonError::into_inner);
		}
		state.take().unwrap_or(Err(TrackError::Abandoned))
	}

	/// Blocks the current thread for at most `timeout`.
	///
	/// Returns `None` if the outcome is still pending when the timeout elapses;
	/// the handle stays usable in that case.
	pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<()>> {
		let state = self.slot.lock();
		let (mut state, _) = self
			.slot
			.ready
			.wait_timeout_while(state, timeout, |state| state.is_pending())
			.unwrap_or_else(PoisonError::into_inner);
		state.take()
	}
}

impl std::fmt::Debug for TrackHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TrackHandle")
			.field("finished", &self.is_finished())
			.finish()
	}
}

impl IntoFuture for TrackHandle {
	type Output = Result<()>;
	type IntoFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

	fn into_future(self) -> Self::IntoFuture {
		Box::pin(async move {
			loop {
				let outcome = self.slot.lock().take();
				if let Some(outcome) = outcome {
					return outcome;
				}
				// notify_one stores a permit, so a resolve racing this check is not lost
				self.slot.notify.notified().await;
			}
		})
	}
}

/// Resolves a [`TrackHandle`] from the unit of work.
///
/// Dropping a completer without calling [`Completer::complete`] resolves the
/// handle with [`TrackError::Abandoned`], so waiters never hang on a task that
/// panicked or was discarded at runtime shutdown.
pub(crate) struct Completer {
	slot: Option<Arc<Slot>>,
}

impl Completer {
	pub(crate) fn complete(mut self, outcome: Result<()>) {
		if let Some(slot) = self.slot.take() {
			slot.resolve(outcome);
		}
	}
}

impl Drop for Completer {
	fn drop(&mut self) {
		if let Some(slot) = self.slot.take() {
			slot.resolve(Err(TrackError::Abandoned));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;
	use std::time::Instant;

	#[test]
	fn ready_handle_is_finished() {
		let mut handle = TrackHandle::ready(Ok(()));
		assert!(handle.is_finished());
		assert!(matches!(handle.try_outcome(), Some(Ok(()))));
	}

	#[test]
	fn pending_handle_has_no_outcome() {
		let (mut handle, _completer) = TrackHandle::pending();
		assert!(!handle.is_finished());
		assert!(handle.try_outcome().is_none());
	}

	#[test]
	fn second_take_reports_outcome_taken() {
		let mut handle = TrackHandle::ready(Ok(()));
		assert!(handle.try_outcome().is_some());
		assert!(matches!(
			handle.try_outcome(),
			Some(Err(TrackError::OutcomeTaken))
		));
	}

	#[test]
	fn dropped_completer_abandons_handle() {
		let (handle, completer) = TrackHandle::pending();
		drop(completer);
		assert!(matches!(handle.wait(), Err(TrackError::Abandoned)));
	}

	#[test]
	fn first_resolution_wins() {
		let (handle, completer) = TrackHandle::pending();
		assert!(handle.resolve(Err(TrackError::ClientShutdown)));
		completer.complete(Ok(()));
		assert!(matches!(handle.wait(), Err(TrackError::ClientShutdown)));
	}

	#[test]
	fn wait_blocks_until_completed_from_another_thread() {
		let (handle, completer) = TrackHandle::pending();
		let worker = thread::spawn(move || {
			thread::sleep(Duration::from_millis(50));
			completer.complete(Ok(()));
		});

		assert!(handle.wait().is_ok());
		worker.join().unwrap();
	}

	#[test]
	fn wait_timeout_returns_none_while_pending() {
		let (mut handle, completer) = TrackHandle::pending();

		let start = Instant::now();
		assert!(handle.wait_timeout(Duration::from_millis(50)).is_none());
		assert!(start.elapsed() >= Duration::from_millis(50));

		completer.complete(Err(TrackError::UnexpectedBody {
			body: "0".to_string(),
		}));
		assert!(matches!(
			handle.wait_timeout(Duration::from_millis(50)),
			Some(Err(TrackError::UnexpectedBody { .. }))
		));
	}

	#[tokio::test]
	async fn await_resolves_when_completed_later() {
		let (handle, completer) = TrackHandle::pending();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			completer.complete(Ok(()));
		});

		assert!(handle.await.is_ok());
	}

	#[tokio::test]
	async fn await_ready_handle() {
		let handle = TrackHandle::ready(Err(TrackError::ClientShutdown));
		assert!(matches!(handle.await, Err(TrackError::ClientShutdown)));
	}
}
