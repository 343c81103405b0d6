//! In-flight load records.
//!
//! A `LoadSlot` is shared between the thread running a computation and every
//! thread that asked for the same key while it was running. Waiters park on a
//! condition variable until the slot leaves the `Loading` state.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

enum SlotState<V, E> {
	Loading,
	Ready(Result<V, E>),
	/// The loading thread unwound before producing an outcome.
	Abandoned,
}

/// Outcome observed by a thread waiting on a slot.
pub(crate) enum Outcome<V, E> {
	Ready(Result<V, E>),
	Abandoned,
}

pub(crate) struct LoadSlot<V, E> {
	state: Mutex<SlotState<V, E>>,
	ready: Condvar,
	/// Thread running the computation
	owner: ThreadId,
}

impl<V, E> LoadSlot<V, E>
where
	V: Clone,
	E: Clone,
{
	/// Create a slot owned by the calling thread.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(SlotState::Loading),
			ready: Condvar::new(),
			owner: thread::current().id(),
		}
	}

	/// Whether the calling thread is the one running this slot's computation.
	///
	/// Such a thread must never `wait` on the slot: it would wait on itself.
	pub fn is_owned_by_current_thread(&self) -> bool {
		self.owner == thread::current().id()
	}

	/// Publish the outcome and wake every waiter.
	///
	/// Only the first resolution sticks; later calls are ignored.
	pub fn complete(&self, result: Result<V, E>) {
		let mut state = self.state.lock();
		if matches!(*state, SlotState::Loading) {
			*state = SlotState::Ready(result);
			self.ready.notify_all();
		}
	}

	/// Mark the slot as abandoned if it has not been resolved yet.
	///
	/// Returns true if this call abandoned it.
	pub fn abandon(&self) -> bool {
		let mut state = self.state.lock();
		if !matches!(*state, SlotState::Loading) {
			return false;
		}
		*state = SlotState::Abandoned;
		self.ready.notify_all();
		true
	}

	/// Block until the slot is resolved and return a copy of its outcome.
	pub fn wait(&self) -> Outcome<V, E> {
		let mut state = self.state.lock();
		loop {
			match &*state {
				SlotState::Loading => self.ready.wait(&mut state),
				SlotState::Ready(result) => return Outcome::Ready(result.clone()),
				SlotState::Abandoned => return Outcome::Abandoned,
			}
		}
	}

	#[cfg(test)]
	pub fn is_loading(&self) -> bool {
		matches!(*self.state.lock(), SlotState::Loading)
	}
}
