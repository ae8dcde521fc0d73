//! Access and lifecycle guards shared by signing processes and the factory.
//!
//! - `ReentrancyGuard` turns every mutation of an entity into a critical
//!   section: callers on other threads wait their turn, while a call that
//!   re-enters the same entity from inside its own critical section (for
//!   example from an event sink) is rejected.
//! - `only_owner` gates administrative operations on a recorded owner.
//! - `Pausable` is the pause flag checked before signing or creation.

use docsign_types::Identity;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised by the guards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
	#[error("Caller {caller} is not the owner")]
	NotOwner { caller: Identity },
	#[error("Reentrant call rejected")]
	ReentrantCall,
	#[error("Operation blocked while paused")]
	Paused,
	#[error("Not paused")]
	NotPaused,
}

/// Fails with `NotOwner` unless `caller` is `owner`.
pub fn only_owner(owner: Identity, caller: Identity) -> Result<(), GuardError> {
	if caller == owner {
		Ok(())
	} else {
		Err(GuardError::NotOwner { caller })
	}
}

/// Pause flag with the two checks used by gated operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pausable {
	paused: bool,
}

impl Pausable {
	pub fn new(paused: bool) -> Self {
		Self { paused }
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	pub fn require_not_paused(&self) -> Result<(), GuardError> {
		if self.paused {
			Err(GuardError::Paused)
		} else {
			Ok(())
		}
	}

	pub fn require_paused(&self) -> Result<(), GuardError> {
		if self.paused {
			Ok(())
		} else {
			Err(GuardError::NotPaused)
		}
	}

	/// Sets the flag. Pausing twice fails with `Paused`.
	pub fn pause(&mut self) -> Result<(), GuardError> {
		self.require_not_paused()?;
		self.paused = true;
		Ok(())
	}

	/// Clears the flag. Unpausing when not paused fails with `NotPaused`.
	pub fn unpause(&mut self) -> Result<(), GuardError> {
		self.require_paused()?;
		self.paused = false;
		Ok(())
	}
}

static NEXT_GUARD_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
	/// Guards whose critical section is open on this thread.
	static ACTIVE_GUARDS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Per-entity critical section.
#[derive(Debug)]
pub struct ReentrancyGuard {
	id: usize,
	lock: Mutex<()>,
}

impl Default for ReentrancyGuard {
	fn default() -> Self {
		Self::new()
	}
}

impl ReentrancyGuard {
	pub fn new() -> Self {
		Self {
			id: NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed),
			lock: Mutex::new(()),
		}
	}

	/// Opens the critical section, blocking while another thread holds it.
	///
	/// Fails with `ReentrantCall` if this thread is already inside it.
	pub fn enter(&self) -> Result<CriticalSection<'_>, GuardError> {
		let entered = ACTIVE_GUARDS.with(|active| active.borrow_mut().insert(self.id));
		if !entered {
			return Err(GuardError::ReentrantCall);
		}
		// The protected state is swapped in whole, so a poisoned lock
		// never guards a half-applied change.
		let lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(CriticalSection {
			id: self.id,
			_lock: lock,
		})
	}

	/// Whether the current thread is inside this guard's critical section.
	pub fn is_entered(&self) -> bool {
		ACTIVE_GUARDS.with(|active| active.borrow().contains(&self.id))
	}
}

/// Open critical section. Closed on drop.
#[must_use = "the critical section closes as soon as this is dropped"]
pub struct CriticalSection<'a> {
	id: usize,
	_lock: MutexGuard<'a, ()>,
}

impl Drop for CriticalSection<'_> {
	fn drop(&mut self) {
		ACTIVE_GUARDS.with(|active| {
			active.borrow_mut().remove(&self.id);
		});
	}
}
