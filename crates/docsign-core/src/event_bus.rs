//! Event dispatch for ledger events.
//!
//! Signing processes and the factory hand every event they produce to an
//! `EventSink` in commit order. `EventBus` fans events out to async
//! subscribers and keeps an ordered journal; `AuditLog` is the bare journal.

use docsign_types::DocsignEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Receiver of ledger events.
///
/// `emit` is called while the emitting entity's critical section is still
/// open. Calling back into the same entity from here is rejected with
/// `GuardError::ReentrantCall`.
pub trait EventSink: Send + Sync {
	fn emit(&self, event: DocsignEvent);
}

/// Journal entry with its position in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
	pub sequence: u64,
	pub event: DocsignEvent,
}

/// Append-only, sequence-numbered event journal.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
	entries: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl AuditLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of every entry recorded so far.
	pub fn entries(&self) -> Vec<LoggedEvent> {
		self.lock().clone()
	}

	/// Recorded events without their sequence numbers.
	pub fn events(&self) -> Vec<DocsignEvent> {
		self.lock().iter().map(|entry| entry.event.clone()).collect()
	}

	/// Event names in emission order.
	pub fn names(&self) -> Vec<&'static str> {
		self.lock().iter().map(|entry| entry.event.name()).collect()
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LoggedEvent>> {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl EventSink for AuditLog {
	fn emit(&self, event: DocsignEvent) {
		let mut entries = self.lock();
		let sequence = entries.len() as u64;
		entries.push(LoggedEvent { sequence, event });
	}
}

/// Broadcast bus for ledger events.
///
/// Subscribers that fall behind lose the oldest events; the journal keeps
/// all of them.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DocsignEvent>,
	journal: AuditLog,
}

impl EventBus {
	/// Creates a bus whose subscribers buffer up to `capacity` events.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self {
			sender,
			journal: AuditLog::new(),
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DocsignEvent> {
		self.sender.subscribe()
	}

	/// Journals the event and broadcasts it to current subscribers.
	///
	/// Returns the number of subscribers reached. Having none is not an
	/// error: the journal still records the event.
	pub fn publish(&self, event: DocsignEvent) -> usize {
		self.journal.emit(event.clone());
		match self.sender.send(event) {
			Ok(reached) => reached,
			Err(e) => {
				tracing::debug!(event = e.0.name(), "No event subscribers, journaled only");
				0
			},
		}
	}

	/// Every event published on this bus, in order.
	pub fn journal(&self) -> &AuditLog {
		&self.journal
	}
}

impl EventSink for EventBus {
	fn emit(&self, event: DocsignEvent) {
		self.publish(event);
	}
}
