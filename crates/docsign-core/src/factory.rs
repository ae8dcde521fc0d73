//! Signing process factory and registry.
//!
//! The factory creates signing processes, derives their ledger addresses
//! from its own address and a creation nonce, and indexes every process it
//! creates by initiator, by document hash and in creation order. Registry
//! deactivation only hides a process from listings; it never touches the
//! process's own signing status.

use crate::clock::Clock;
use crate::contract::SigningContract;
use crate::event_bus::EventSink;
use crate::guards::{only_owner, GuardError, Pausable, ReentrancyGuard};
use crate::state::SigningError;
use docsign_types::{
	short_address, CreateProcessParams, DocsignEvent, DocumentHash, FactoryEvent, FactoryStats,
	Identity, Page, RegistryEntry,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors raised by factory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
	#[error("Invalid parameters: {0}")]
	InvalidParameters(String),
	#[error("Process creation failed: {0}")]
	CreationFailed(SigningError),
	#[error("Process creation is paused")]
	FactoryPaused,
	#[error("Process not found: {0}")]
	ProcessNotFound(Identity),
	#[error("Caller {0} is neither the initiator nor the factory owner")]
	UnauthorizedAccess(Identity),
	#[error(transparent)]
	Guard(#[from] GuardError),
}

#[derive(Default)]
struct Registry {
	entries: HashMap<Identity, RegistryEntry>,
	contracts: HashMap<Identity, Arc<SigningContract>>,
	/// Every process in creation order.
	sequence: Vec<Identity>,
	by_initiator: HashMap<Identity, Vec<Identity>>,
	by_document: HashMap<DocumentHash, Vec<Identity>>,
	active: usize,
	/// Nonce of the next created process.
	nonce: u64,
	pause: Pausable,
}

impl Registry {
	/// Page of the entries accepted by `keep`, in creation order. Only the
	/// entries inside the window are cloned.
	fn page_where<P>(&self, keep: P, offset: usize, limit: usize) -> Page<RegistryEntry>
	where
		P: Fn(&RegistryEntry) -> bool,
	{
		let matching = self
			.sequence
			.iter()
			.filter_map(|address| self.entries.get(address))
			.filter(|entry| keep(entry));
		Page::window(matching, offset, limit).map(RegistryEntry::clone)
	}
}

/// Creates and indexes signing processes.
pub struct SigningFactory {
	address: Identity,
	owner: Identity,
	guard: ReentrancyGuard,
	registry: RwLock<Registry>,
	sink: Arc<dyn EventSink>,
	clock: Arc<dyn Clock>,
}

impl SigningFactory {
	pub fn new(
		address: Identity,
		owner: Identity,
		sink: Arc<dyn EventSink>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			address,
			owner,
			guard: ReentrancyGuard::new(),
			registry: RwLock::new(Registry {
				nonce: 1,
				..Registry::default()
			}),
			sink,
			clock,
		}
	}

	/// Starts the factory with creation blocked. No event is emitted.
	pub fn starting_paused(self) -> Self {
		self.write().pause = Pausable::new(true);
		self
	}

	fn read(&self) -> RwLockReadGuard<'_, Registry> {
		self.registry.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Registry> {
		self.registry.write().unwrap_or_else(PoisonError::into_inner)
	}

	/// Creates a signing process owned by `caller` and registers it.
	///
	/// Emits the process's `ContractCreated` followed by `ProcessCreated`.
	pub fn create_signing_process(
		&self,
		caller: Identity,
		params: CreateProcessParams,
	) -> Result<Identity, FactoryError> {
		let _section = self.guard.enter()?;

		let nonce = {
			let registry = self.read();
			if registry.pause.is_paused() {
				return Err(FactoryError::FactoryPaused);
			}
			registry.nonce
		};

		if params.document_hash.is_zero() {
			return Err(FactoryError::InvalidParameters(
				"document hash cannot be zero".into(),
			));
		}
		if params.content_pointer.is_empty() {
			return Err(FactoryError::InvalidParameters(
				"content pointer cannot be empty".into(),
			));
		}
		if params.required_signers.is_empty() {
			return Err(FactoryError::InvalidParameters(
				"at least one signer is required".into(),
			));
		}

		let address = self.address.create(nonce);
		let document_hash = params.document_hash;
		let content_pointer = params.content_pointer.clone();
		let title = params.title.clone();

		let (contract, created) = SigningContract::deploy(
			address,
			caller,
			params,
			self.sink.clone(),
			self.clock.clone(),
		)
		.map_err(FactoryError::CreationFailed)?;

		let entry = RegistryEntry {
			process: address,
			document_hash,
			content_pointer: content_pointer.clone(),
			initiator: caller,
			created_at: contract.metadata().created_at,
			is_active: true,
			title: title.clone(),
		};

		{
			let mut registry = self.write();
			registry.nonce += 1;
			registry.entries.insert(address, entry);
			registry.contracts.insert(address, Arc::new(contract));
			registry.sequence.push(address);
			registry.by_initiator.entry(caller).or_default().push(address);
			registry
				.by_document
				.entry(document_hash)
				.or_default()
				.push(address);
			registry.active += 1;
		}

		tracing::info!(
			process = %short_address(&address),
			initiator = %short_address(&caller),
			title = %title,
			"Process registered"
		);

		self.sink.emit(DocsignEvent::Process(created));
		self.sink.emit(DocsignEvent::Factory(FactoryEvent::ProcessCreated {
			process: address,
			initiator: caller,
			document_hash,
			content_pointer,
			title,
		}));

		Ok(address)
	}

	/// Hides a process from active listings.
	///
	/// Returns `false` without emitting anything if it was already inactive.
	pub fn deactivate_process(
		&self,
		caller: Identity,
		process: Identity,
	) -> Result<bool, FactoryError> {
		let _section = self.guard.enter()?;

		{
			let mut registry = self.write();
			let entry = registry
				.entries
				.get_mut(&process)
				.ok_or(FactoryError::ProcessNotFound(process))?;
			if caller != entry.initiator && caller != self.owner {
				return Err(FactoryError::UnauthorizedAccess(caller));
			}
			if !entry.is_active {
				return Ok(false);
			}
			entry.is_active = false;
			registry.active -= 1;
		}

		tracing::info!(
			process = %short_address(&process),
			by = %short_address(&caller),
			"Process deactivated"
		);
		self.sink
			.emit(DocsignEvent::Factory(FactoryEvent::ProcessDeactivated {
				process,
				deactivated_by: caller,
			}));
		Ok(true)
	}

	/// Blocks process creation. Factory owner only.
	pub fn pause(&self, caller: Identity) -> Result<(), FactoryError> {
		let _section = self.guard.enter()?;
		only_owner(self.owner, caller)?;
		self.write().pause.pause()?;

		tracing::warn!(by = %short_address(&caller), "Process creation paused");
		self.sink
			.emit(DocsignEvent::Factory(FactoryEvent::FactoryPaused { account: caller }));
		Ok(())
	}

	pub fn unpause(&self, caller: Identity) -> Result<(), FactoryError> {
		let _section = self.guard.enter()?;
		only_owner(self.owner, caller)?;
		self.write().pause.unpause()?;

		tracing::info!(by = %short_address(&caller), "Process creation resumed");
		self.sink
			.emit(DocsignEvent::Factory(FactoryEvent::FactoryUnpaused { account: caller }));
		Ok(())
	}

	pub fn address(&self) -> Identity {
		self.address
	}

	pub fn owner(&self) -> Identity {
		self.owner
	}

	pub fn is_paused(&self) -> bool {
		self.read().pause.is_paused()
	}

	pub fn processes_by_initiator(&self, initiator: &Identity) -> Vec<Identity> {
		self.read()
			.by_initiator
			.get(initiator)
			.cloned()
			.unwrap_or_default()
	}

	pub fn processes_by_document(&self, hash: &DocumentHash) -> Vec<Identity> {
		self.read()
			.by_document
			.get(hash)
			.cloned()
			.unwrap_or_default()
	}

	pub fn active_processes_by_initiator(&self, initiator: &Identity) -> Vec<Identity> {
		let registry = self.read();
		registry
			.by_initiator
			.get(initiator)
			.map(|processes| {
				processes
					.iter()
					.filter(|address| {
						registry
							.entries
							.get(*address)
							.is_some_and(|entry| entry.is_active)
					})
					.copied()
					.collect()
			})
			.unwrap_or_default()
	}

	/// Page of every registered process, in creation order.
	pub fn all_processes(&self, offset: usize, limit: usize) -> Page<RegistryEntry> {
		self.read().page_where(|_| true, offset, limit)
	}

	/// Page of active processes, in creation order.
	pub fn active_processes(&self, offset: usize, limit: usize) -> Page<RegistryEntry> {
		self.read().page_where(|entry| entry.is_active, offset, limit)
	}

	pub fn stats(&self) -> FactoryStats {
		let registry = self.read();
		let total = registry.sequence.len();
		FactoryStats {
			total,
			active: registry.active,
			inactive: total - registry.active,
		}
	}

	pub fn process_info(&self, process: &Identity) -> Result<RegistryEntry, FactoryError> {
		self.read()
			.entries
			.get(process)
			.cloned()
			.ok_or(FactoryError::ProcessNotFound(*process))
	}

	pub fn is_valid_process(&self, process: &Identity) -> bool {
		self.read().entries.contains_key(process)
	}

	/// Live handle of a registered process.
	pub fn process(&self, process: &Identity) -> Result<Arc<SigningContract>, FactoryError> {
		self.read()
			.contracts
			.get(process)
			.cloned()
			.ok_or(FactoryError::ProcessNotFound(*process))
	}
}
