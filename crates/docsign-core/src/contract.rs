//! Live signing process.
//!
//! `SigningContract` wraps a `ProcessState` with the execution guarantees of
//! a ledger contract. Every mutation runs inside the contract's critical
//! section on a draft copy of the state; the draft replaces the committed
//! state only if the operation succeeds, and the operation's events are then
//! handed to the sink in order. Queries read the last committed state.

use crate::clock::Clock;
use crate::event_bus::EventSink;
use crate::guards::ReentrancyGuard;
use crate::state::{ProcessState, SigningError};
use docsign_types::{
	short_address, CreateProcessParams, DocsignEvent, DocumentHash, Identity, ProcessEvent,
	ProcessMetadata, ProcessSnapshot, ProcessStatus, SignatureRecord, SigningProgress,
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// A signing process with atomic, serialized, non-reentrant mutations.
pub struct SigningContract {
	guard: ReentrancyGuard,
	state: RwLock<ProcessState>,
	sink: Arc<dyn EventSink>,
	clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SigningContract {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SigningContract")
			.field("state", &*self.read())
			.finish_non_exhaustive()
	}
}

impl SigningContract {
	/// Creates a process at `address` owned by `owner` and emits its
	/// `ContractCreated` event.
	pub fn create(
		address: Identity,
		owner: Identity,
		params: CreateProcessParams,
		sink: Arc<dyn EventSink>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, SigningError> {
		let (contract, created) = Self::deploy(address, owner, params, sink, clock)?;
		contract.sink.emit(DocsignEvent::Process(created));
		Ok(contract)
	}

	/// Creates a process without announcing it.
	///
	/// The returned `ContractCreated` event must be handed to the sink by the
	/// caller once the process is reachable by whoever handles that event.
	pub fn deploy(
		address: Identity,
		owner: Identity,
		params: CreateProcessParams,
		sink: Arc<dyn EventSink>,
		clock: Arc<dyn Clock>,
	) -> Result<(Self, ProcessEvent), SigningError> {
		let (state, event) = ProcessState::create(address, owner, params, clock.now())?;

		tracing::info!(
			process = %short_address(&address),
			owner = %short_address(&owner),
			signers = state.required_signers().len(),
			sequential = state.is_sequential(),
			"Signing process created"
		);

		let contract = Self {
			guard: ReentrancyGuard::new(),
			state: RwLock::new(state),
			sink,
			clock,
		};
		Ok((contract, event))
	}

	/// Runs `apply` against a draft of the state and commits it on success.
	fn transact<F>(&self, apply: F) -> Result<(), SigningError>
	where
		F: FnOnce(&mut ProcessState, u64) -> Result<Vec<ProcessEvent>, SigningError>,
	{
		let _section = self.guard.enter()?;

		let mut draft = self.read().clone();
		let events = apply(&mut draft, self.clock.now())?;
		*self.state.write().unwrap_or_else(PoisonError::into_inner) = draft;

		for event in events {
			tracing::debug!(event = event.name(), "Emitting process event");
			self.sink.emit(DocsignEvent::Process(event));
		}
		Ok(())
	}

	fn read(&self) -> RwLockReadGuard<'_, ProcessState> {
		self.state.read().unwrap_or_else(PoisonError::into_inner)
	}

	/// Records `caller`'s signature with a free-form note.
	pub fn sign(&self, caller: Identity, note: &str) -> Result<(), SigningError> {
		self.transact(|state, now| state.sign(caller, note, now))
			.inspect(|_| {
				tracing::info!(
					process = %short_address(&self.address()),
					signer = %short_address(&caller),
					progress = %self.progress(),
					"Document signed"
				);
			})
	}

	pub fn replace_signer(
		&self,
		caller: Identity,
		old_signer: Identity,
		new_signer: Identity,
	) -> Result<(), SigningError> {
		self.transact(|state, _| state.replace_signer(caller, old_signer, new_signer))
	}

	pub fn cancel(&self, caller: Identity) -> Result<(), SigningError> {
		self.transact(|state, now| state.cancel(caller, now))
			.inspect(|_| {
				tracing::info!(process = %short_address(&self.address()), "Signing process cancelled");
			})
	}

	pub fn update_content_pointer(&self, caller: Identity, pointer: &str) -> Result<(), SigningError> {
		self.transact(|state, _| state.update_content_pointer(caller, pointer))
	}

	pub fn add_document_version(
		&self,
		caller: Identity,
		hash: DocumentHash,
		pointer: &str,
	) -> Result<(), SigningError> {
		self.transact(|state, _| state.add_document_version(caller, hash, pointer))
	}

	pub fn pause(&self, caller: Identity) -> Result<(), SigningError> {
		self.transact(|state, _| state.pause(caller))
	}

	pub fn unpause(&self, caller: Identity) -> Result<(), SigningError> {
		self.transact(|state, _| state.unpause(caller))
	}

	pub fn address(&self) -> Identity {
		self.read().address()
	}

	pub fn owner(&self) -> Identity {
		self.read().owner()
	}

	pub fn status(&self) -> ProcessStatus {
		self.read().status()
	}

	pub fn document_hash(&self) -> DocumentHash {
		self.read().document_hash()
	}

	pub fn content_pointer(&self) -> String {
		self.read().content_pointer().to_string()
	}

	pub fn required_signers(&self) -> Vec<Identity> {
		self.read().required_signers().to_vec()
	}

	pub fn signatures(&self) -> Vec<SignatureRecord> {
		self.read().signatures().to_vec()
	}

	pub fn has_signed(&self, signer: &Identity) -> bool {
		self.read().has_signed(signer)
	}

	pub fn is_fully_signed(&self) -> bool {
		self.read().is_fully_signed()
	}

	pub fn progress(&self) -> SigningProgress {
		self.read().progress()
	}

	/// Next expected signer, or the zero address.
	pub fn next_signer(&self) -> Identity {
		self.read().next_signer()
	}

	pub fn metadata(&self) -> ProcessMetadata {
		self.read().metadata().clone()
	}

	pub fn is_paused(&self) -> bool {
		self.read().is_paused()
	}

	pub fn is_sequential(&self) -> bool {
		self.read().is_sequential()
	}

	/// Consistent copy of the whole committed state.
	pub fn snapshot(&self) -> ProcessSnapshot {
		self.read().snapshot()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::event_bus::AuditLog;
	use crate::guards::GuardError;
	use alloy_primitives::{address, b256, Address};
	use std::sync::{Mutex, OnceLock};

	const A: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
	const B: Address = address!("b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2");
	const C: Address = address!("c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3");
	const OWNER: Address = address!("0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e");
	const PROCESS: Address = address!("9999999999999999999999999999999999999999");
	const H1: DocumentHash =
		b256!("1111111111111111111111111111111111111111111111111111111111111111");

	fn params(signers: Vec<Address>, sequential: bool) -> CreateProcessParams {
		CreateProcessParams {
			document_hash: H1,
			content_pointer: "QmP1".to_string(),
			required_signers: signers,
			sequential,
			title: "NDA".to_string(),
			description: String::new(),
		}
	}

	fn contract(signers: Vec<Address>, sequential: bool) -> (SigningContract, AuditLog) {
		let log = AuditLog::new();
		let contract = SigningContract::create(
			PROCESS,
			OWNER,
			params(signers, sequential),
			Arc::new(log.clone()),
			Arc::new(ManualClock::new(1_000)),
		)
		.unwrap();
		(contract, log)
	}

	#[test]
	fn test_deploy_leaves_announcement_to_caller() {
		let log = AuditLog::new();
		let (contract, created) = SigningContract::deploy(
			PROCESS,
			OWNER,
			params(vec![A], false),
			Arc::new(log.clone()),
			Arc::new(ManualClock::new(1_000)),
		)
		.unwrap();

		assert!(log.is_empty());
		assert!(matches!(
			created,
			ProcessEvent::ContractCreated { process, creator, .. } if process == PROCESS && creator == OWNER
		));
		assert_eq!(contract.metadata().created_at, 1_000);
	}

	#[test]
	fn test_parallel_signing_scenario() {
		let (contract, log) = contract(vec![A, B], false);
		assert_eq!(contract.status(), ProcessStatus::Initiated);
		assert_eq!(contract.progress(), SigningProgress::new(0, 2));
		assert_eq!(log.names(), vec!["ContractCreated"]);

		contract.sign(A, "ok").unwrap();
		assert!(contract.has_signed(&A));
		assert_eq!(contract.status(), ProcessStatus::InProgress);
		assert_eq!(contract.progress(), SigningProgress::new(1, 2));
		assert_eq!(log.names(), vec!["ContractCreated", "DocumentSigned"]);
		assert!(matches!(
			&log.events()[1],
			DocsignEvent::Process(ProcessEvent::DocumentSigned { signer, position: 0, .. }) if *signer == A
		));

		contract.sign(B, "").unwrap();
		assert_eq!(contract.status(), ProcessStatus::Completed);
		assert_eq!(contract.progress(), SigningProgress::new(2, 2));
		assert!(contract.is_fully_signed());
		assert_eq!(
			log.names(),
			vec![
				"ContractCreated",
				"DocumentSigned",
				"DocumentSigned",
				"SigningCompleted"
			]
		);

		assert_eq!(contract.sign(B, "").unwrap_err(), SigningError::AlreadySigned(B));
		assert_eq!(log.len(), 4);
	}

	#[test]
	fn test_sequential_signing_scenario() {
		let (contract, _log) = contract(vec![A, B, C], true);

		assert_eq!(
			contract.sign(B, "").unwrap_err(),
			SigningError::InvalidSigningOrder {
				expected: 0,
				actual: 1
			}
		);
		contract.sign(A, "").unwrap();
		assert_eq!(contract.snapshot().next_signer_cursor, 1);
		assert_eq!(contract.next_signer(), B);
		assert_eq!(
			contract.sign(C, "").unwrap_err(),
			SigningError::InvalidSigningOrder {
				expected: 1,
				actual: 2
			}
		);
	}

	#[test]
	fn test_every_signer_signs_exactly_once() {
		let signers: Vec<Address> = (1..=5u8).map(Address::repeat_byte).collect();
		let (contract, _log) = contract(signers.clone(), false);
		let outsider = Address::repeat_byte(0x77);

		for (i, signer) in signers.iter().enumerate() {
			assert_eq!(
				contract.sign(outsider, "").unwrap_err(),
				SigningError::NotAuthorizedSigner(outsider)
			);
			contract.sign(*signer, "").unwrap();
			assert_eq!(
				contract.sign(*signer, "").unwrap_err(),
				SigningError::AlreadySigned(*signer)
			);
			assert_eq!(contract.is_fully_signed(), i == signers.len() - 1);
			assert_eq!(
				contract.status() == ProcessStatus::Completed,
				i == signers.len() - 1
			);
		}
		assert_eq!(contract.signatures().len(), signers.len());
	}

	#[test]
	fn test_sequential_order_is_enforced_at_every_step() {
		let signers: Vec<Address> = (1..=4u8).map(Address::repeat_byte).collect();
		let (contract, _log) = contract(signers.clone(), true);

		for cursor in 0..signers.len() {
			for (attempt, signer) in signers.iter().enumerate().skip(cursor + 1) {
				assert_eq!(
					contract.sign(*signer, "").unwrap_err(),
					SigningError::InvalidSigningOrder {
						expected: cursor,
						actual: attempt
					}
				);
			}
			contract.sign(signers[cursor], "").unwrap();
		}
		assert_eq!(contract.status(), ProcessStatus::Completed);
		assert_eq!(contract.next_signer(), Address::ZERO);
	}

	#[test]
	fn test_terminal_states_reject_signatures() {
		let (completed, _) = contract(vec![A], false);
		completed.sign(A, "").unwrap();
		assert_eq!(
			completed.sign(B, "").unwrap_err(),
			SigningError::NotAuthorizedSigner(B)
		);
		assert_eq!(completed.cancel(OWNER).unwrap_err(), SigningError::ContractAlreadyCompleted(ProcessStatus::Completed));
		assert_eq!(completed.status(), ProcessStatus::Completed);

		let (cancelled, log) = contract(vec![A, B], true);
		cancelled.cancel(OWNER).unwrap();
		for signer in [A, B] {
			assert_eq!(
				cancelled.sign(signer, "").unwrap_err(),
				SigningError::ContractAlreadyCompleted(ProcessStatus::Cancelled)
			);
		}
		assert_eq!(log.names(), vec!["ContractCreated", "ContractCancelled"]);
	}

	#[test]
	fn test_failed_operations_leave_no_trace() {
		let (contract, log) = contract(vec![A, B], true);
		let before = contract.snapshot();

		assert!(contract.sign(B, "").is_err());
		assert!(contract.cancel(A).is_err());
		assert!(contract.replace_signer(OWNER, A, B).is_err());
		assert!(contract.update_content_pointer(OWNER, "").is_err());
		assert!(contract.add_document_version(OWNER, DocumentHash::ZERO, "QmX").is_err());
		assert!(contract.unpause(OWNER).is_err());

		assert_eq!(contract.snapshot(), before);
		assert_eq!(log.len(), 1);
	}

	#[test]
	fn test_owner_only_operations() {
		let (contract, _) = contract(vec![A, B], false);
		let not_owner = SigningError::Guard(GuardError::NotOwner { caller: A });

		assert_eq!(contract.cancel(A).unwrap_err(), not_owner);
		assert_eq!(contract.pause(A).unwrap_err(), not_owner);
		assert_eq!(contract.update_content_pointer(A, "QmNew").unwrap_err(), not_owner);
		assert_eq!(contract.replace_signer(A, B, C).unwrap_err(), not_owner);
		assert_eq!(
			contract
				.add_document_version(
					A,
					b256!("2222222222222222222222222222222222222222222222222222222222222222"),
					"QmNew"
				)
				.unwrap_err(),
			not_owner
		);
	}

	#[test]
	fn test_pause_blocks_only_signing() {
		let (contract, log) = contract(vec![A, B], false);
		contract.pause(OWNER).unwrap();
		assert!(contract.is_paused());
		assert_eq!(
			contract.pause(OWNER).unwrap_err(),
			SigningError::Guard(GuardError::Paused)
		);
		assert_eq!(
			contract.sign(A, "").unwrap_err(),
			SigningError::Guard(GuardError::Paused)
		);

		// Reads and admin operations stay available
		assert_eq!(contract.progress(), SigningProgress::new(0, 2));
		contract.update_content_pointer(OWNER, "QmMirror").unwrap();

		contract.unpause(OWNER).unwrap();
		contract.sign(A, "").unwrap();
		assert_eq!(
			log.names(),
			vec![
				"ContractCreated",
				"Paused",
				"ContentPointerUpdated",
				"Unpaused",
				"DocumentSigned"
			]
		);
	}

	#[test]
	fn test_replacement_moves_authorization() {
		let (contract, log) = contract(vec![A, B], false);
		contract.replace_signer(OWNER, A, C).unwrap();

		assert_eq!(
			contract.sign(A, "").unwrap_err(),
			SigningError::NotAuthorizedSigner(A)
		);
		contract.sign(C, "").unwrap();
		assert_eq!(contract.required_signers(), vec![C, B]);
		assert_eq!(log.names()[1], "SignerReplaced");
	}

	#[test]
	fn test_signature_records_clock_and_version() {
		let clock = Arc::new(ManualClock::new(50));
		let contract = SigningContract::create(
			PROCESS,
			OWNER,
			params(vec![A, B], false),
			Arc::new(AuditLog::new()),
			clock.clone(),
		)
		.unwrap();
		assert_eq!(contract.metadata().created_at, 50);

		clock.advance(10);
		contract.sign(A, "first").unwrap();
		let h2 = b256!("2222222222222222222222222222222222222222222222222222222222222222");
		contract.add_document_version(OWNER, h2, "QmP2").unwrap();
		clock.advance(10);
		contract.sign(B, "second").unwrap();

		let signatures = contract.signatures();
		assert_eq!(signatures[0].timestamp, 60);
		assert_eq!(signatures[0].document_version, H1);
		assert_eq!(signatures[1].timestamp, 70);
		assert_eq!(signatures[1].document_version, h2);
		assert_eq!(contract.metadata().versions, vec![H1, h2]);
		assert_eq!(contract.document_hash(), h2);
		assert_eq!(contract.content_pointer(), "QmP2");
	}

	/// Sink that tries to sign again while the signature is being emitted.
	struct ReentrantSink {
		target: OnceLock<Arc<SigningContract>>,
		attempts: Mutex<Vec<(Result<(), SigningError>, ProcessStatus)>>,
	}

	impl EventSink for ReentrantSink {
		fn emit(&self, event: DocsignEvent) {
			let Some(contract) = self.target.get() else {
				return;
			};
			if let DocsignEvent::Process(ProcessEvent::DocumentSigned { .. }) = event {
				let attempt = contract.sign(B, "from sink");
				// Reads see the committed post-state
				let status = contract.status();
				self.attempts.lock().unwrap().push((attempt, status));
			}
		}
	}

	#[test]
	fn test_reentrant_sign_is_rejected() {
		let sink = Arc::new(ReentrantSink {
			target: OnceLock::new(),
			attempts: Mutex::new(Vec::new()),
		});
		let contract = Arc::new(
			SigningContract::create(
				PROCESS,
				OWNER,
				params(vec![A, B], false),
				sink.clone(),
				Arc::new(ManualClock::new(0)),
			)
			.unwrap(),
		);
		sink.target.set(contract.clone()).unwrap();

		contract.sign(A, "").unwrap();

		let attempts = sink.attempts.lock().unwrap().clone();
		assert_eq!(
			attempts,
			vec![(
				Err(SigningError::Guard(GuardError::ReentrantCall)),
				ProcessStatus::InProgress
			)]
		);
		assert!(!contract.has_signed(&B));

		// The guard is released afterwards
		contract.sign(B, "").unwrap();
		assert_eq!(contract.status(), ProcessStatus::Completed);
	}

	#[test]
	fn test_concurrent_signers_are_serialized() {
		let signers: Vec<Address> = (1..=16u8).map(Address::repeat_byte).collect();
		let (contract, log) = contract(signers.clone(), false);
		let contract = Arc::new(contract);

		let handles: Vec<_> = signers
			.iter()
			.map(|signer| {
				let contract = contract.clone();
				let signer = *signer;
				std::thread::spawn(move || contract.sign(signer, ""))
			})
			.collect();
		for handle in handles {
			handle.join().unwrap().unwrap();
		}

		assert_eq!(contract.status(), ProcessStatus::Completed);
		assert_eq!(contract.signatures().len(), 16);
		let names = log.names();
		assert_eq!(names.len(), 1 + 16 + 1);
		assert_eq!(names.last(), Some(&"SigningCompleted"));
	}
}
