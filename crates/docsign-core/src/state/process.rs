//! Signing process state machine.
//!
//! `ProcessState` holds everything a signing process records and applies
//! each operation to itself, returning the events the operation produced.
//! It performs no locking or dispatch: `SigningContract` runs every
//! operation on a draft copy and commits the draft only on success.

use crate::guards::{only_owner, GuardError, Pausable};
use docsign_types::{
	CreateProcessParams, DocumentHash, Identity, ProcessEvent, ProcessMetadata, ProcessSnapshot,
	ProcessStatus, SignatureRecord, SigningProgress,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised by signing process operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
	#[error("Document hash cannot be zero")]
	InvalidDocumentHash,
	#[error("Content pointer cannot be empty")]
	InvalidContentPointer,
	#[error("Signer list cannot be empty")]
	EmptySignerList,
	#[error("Signer address cannot be zero")]
	InvalidSignerAddress,
	#[error("Signer {0} is listed more than once")]
	DuplicateSigner(Identity),
	#[error("Caller {0} is not a required signer")]
	NotAuthorizedSigner(Identity),
	#[error("Signer {0} has already signed")]
	AlreadySigned(Identity),
	#[error("Process is already {0}")]
	ContractAlreadyCompleted(ProcessStatus),
	#[error("Invalid signing order: expected signer at position {expected}, got position {actual}")]
	InvalidSigningOrder { expected: usize, actual: usize },
	#[error("Signer {0} is not a required signer")]
	SignerNotFound(Identity),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: ProcessStatus,
		to: ProcessStatus,
	},
	#[error(transparent)]
	Guard(#[from] GuardError),
}

/// Checks a lifecycle transition against the static transition table.
fn is_valid_transition(from: ProcessStatus, to: ProcessStatus) -> bool {
	static TRANSITIONS: Lazy<HashMap<ProcessStatus, HashSet<ProcessStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			ProcessStatus::Initiated,
			HashSet::from([ProcessStatus::InProgress, ProcessStatus::Cancelled]),
		);
		m.insert(
			ProcessStatus::InProgress,
			HashSet::from([ProcessStatus::Completed, ProcessStatus::Cancelled]),
		);
		m.insert(ProcessStatus::Completed, HashSet::new()); // terminal
		m.insert(ProcessStatus::Cancelled, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

fn validate_document(hash: &DocumentHash, pointer: &str) -> Result<(), SigningError> {
	if hash.is_zero() {
		return Err(SigningError::InvalidDocumentHash);
	}
	if pointer.is_empty() {
		return Err(SigningError::InvalidContentPointer);
	}
	Ok(())
}

/// Full state of one signing process.
#[derive(Debug, Clone)]
pub struct ProcessState {
	address: Identity,
	owner: Identity,
	document_hash: DocumentHash,
	content_pointer: String,
	required_signers: Vec<Identity>,
	signer_position: HashMap<Identity, usize>,
	has_signed: HashSet<Identity>,
	signatures: Vec<SignatureRecord>,
	status: ProcessStatus,
	sequential: bool,
	next_signer_cursor: usize,
	pause: Pausable,
	metadata: ProcessMetadata,
}

impl ProcessState {
	/// Validates `params` and builds the initial state owned by `owner`.
	///
	/// Returns the state together with its `ContractCreated` event.
	pub fn create(
		address: Identity,
		owner: Identity,
		params: CreateProcessParams,
		now: u64,
	) -> Result<(Self, ProcessEvent), SigningError> {
		validate_document(&params.document_hash, &params.content_pointer)?;
		if params.required_signers.is_empty() {
			return Err(SigningError::EmptySignerList);
		}

		let mut signer_position = HashMap::with_capacity(params.required_signers.len());
		for (position, signer) in params.required_signers.iter().enumerate() {
			if signer.is_zero() {
				return Err(SigningError::InvalidSignerAddress);
			}
			if signer_position.insert(*signer, position).is_some() {
				return Err(SigningError::DuplicateSigner(*signer));
			}
		}

		let event = ProcessEvent::ContractCreated {
			process: address,
			creator: owner,
			document_hash: params.document_hash,
			content_pointer: params.content_pointer.clone(),
			signers: params.required_signers.clone(),
			sequential: params.sequential,
		};

		let state = Self {
			address,
			owner,
			document_hash: params.document_hash,
			content_pointer: params.content_pointer.clone(),
			required_signers: params.required_signers,
			signer_position,
			has_signed: HashSet::new(),
			signatures: Vec::new(),
			status: ProcessStatus::Initiated,
			sequential: params.sequential,
			next_signer_cursor: 0,
			pause: Pausable::default(),
			metadata: ProcessMetadata {
				title: params.title,
				description: params.description,
				creator: owner,
				created_at: now,
				versions: vec![params.document_hash],
				content_pointers: vec![params.content_pointer],
			},
		};

		Ok((state, event))
	}

	/// Records `caller`'s signature over the current document version.
	pub fn sign(
		&mut self,
		caller: Identity,
		note: &str,
		now: u64,
	) -> Result<Vec<ProcessEvent>, SigningError> {
		let position = *self
			.signer_position
			.get(&caller)
			.ok_or(SigningError::NotAuthorizedSigner(caller))?;
		if self.has_signed.contains(&caller) {
			return Err(SigningError::AlreadySigned(caller));
		}
		self.require_active()?;
		self.pause.require_not_paused()?;
		if self.sequential && position != self.next_signer_cursor {
			return Err(SigningError::InvalidSigningOrder {
				expected: self.next_signer_cursor,
				actual: position,
			});
		}

		self.has_signed.insert(caller);
		self.signatures.push(SignatureRecord {
			signer: caller,
			timestamp: now,
			document_version: self.document_hash,
			metadata: note.to_string(),
		});
		if self.status == ProcessStatus::Initiated {
			self.transition(ProcessStatus::InProgress)?;
		}
		if self.sequential {
			self.next_signer_cursor += 1;
		}

		let mut events = vec![ProcessEvent::DocumentSigned {
			process: self.address,
			signer: caller,
			position,
			document_hash: self.document_hash,
			timestamp: now,
		}];

		if self.is_fully_signed() {
			self.transition(ProcessStatus::Completed)?;
			events.push(ProcessEvent::SigningCompleted {
				process: self.address,
				document_hash: self.document_hash,
				timestamp: now,
			});
		}

		Ok(events)
	}

	/// Puts `new_signer` in `old_signer`'s slot. The slot keeps its position,
	/// so in sequential mode the turn order is unchanged.
	pub fn replace_signer(
		&mut self,
		caller: Identity,
		old_signer: Identity,
		new_signer: Identity,
	) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		self.require_active()?;
		let position = *self
			.signer_position
			.get(&old_signer)
			.ok_or(SigningError::SignerNotFound(old_signer))?;
		if self.has_signed.contains(&old_signer) {
			return Err(SigningError::AlreadySigned(old_signer));
		}
		if new_signer.is_zero() {
			return Err(SigningError::InvalidSignerAddress);
		}
		if self.signer_position.contains_key(&new_signer) {
			return Err(SigningError::DuplicateSigner(new_signer));
		}

		self.required_signers[position] = new_signer;
		self.signer_position.remove(&old_signer);
		self.signer_position.insert(new_signer, position);

		Ok(vec![ProcessEvent::SignerReplaced {
			process: self.address,
			old_signer,
			new_signer,
			position,
		}])
	}

	pub fn cancel(&mut self, caller: Identity, now: u64) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		self.require_active()?;
		self.transition(ProcessStatus::Cancelled)?;

		Ok(vec![ProcessEvent::ContractCancelled {
			process: self.address,
			cancelled_by: caller,
			timestamp: now,
		}])
	}

	/// Moves the current document to a new locator. The hash is unchanged;
	/// the (hash, pointer) pair is appended to the history.
	pub fn update_content_pointer(
		&mut self,
		caller: Identity,
		new_pointer: &str,
	) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		if new_pointer.is_empty() {
			return Err(SigningError::InvalidContentPointer);
		}

		let old_pointer = std::mem::replace(&mut self.content_pointer, new_pointer.to_string());
		self.metadata.versions.push(self.document_hash);
		self.metadata.content_pointers.push(new_pointer.to_string());

		Ok(vec![ProcessEvent::ContentPointerUpdated {
			process: self.address,
			old_pointer,
			new_pointer: new_pointer.to_string(),
		}])
	}

	/// Makes (`hash`, `pointer`) the current document. Existing signatures
	/// keep the version they recorded and still count.
	pub fn add_document_version(
		&mut self,
		caller: Identity,
		hash: DocumentHash,
		pointer: &str,
	) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		validate_document(&hash, pointer)?;

		self.document_hash = hash;
		self.content_pointer = pointer.to_string();
		self.metadata.versions.push(hash);
		self.metadata.content_pointers.push(pointer.to_string());

		Ok(vec![ProcessEvent::DocumentVersionAdded {
			process: self.address,
			version: self.metadata.versions.len() - 1,
			document_hash: hash,
			content_pointer: pointer.to_string(),
		}])
	}

	pub fn pause(&mut self, caller: Identity) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		self.pause.pause()?;
		Ok(vec![ProcessEvent::Paused {
			process: self.address,
			account: caller,
		}])
	}

	pub fn unpause(&mut self, caller: Identity) -> Result<Vec<ProcessEvent>, SigningError> {
		only_owner(self.owner, caller)?;
		self.pause.unpause()?;
		Ok(vec![ProcessEvent::Unpaused {
			process: self.address,
			account: caller,
		}])
	}

	fn require_active(&self) -> Result<(), SigningError> {
		if self.status.is_terminal() {
			Err(SigningError::ContractAlreadyCompleted(self.status))
		} else {
			Ok(())
		}
	}

	fn transition(&mut self, to: ProcessStatus) -> Result<(), SigningError> {
		if !is_valid_transition(self.status, to) {
			return Err(SigningError::InvalidTransition {
				from: self.status,
				to,
			});
		}
		self.status = to;
		Ok(())
	}

	pub fn address(&self) -> Identity {
		self.address
	}

	pub fn owner(&self) -> Identity {
		self.owner
	}

	pub fn document_hash(&self) -> DocumentHash {
		self.document_hash
	}

	pub fn content_pointer(&self) -> &str {
		&self.content_pointer
	}

	pub fn required_signers(&self) -> &[Identity] {
		&self.required_signers
	}

	pub fn signatures(&self) -> &[SignatureRecord] {
		&self.signatures
	}

	pub fn status(&self) -> ProcessStatus {
		self.status
	}

	pub fn is_sequential(&self) -> bool {
		self.sequential
	}

	pub fn next_signer_cursor(&self) -> usize {
		self.next_signer_cursor
	}

	pub fn is_paused(&self) -> bool {
		self.pause.is_paused()
	}

	pub fn metadata(&self) -> &ProcessMetadata {
		&self.metadata
	}

	pub fn has_signed(&self, signer: &Identity) -> bool {
		self.has_signed.contains(signer)
	}

	pub fn is_fully_signed(&self) -> bool {
		self.required_signers
			.iter()
			.all(|signer| self.has_signed.contains(signer))
	}

	pub fn progress(&self) -> SigningProgress {
		SigningProgress::new(self.signatures.len(), self.required_signers.len())
	}

	/// Signer whose turn it is, or the zero address when the process is not
	/// sequential or every slot has been passed.
	pub fn next_signer(&self) -> Identity {
		if !self.sequential {
			return Identity::ZERO;
		}
		self.required_signers
			.get(self.next_signer_cursor)
			.copied()
			.unwrap_or(Identity::ZERO)
	}

	pub fn snapshot(&self) -> ProcessSnapshot {
		ProcessSnapshot {
			address: self.address,
			owner: self.owner,
			document_hash: self.document_hash,
			content_pointer: self.content_pointer.clone(),
			required_signers: self.required_signers.clone(),
			signatures: self.signatures.clone(),
			status: self.status,
			sequential: self.sequential,
			next_signer_cursor: self.next_signer_cursor,
			paused: self.pause.is_paused(),
			is_fully_signed: self.is_fully_signed(),
			metadata: self.metadata.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256, Address};

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
			content_pointer: "QmFirst".to_string(),
			required_signers: signers,
			sequential,
			title: "Lease".to_string(),
			description: "Flat 3B".to_string(),
		}
	}

	fn state(signers: Vec<Address>, sequential: bool) -> ProcessState {
		ProcessState::create(PROCESS, OWNER, params(signers, sequential), 100)
			.unwrap()
			.0
	}

	#[test]
	fn test_transition_table() {
		use ProcessStatus::*;
		assert!(is_valid_transition(Initiated, InProgress));
		assert!(is_valid_transition(Initiated, Cancelled));
		assert!(is_valid_transition(InProgress, Completed));
		assert!(!is_valid_transition(Initiated, Completed));
		assert!(!is_valid_transition(Completed, Cancelled));
		assert!(!is_valid_transition(Cancelled, InProgress));
		assert!(!is_valid_transition(InProgress, Initiated));
	}

	#[test]
	fn test_create_validation() {
		let mut p = params(vec![A], false);
		p.document_hash = DocumentHash::ZERO;
		assert_eq!(
			ProcessState::create(PROCESS, OWNER, p, 0).unwrap_err(),
			SigningError::InvalidDocumentHash
		);

		let mut p = params(vec![A], false);
		p.content_pointer.clear();
		assert_eq!(
			ProcessState::create(PROCESS, OWNER, p, 0).unwrap_err(),
			SigningError::InvalidContentPointer
		);

		assert_eq!(
			ProcessState::create(PROCESS, OWNER, params(vec![], false), 0).unwrap_err(),
			SigningError::EmptySignerList
		);
		assert_eq!(
			ProcessState::create(PROCESS, OWNER, params(vec![A, Address::ZERO], false), 0)
				.unwrap_err(),
			SigningError::InvalidSignerAddress
		);
		assert_eq!(
			ProcessState::create(PROCESS, OWNER, params(vec![A, B, A], false), 0).unwrap_err(),
			SigningError::DuplicateSigner(A)
		);
	}

	#[test]
	fn test_create_records_initial_version() {
		let (state, event) =
			ProcessState::create(PROCESS, OWNER, params(vec![A, B], true), 100).unwrap();
		assert_eq!(state.status(), ProcessStatus::Initiated);
		assert_eq!(state.progress(), SigningProgress::new(0, 2));
		assert_eq!(state.metadata().versions, vec![H1]);
		assert_eq!(state.metadata().content_pointers, vec!["QmFirst".to_string()]);
		assert_eq!(state.metadata().created_at, 100);
		assert_eq!(state.metadata().creator, OWNER);
		assert_eq!(state.next_signer(), A);
		assert!(matches!(
			event,
			ProcessEvent::ContractCreated { signers, sequential: true, .. } if signers == vec![A, B]
		));
	}

	#[test]
	fn test_sign_records_signature_and_advances() {
		let mut state = state(vec![A, B], true);
		let events = state.sign(A, "ok", 200).unwrap();

		assert_eq!(events.len(), 1);
		assert_eq!(state.status(), ProcessStatus::InProgress);
		assert_eq!(state.next_signer_cursor(), 1);
		assert_eq!(state.signatures()[0].document_version, H1);
		assert_eq!(state.signatures()[0].metadata, "ok");
		assert_eq!(state.signatures()[0].timestamp, 200);

		let events = state.sign(B, "", 201).unwrap();
		assert_eq!(events.len(), 2);
		assert_eq!(state.status(), ProcessStatus::Completed);
		assert_eq!(state.next_signer(), Address::ZERO);
	}

	#[test]
	fn test_sign_error_precedence() {
		let mut state = state(vec![A, B], true);
		state.pause(OWNER).unwrap();

		// Unknown callers are rejected before the pause check
		assert_eq!(
			state.sign(C, "", 0).unwrap_err(),
			SigningError::NotAuthorizedSigner(C)
		);
		assert_eq!(
			state.sign(B, "", 0).unwrap_err(),
			SigningError::Guard(GuardError::Paused)
		);

		state.unpause(OWNER).unwrap();
		state.sign(A, "", 0).unwrap();
		state.cancel(OWNER, 0).unwrap();
		assert_eq!(state.sign(A, "", 0).unwrap_err(), SigningError::AlreadySigned(A));
		assert_eq!(
			state.sign(B, "", 0).unwrap_err(),
			SigningError::ContractAlreadyCompleted(ProcessStatus::Cancelled)
		);
	}

	#[test]
	fn test_replace_signer_rules() {
		let mut state = state(vec![A, B], false);
		let stranger = Address::repeat_byte(0x55);

		assert_eq!(
			state.replace_signer(A, A, C).unwrap_err(),
			SigningError::Guard(GuardError::NotOwner { caller: A })
		);
		assert_eq!(
			state.replace_signer(OWNER, stranger, C).unwrap_err(),
			SigningError::SignerNotFound(stranger)
		);
		assert_eq!(
			state.replace_signer(OWNER, A, B).unwrap_err(),
			SigningError::DuplicateSigner(B)
		);
		assert_eq!(
			state.replace_signer(OWNER, A, Address::ZERO).unwrap_err(),
			SigningError::InvalidSignerAddress
		);

		state.sign(B, "", 0).unwrap();
		assert_eq!(
			state.replace_signer(OWNER, B, C).unwrap_err(),
			SigningError::AlreadySigned(B)
		);

		let events = state.replace_signer(OWNER, A, C).unwrap();
		assert_eq!(
			events,
			vec![ProcessEvent::SignerReplaced {
				process: PROCESS,
				old_signer: A,
				new_signer: C,
				position: 0,
			}]
		);
		assert_eq!(state.required_signers(), &[C, B]);
		assert_eq!(
			state.sign(A, "", 0).unwrap_err(),
			SigningError::NotAuthorizedSigner(A)
		);
		state.sign(C, "", 0).unwrap();
		assert_eq!(state.status(), ProcessStatus::Completed);
	}

	#[test]
	fn test_snapshot_reports_full_signing() {
		let mut state = state(vec![A, B], false);
		assert!(!state.snapshot().is_fully_signed);
		state.sign(A, "", 0).unwrap();
		assert!(!state.snapshot().is_fully_signed);
		state.sign(B, "", 0).unwrap();
		let snapshot = state.snapshot();
		assert!(snapshot.is_fully_signed);
		assert_eq!(snapshot.status, ProcessStatus::Completed);
	}

	#[test]
	fn test_replace_keeps_sequential_turn() {
		let mut state = state(vec![A, B, C], true);
		state.sign(A, "", 0).unwrap();
		let d = Address::repeat_byte(0xd4);
		state.replace_signer(OWNER, B, d).unwrap();
		assert_eq!(state.next_signer(), d);
		assert_eq!(
			state.sign(C, "", 0).unwrap_err(),
			SigningError::InvalidSigningOrder {
				expected: 1,
				actual: 2
			}
		);
		state.sign(d, "", 0).unwrap();
	}

	#[test]
	fn test_cancel_only_from_active_states() {
		let mut state = state(vec![A], false);
		assert!(state.cancel(A, 0).is_err());
		state.cancel(OWNER, 0).unwrap();
		assert_eq!(state.status(), ProcessStatus::Cancelled);
		assert_eq!(
			state.cancel(OWNER, 0).unwrap_err(),
			SigningError::ContractAlreadyCompleted(ProcessStatus::Cancelled)
		);
		assert_eq!(
			state.replace_signer(OWNER, A, B).unwrap_err(),
			SigningError::ContractAlreadyCompleted(ProcessStatus::Cancelled)
		);
	}

	#[test]
	fn test_pointer_update_keeps_history_parallel() {
		let mut state = state(vec![A], false);
		assert_eq!(
			state.update_content_pointer(OWNER, "").unwrap_err(),
			SigningError::InvalidContentPointer
		);

		let events = state.update_content_pointer(OWNER, "QmMoved").unwrap();
		assert_eq!(
			events,
			vec![ProcessEvent::ContentPointerUpdated {
				process: PROCESS,
				old_pointer: "QmFirst".to_string(),
				new_pointer: "QmMoved".to_string(),
			}]
		);
		assert_eq!(state.content_pointer(), "QmMoved");
		assert_eq!(state.document_hash(), H1);
		assert_eq!(state.metadata().versions, vec![H1, H1]);
		assert_eq!(
			state.metadata().content_pointers,
			vec!["QmFirst".to_string(), "QmMoved".to_string()]
		);
	}

	#[test]
	fn test_new_version_keeps_existing_signatures() {
		let h2 = b256!("2222222222222222222222222222222222222222222222222222222222222222");
		let mut state = state(vec![A, B], false);
		state.sign(A, "", 0).unwrap();

		assert_eq!(
			state.add_document_version(OWNER, DocumentHash::ZERO, "QmSecond").unwrap_err(),
			SigningError::InvalidDocumentHash
		);
		let events = state.add_document_version(OWNER, h2, "QmSecond").unwrap();
		assert!(matches!(
			events[0],
			ProcessEvent::DocumentVersionAdded { version: 1, .. }
		));

		state.sign(B, "", 0).unwrap();
		assert_eq!(state.status(), ProcessStatus::Completed);
		assert_eq!(state.signatures()[0].document_version, H1);
		assert_eq!(state.signatures()[1].document_version, h2);
		assert_eq!(state.document_hash(), h2);
	}
}
