//! Ledger event types.
//!
//! Every state-changing operation on a signing process or on the factory
//! emits one or more of these events. Downstream indexers consume them in
//! emission order, so the order is part of the public contract.

use crate::{DocumentHash, Identity};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all ledger events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocsignEvent {
	/// Events emitted by an individual signing process.
	Process(ProcessEvent),
	/// Events emitted by the process factory.
	Factory(FactoryEvent),
}

impl DocsignEvent {
	/// Short event name, as an indexer would key it.
	pub fn name(&self) -> &'static str {
		match self {
			DocsignEvent::Process(event) => event.name(),
			DocsignEvent::Factory(event) => event.name(),
		}
	}
}

/// Events emitted by a signing process. Each carries the process address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessEvent {
	ContractCreated {
		process: Identity,
		creator: Identity,
		document_hash: DocumentHash,
		content_pointer: String,
		signers: Vec<Identity>,
		sequential: bool,
	},
	DocumentSigned {
		process: Identity,
		signer: Identity,
		position: usize,
		document_hash: DocumentHash,
		timestamp: u64,
	},
	SigningCompleted {
		process: Identity,
		document_hash: DocumentHash,
		timestamp: u64,
	},
	SignerReplaced {
		process: Identity,
		old_signer: Identity,
		new_signer: Identity,
		position: usize,
	},
	ContractCancelled {
		process: Identity,
		cancelled_by: Identity,
		timestamp: u64,
	},
	ContentPointerUpdated {
		process: Identity,
		old_pointer: String,
		new_pointer: String,
	},
	DocumentVersionAdded {
		process: Identity,
		version: usize,
		document_hash: DocumentHash,
		content_pointer: String,
	},
	Paused {
		process: Identity,
		account: Identity,
	},
	Unpaused {
		process: Identity,
		account: Identity,
	},
}

impl ProcessEvent {
	pub fn name(&self) -> &'static str {
		match self {
			ProcessEvent::ContractCreated { .. } => "ContractCreated",
			ProcessEvent::DocumentSigned { .. } => "DocumentSigned",
			ProcessEvent::SigningCompleted { .. } => "SigningCompleted",
			ProcessEvent::SignerReplaced { .. } => "SignerReplaced",
			ProcessEvent::ContractCancelled { .. } => "ContractCancelled",
			ProcessEvent::ContentPointerUpdated { .. } => "ContentPointerUpdated",
			ProcessEvent::DocumentVersionAdded { .. } => "DocumentVersionAdded",
			ProcessEvent::Paused { .. } => "Paused",
			ProcessEvent::Unpaused { .. } => "Unpaused",
		}
	}

	/// Address of the process that emitted the event.
	pub fn process(&self) -> Identity {
		match self {
			ProcessEvent::ContractCreated { process, .. }
			| ProcessEvent::DocumentSigned { process, .. }
			| ProcessEvent::SigningCompleted { process, .. }
			| ProcessEvent::SignerReplaced { process, .. }
			| ProcessEvent::ContractCancelled { process, .. }
			| ProcessEvent::ContentPointerUpdated { process, .. }
			| ProcessEvent::DocumentVersionAdded { process, .. }
			| ProcessEvent::Paused { process, .. }
			| ProcessEvent::Unpaused { process, .. } => *process,
		}
	}
}

/// Events emitted by the process factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactoryEvent {
	ProcessCreated {
		process: Identity,
		initiator: Identity,
		document_hash: DocumentHash,
		content_pointer: String,
		title: String,
	},
	ProcessDeactivated {
		process: Identity,
		deactivated_by: Identity,
	},
	FactoryPaused {
		account: Identity,
	},
	FactoryUnpaused {
		account: Identity,
	},
}

impl FactoryEvent {
	pub fn name(&self) -> &'static str {
		match self {
			FactoryEvent::ProcessCreated { .. } => "ProcessCreated",
			FactoryEvent::ProcessDeactivated { .. } => "ProcessDeactivated",
			FactoryEvent::FactoryPaused { .. } => "FactoryPaused",
			FactoryEvent::FactoryUnpaused { .. } => "FactoryUnpaused",
		}
	}
}
