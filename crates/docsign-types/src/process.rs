//! Signing process types for the document signing ledger.
//!
//! This module defines the data carried by a single document-signing process:
//! its lifecycle status, the signature records it accumulates, the metadata
//! and version history of the document, and the parameters used to create it.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger identity of a participant or a process.
pub type Identity = Address;

/// Fixed-width content fingerprint of a document version.
pub type DocumentHash = B256;

/// Lifecycle status of a signing process.
///
/// Processes start in `Initiated`, move to `InProgress` on the first
/// signature and end in either `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
	/// Created, no signatures yet.
	Initiated,
	/// At least one signature recorded.
	InProgress,
	/// Every required signer has signed.
	Completed,
	/// Cancelled by the owner before completion.
	Cancelled,
}

impl ProcessStatus {
	/// Returns the canonical upper-case name of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			ProcessStatus::Initiated => "INITIATED",
			ProcessStatus::InProgress => "IN_PROGRESS",
			ProcessStatus::Completed => "COMPLETED",
			ProcessStatus::Cancelled => "CANCELLED",
		}
	}

	/// Returns true for statuses that accept no further signatures.
	pub fn is_terminal(&self) -> bool {
		matches!(self, ProcessStatus::Completed | ProcessStatus::Cancelled)
	}
}

impl fmt::Display for ProcessStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single attestation recorded by a required signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
	/// The signer that attested.
	pub signer: Identity,
	/// Ledger timestamp of the signature (Unix seconds).
	pub timestamp: u64,
	/// Document hash that was current when the signature was recorded.
	pub document_version: DocumentHash,
	/// Free-form note supplied by the signer.
	pub metadata: String,
}

/// Descriptive metadata and version history of a process's document.
///
/// `versions` and `content_pointers` are parallel: entry `i` of each is the
/// (hash, pointer) pair assigned `i`-th, and index 0 is the pair at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetadata {
	pub title: String,
	pub description: String,
	pub creator: Identity,
	pub created_at: u64,
	pub versions: Vec<DocumentHash>,
	pub content_pointers: Vec<String>,
}

/// Signed-versus-required counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProgress {
	pub signed: usize,
	pub total: usize,
}

impl SigningProgress {
	pub fn new(signed: usize, total: usize) -> Self {
		Self { signed, total }
	}
}

impl fmt::Display for SigningProgress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.signed, self.total)
	}
}

/// Parameters for creating a signing process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProcessParams {
	/// Hash of the initial document version.
	pub document_hash: DocumentHash,
	/// Off-chain locator of the initial document version.
	pub content_pointer: String,
	/// Participants that must sign, in signing order when sequential.
	pub required_signers: Vec<Identity>,
	/// Whether signers must sign in `required_signers` order.
	pub sequential: bool,
	pub title: String,
	pub description: String,
}

/// Point-in-time copy of a process's full state, suitable for persisting
/// or returning from an API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
	pub address: Identity,
	pub owner: Identity,
	pub document_hash: DocumentHash,
	pub content_pointer: String,
	pub required_signers: Vec<Identity>,
	pub signatures: Vec<SignatureRecord>,
	pub status: ProcessStatus,
	pub sequential: bool,
	pub next_signer_cursor: usize,
	pub paused: bool,
	/// Every current required signer has a signature on record.
	pub is_fully_signed: bool,
	pub metadata: ProcessMetadata,
}
