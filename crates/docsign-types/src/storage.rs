//! Off-chain document storage types.

use crate::DocumentHash;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Storage namespaces used by the content service.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Raw document bytes, keyed by content pointer.
	Documents,
	/// Upload manifests (`StoredDocument`), keyed by content pointer.
	Manifests,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Documents => "documents",
			StorageKey::Manifests => "manifests",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Documents, Self::Manifests].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"documents" => Ok(Self::Documents),
			"manifests" => Ok(Self::Manifests),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Result of uploading a document blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
	/// Content-addressed locator of the blob.
	pub pointer: String,
	/// Content fingerprint of the blob.
	pub hash: DocumentHash,
	/// Blob size in bytes.
	pub size: usize,
	/// Original file name supplied at upload.
	pub filename: String,
	/// Upload time (Unix seconds).
	pub uploaded_at: u64,
}
