//! Off-chain document storage for the signing ledger.
//!
//! Document blobs never live on the ledger; only their content hash and a
//! locator (the content pointer) do. This module provides the key-value
//! backend abstraction, a typed storage service on top of it, and the
//! `ContentService` that uploads, retrieves, hashes and verifies documents.

use async_trait::async_trait;
use docsign_types::{
	current_timestamp, ConfigSchema, DocumentHash, ImplementationRegistry, StorageKey,
	StoredDocument,
};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The uploaded document is empty.
	#[error("Document is empty")]
	EmptyDocument,
	/// The uploaded document exceeds the configured size limit.
	#[error("Document too large: {size} bytes (max: {max} bytes)")]
	TooLarge { size: usize, max: usize },
	/// The uploaded document's file type is not accepted.
	#[error("Unsupported document type: {0}")]
	UnsupportedType(String),
	/// Stored bytes failed their integrity check.
	#[error("Corrupted entry: {0}")]
	Corrupted(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// hold document blobs. It provides plain key-value operations.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service that provides typed operations.
///
/// Keys are formed as `namespace:id`. Typed values are stored as JSON; raw
/// bytes are stored unchanged.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: StorageKey, id: &str) -> String {
		format!("{}:{}", namespace.as_str(), id)
	}

	/// Stores a serializable value, replacing any previous value.
	pub async fn store<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Stores raw bytes, replacing any previous value.
	pub async fn store_bytes(
		&self,
		namespace: StorageKey,
		id: &str,
		bytes: Vec<u8>,
	) -> Result<(), StorageError> {
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves raw bytes.
	pub async fn retrieve_bytes(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<Vec<u8>, StorageError> {
		self.backend.get_bytes(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: StorageKey, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

/// Upload limits applied by the content service.
#[derive(Debug, Clone)]
pub struct ContentLimits {
	/// Maximum accepted blob size in bytes.
	pub max_document_size: usize,
	/// Accepted lower-case file extensions. Empty accepts any file name.
	pub allowed_extensions: Vec<String>,
}

impl Default for ContentLimits {
	fn default() -> Self {
		Self {
			max_document_size: 10 * 1024 * 1024,
			allowed_extensions: ["pdf", "docx", "txt", "png", "jpg", "jpeg"]
				.iter()
				.map(|ext| ext.to_string())
				.collect(),
		}
	}
}

/// Off-chain document store.
///
/// Blobs are content-addressed: uploading the same bytes twice yields the
/// same pointer and does not rewrite the stored blob. The ledger only ever
/// sees the returned pointer and hash.
pub struct ContentService {
	storage: StorageService,
	limits: ContentLimits,
}

impl ContentService {
	pub fn new(storage: StorageService, limits: ContentLimits) -> Self {
		Self { storage, limits }
	}

	/// SHA-256 fingerprint of a blob.
	pub fn hash(blob: &[u8]) -> DocumentHash {
		DocumentHash::from_slice(&Sha256::digest(blob))
	}

	/// Content-addressed pointer for a document hash.
	pub fn pointer_for(hash: &DocumentHash) -> String {
		let hex = hex::encode(hash.as_slice());
		format!("Qm{}", &hex[..44])
	}

	/// Validates and stores a blob, returning its pointer and hash.
	pub async fn upload(&self, blob: &[u8], filename: &str) -> Result<StoredDocument, StorageError> {
		if blob.is_empty() {
			return Err(StorageError::EmptyDocument);
		}
		if blob.len() > self.limits.max_document_size {
			return Err(StorageError::TooLarge {
				size: blob.len(),
				max: self.limits.max_document_size,
			});
		}
		self.check_extension(filename)?;

		let hash = Self::hash(blob);
		let pointer = Self::pointer_for(&hash);

		if self.storage.exists(StorageKey::Manifests, &pointer).await? {
			tracing::debug!(pointer = %pointer, "Document already stored");
			return self.storage.retrieve(StorageKey::Manifests, &pointer).await;
		}

		let document = StoredDocument {
			pointer: pointer.clone(),
			hash,
			size: blob.len(),
			filename: filename.to_string(),
			uploaded_at: current_timestamp(),
		};

		self.storage
			.store_bytes(StorageKey::Documents, &pointer, blob.to_vec())
			.await?;
		self.storage
			.store(StorageKey::Manifests, &pointer, &document)
			.await?;

		tracing::info!(pointer = %pointer, size = blob.len(), "Stored document");
		Ok(document)
	}

	/// Fetches the blob behind a pointer.
	pub async fn retrieve(&self, pointer: &str) -> Result<Vec<u8>, StorageError> {
		if pointer.is_empty() {
			return Err(StorageError::NotFound);
		}
		self.storage
			.retrieve_bytes(StorageKey::Documents, pointer)
			.await
	}

	/// Fetches the upload manifest of a pointer.
	pub async fn manifest(&self, pointer: &str) -> Result<StoredDocument, StorageError> {
		if pointer.is_empty() {
			return Err(StorageError::NotFound);
		}
		self.storage.retrieve(StorageKey::Manifests, pointer).await
	}

	/// Re-hashes the blob behind `pointer` and compares it to `expected`.
	pub async fn verify(&self, pointer: &str, expected: &DocumentHash) -> Result<bool, StorageError> {
		let blob = self.retrieve(pointer).await?;
		Ok(Self::hash(&blob) == *expected)
	}

	fn check_extension(&self, filename: &str) -> Result<(), StorageError> {
		if self.limits.allowed_extensions.is_empty() {
			return Ok(());
		}
		let extension = std::path::Path::new(filename)
			.extension()
			.and_then(|ext| ext.to_str())
			.map(|ext| ext.to_ascii_lowercase())
			.ok_or_else(|| StorageError::UnsupportedType(filename.to_string()))?;

		if self.limits.allowed_extensions.contains(&extension) {
			Ok(())
		} else {
			Err(StorageError::UnsupportedType(extension))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;

	fn service(limits: ContentLimits) -> ContentService {
		ContentService::new(StorageService::new(Box::new(MemoryStorage::new())), limits)
	}

	#[test]
	fn test_hash_is_sha256() {
		let hash = ContentService::hash(b"abc");
		assert_eq!(
			hex::encode(hash),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}

	#[test]
	fn test_pointer_format() {
		let hash = ContentService::hash(b"abc");
		let pointer = ContentService::pointer_for(&hash);
		assert_eq!(pointer.len(), 46);
		assert!(pointer.starts_with("Qmba7816bf"));
	}

	#[tokio::test]
	async fn test_upload_and_retrieve() {
		let content = service(ContentLimits::default());

		let stored = content.upload(b"contract body", "lease.pdf").await.unwrap();
		assert_eq!(stored.size, 13);
		assert_eq!(stored.filename, "lease.pdf");
		assert_eq!(stored.hash, ContentService::hash(b"contract body"));

		let blob = content.retrieve(&stored.pointer).await.unwrap();
		assert_eq!(blob, b"contract body");

		assert!(content.verify(&stored.pointer, &stored.hash).await.unwrap());
		assert!(!content
			.verify(&stored.pointer, &ContentService::hash(b"other"))
			.await
			.unwrap());

		let manifest = content.manifest(&stored.pointer).await.unwrap();
		assert_eq!(manifest, stored);
	}

	#[tokio::test]
	async fn test_upload_is_content_addressed() {
		let content = service(ContentLimits::default());

		let first = content.upload(b"same bytes", "a.txt").await.unwrap();
		let second = content.upload(b"same bytes", "b.txt").await.unwrap();
		assert_eq!(first.pointer, second.pointer);
		// The original manifest is kept
		assert_eq!(second.filename, "a.txt");
	}

	#[tokio::test]
	async fn test_upload_limits() {
		let content = service(ContentLimits {
			max_document_size: 4,
			allowed_extensions: vec!["pdf".into()],
		});

		assert!(matches!(
			content.upload(b"", "a.pdf").await,
			Err(StorageError::EmptyDocument)
		));
		assert!(matches!(
			content.upload(b"12345", "a.pdf").await,
			Err(StorageError::TooLarge { size: 5, max: 4 })
		));
		assert!(matches!(
			content.upload(b"1234", "a.exe").await,
			Err(StorageError::UnsupportedType(ext)) if ext == "exe"
		));
		assert!(matches!(
			content.upload(b"1234", "noextension").await,
			Err(StorageError::UnsupportedType(_))
		));
		assert!(content.upload(b"1234", "A.PDF").await.is_ok());
	}

	#[tokio::test]
	async fn test_retrieve_unknown_pointer() {
		let content = service(ContentLimits::default());
		assert!(matches!(
			content.retrieve("QmUnknown").await,
			Err(StorageError::NotFound)
		));
		assert!(matches!(content.retrieve("").await, Err(StorageError::NotFound)));
	}
}
