//! Registry types kept by the signing process factory.
//!
//! The factory indexes every process it creates; these types describe one
//! indexed entry, the aggregate counters and the paginated listing format.

use crate::{DocumentHash, Identity};
use serde::{Deserialize, Serialize};

/// Factory-side record of a created signing process.
///
/// `is_active` is a registry visibility flag, independent of the process's
/// own signing status. It starts true and can only be cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
	pub process: Identity,
	pub document_hash: DocumentHash,
	pub content_pointer: String,
	pub initiator: Identity,
	pub created_at: u64,
	pub is_active: bool,
	pub title: String,
}

/// Aggregate counters of a factory registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryStats {
	pub total: usize,
	pub active: usize,
	pub inactive: usize,
}

/// One page of a paginated listing together with the size of the full
/// collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub total: usize,
}

impl<T> Page<T> {
	/// Collects the `[offset, offset + limit)` window of `items`.
	///
	/// The whole iterator is walked to count the total, but only the items
	/// inside the window are kept. An offset at or past the end yields an
	/// empty page; a window running past the end is clipped.
	pub fn window<I>(items: I, offset: usize, limit: usize) -> Self
	where
		I: IntoIterator<Item = T>,
	{
		let end = offset.saturating_add(limit);
		let mut total = 0;
		let mut kept = Vec::new();
		for item in items {
			if total >= offset && total < end {
				kept.push(item);
			}
			total += 1;
		}
		Self { items: kept, total }
	}

	pub fn map<U, F>(self, f: F) -> Page<U>
	where
		F: FnMut(T) -> U,
	{
		Page {
			items: self.items.into_iter().map(f).collect(),
			total: self.total,
		}
	}
}
