//! Common types module for the document signing ledger.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: identities and document hashes, signing process state, factory
//! registry entries, ledger events, storage namespaces and the HTTP API
//! surface.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Ledger event types emitted by processes and the factory.
pub mod events;
/// Factory registry entries, statistics and pagination.
pub mod factory;
/// Signing process state, signature records and creation parameters.
pub mod process;
/// Self-registration trait for pluggable backends.
pub mod registry;
/// Off-chain document storage types.
pub mod storage;
/// Formatting and time helpers.
pub mod utils;
/// Configuration validation types for backend schemas.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use events::*;
pub use factory::*;
pub use process::*;
pub use registry::*;
pub use storage::*;
pub use utils::{
	completion_percentage, current_timestamp, short_address, truncate_id, with_0x_prefix,
};
pub use validation::*;
