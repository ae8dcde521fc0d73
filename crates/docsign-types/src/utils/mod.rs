//! Utility functions shared across the document signing workspace.
//!
//! Formatting helpers for logs and API output, plus the wall-clock helper
//! used wherever a ledger timestamp is needed outside an injected clock.

pub mod formatting;

pub use formatting::{completion_percentage, short_address, truncate_id, with_0x_prefix};

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to zero if the system clock is set before the epoch.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
