//! String formatting utilities.
//!
//! Provides functions for shortening identifiers in log lines, managing hex
//! prefixes and rendering signing progress for display.

use alloy_primitives::Address;

/// Utility function to truncate a hex string for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Renders an address as `0x12345678...9abcdef0` for compact listings.
pub fn short_address(address: &Address) -> String {
	let full = address.to_string();
	format!("{}...{}", &full[..10], &full[full.len() - 8..])
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Percentage of required signers that have signed, rounded down.
///
/// An empty signer set never occurs for a valid process, but reports 0
/// rather than dividing by zero.
pub fn completion_percentage(signed: usize, total: usize) -> u8 {
	if total == 0 {
		return 0;
	}
	((signed.min(total) * 100) / total) as u8
}
