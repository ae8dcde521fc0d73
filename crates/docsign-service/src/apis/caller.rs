//! Caller identity extraction.
//!
//! The service sits behind an authenticating gateway which forwards the
//! verified account in the `x-docsign-caller` header.

use alloy_primitives::Address;
use axum::{extract::FromRequestParts, http::request::Parts};
use docsign_types::{APIError, Identity};

pub const CALLER_HEADER: &str = "x-docsign-caller";

/// The authenticated account issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let value = parts
			.headers
			.get(CALLER_HEADER)
			.ok_or_else(|| APIError::Forbidden {
				error_type: "MISSING_CALLER".to_string(),
				message: format!("Request carries no {} header", CALLER_HEADER),
				hint: Some("Send requests through the authenticating gateway".to_string()),
			})?;

		let address = value
			.to_str()
			.ok()
			.and_then(|raw| raw.trim().parse::<Address>().ok())
			.filter(|address| !address.is_zero())
			.ok_or_else(|| APIError::BadRequest {
				error_type: "INVALID_CALLER".to_string(),
				message: format!("{} is not a valid account address", CALLER_HEADER),
			})?;

		Ok(Caller(address))
	}
}

/// Parses an address taken from a URL path segment.
pub fn parse_address(raw: &str) -> Result<Identity, APIError> {
	raw.parse::<Address>().map_err(|_| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".to_string(),
		message: format!("'{}' is not a valid address", raw),
	})
}
