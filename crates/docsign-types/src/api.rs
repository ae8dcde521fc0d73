//! API types for the document signing HTTP API.
//!
//! This module defines the request and response bodies of the `/api`
//! endpoints, the status report shared with the engine, and the structured
//! error type that maps ledger failures onto HTTP status codes.

use crate::{
	DocumentHash, Identity, ProcessMetadata, ProcessStatus, SignatureRecord, SigningProgress,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `POST /api/processes`.
///
/// The document must have been uploaded first; its hash is taken from the
/// upload manifest rather than trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcessRequest {
	#[serde(rename = "contentPointer")]
	pub content_pointer: String,
	pub signers: Vec<Identity>,
	#[serde(default)]
	pub sequential: bool,
	pub title: String,
	#[serde(default)]
	pub description: String,
	/// Prepend the caller to the signer list.
	#[serde(rename = "includeInitiator", default)]
	pub include_initiator: bool,
}

/// Response body for `POST /api/processes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcessResponse {
	pub address: Identity,
	#[serde(rename = "documentHash")]
	pub document_hash: DocumentHash,
	#[serde(rename = "contentPointer")]
	pub content_pointer: String,
	pub signers: Vec<Identity>,
}

/// Request body for `POST /api/processes/{address}/sign`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignRequest {
	#[serde(default)]
	pub note: String,
}

/// Request body for `POST /api/processes/{address}/replace-signer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceSignerRequest {
	#[serde(rename = "oldSigner")]
	pub old_signer: Identity,
	#[serde(rename = "newSigner")]
	pub new_signer: Identity,
}

/// Request body for `POST /api/processes/{address}/pointer` and
/// `POST /api/processes/{address}/versions`.
///
/// For a new version the pointer must name an uploaded document; its hash
/// is taken from the upload manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPointerRequest {
	#[serde(rename = "contentPointer")]
	pub content_pointer: String,
}

/// Pause state of the factory, returned by the factory endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryStatus {
	pub address: Identity,
	pub owner: Identity,
	pub paused: bool,
}

/// Query string of `GET /api/processes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProcessesQuery {
	#[serde(default)]
	pub offset: usize,
	#[serde(default = "default_page_limit")]
	pub limit: usize,
	#[serde(rename = "activeOnly", default)]
	pub active_only: bool,
}

fn default_page_limit() -> usize {
	20
}

/// Per-signer line of a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerStatus {
	pub address: Identity,
	pub position: usize,
	pub signed: bool,
}

/// Full status of a signing process, as shown to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatusReport {
	pub address: Identity,
	pub status: ProcessStatus,
	#[serde(rename = "documentHash")]
	pub document_hash: DocumentHash,
	#[serde(rename = "contentPointer")]
	pub content_pointer: String,
	pub progress: SigningProgress,
	#[serde(rename = "completionPercentage")]
	pub completion_percentage: u8,
	#[serde(rename = "isFullySigned")]
	pub is_fully_signed: bool,
	pub sequential: bool,
	/// Next expected signer; absent when not sequential or exhausted.
	#[serde(rename = "nextSigner", skip_serializing_if = "Option::is_none")]
	pub next_signer: Option<Identity>,
	pub paused: bool,
	pub signers: Vec<SignerStatus>,
	pub signatures: Vec<SignatureRecord>,
	pub metadata: ProcessMetadata,
	/// Registry visibility flag; absent for processes unknown to the factory.
	#[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
	pub is_active: Option<bool>,
}

/// One row of an initiator's process listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
	pub address: Identity,
	pub title: String,
	#[serde(rename = "documentHash")]
	pub document_hash: DocumentHash,
	#[serde(rename = "contentPointer")]
	pub content_pointer: String,
	#[serde(rename = "createdAt")]
	pub created_at: u64,
	#[serde(rename = "isActive")]
	pub is_active: bool,
	pub status: ProcessStatus,
	pub progress: SigningProgress,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Suggested next step for the caller
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hint: Option<String>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request or failed validation (400)
	BadRequest { error_type: String, message: String },
	/// Caller is not allowed to perform the operation (403)
	Forbidden {
		error_type: String,
		message: String,
		hint: Option<String>,
	},
	/// Unknown process or document (404)
	NotFound { error_type: String, message: String },
	/// Operation conflicts with the current process state (409)
	Conflict {
		error_type: String,
		message: String,
		hint: Option<String>,
	},
	/// Operation blocked while paused (503)
	ServiceUnavailable { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message, hint) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::ServiceUnavailable {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None),
			APIError::Forbidden {
				error_type,
				message,
				hint,
			}
			| APIError::Conflict {
				error_type,
				message,
				hint,
			} => (error_type, message, hint.clone()),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			hint,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
