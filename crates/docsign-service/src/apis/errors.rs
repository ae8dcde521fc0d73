//! Maps engine errors onto HTTP API errors.

use docsign_core::{EngineError, FactoryError, GuardError, SigningError};
use docsign_storage::StorageError;
use docsign_types::{APIError, ProcessStatus};

fn bad_request(error_type: &str, message: String) -> APIError {
	APIError::BadRequest {
		error_type: error_type.to_string(),
		message,
	}
}

fn forbidden(error_type: &str, message: String, hint: &str) -> APIError {
	APIError::Forbidden {
		error_type: error_type.to_string(),
		message,
		hint: Some(hint.to_string()),
	}
}

fn conflict(error_type: &str, message: String, hint: Option<String>) -> APIError {
	APIError::Conflict {
		error_type: error_type.to_string(),
		message,
		hint,
	}
}

fn paused(message: String) -> APIError {
	APIError::ServiceUnavailable {
		error_type: "PAUSED".to_string(),
		message,
	}
}

fn guard_error(error: GuardError) -> APIError {
	let message = error.to_string();
	match error {
		GuardError::NotOwner { .. } => {
			forbidden("NOT_OWNER", message, "Only the owner can do this")
		},
		GuardError::Paused => paused(message),
		GuardError::NotPaused => conflict("NOT_PAUSED", message, None),
		GuardError::ReentrantCall => conflict("REENTRANT_CALL", message, None),
	}
}

fn signing_error(error: SigningError) -> APIError {
	let message = error.to_string();
	match error {
		SigningError::InvalidDocumentHash
		| SigningError::InvalidContentPointer
		| SigningError::EmptySignerList
		| SigningError::InvalidSignerAddress
		| SigningError::DuplicateSigner(_)
		| SigningError::SignerNotFound(_) => bad_request("INVALID_PARAMETERS", message),
		SigningError::NotAuthorizedSigner(_) => forbidden(
			"NOT_AUTHORIZED_SIGNER",
			message,
			"Only the listed signers can sign this document",
		),
		SigningError::AlreadySigned(_) => conflict(
			"ALREADY_SIGNED",
			message,
			Some("Each signer signs once".to_string()),
		),
		SigningError::ContractAlreadyCompleted(status) => {
			let hint = match status {
				ProcessStatus::Cancelled => "This signing process was cancelled",
				_ => "This document is already fully signed",
			};
			conflict("PROCESS_CLOSED", message, Some(hint.to_string()))
		},
		SigningError::InvalidSigningOrder { expected, actual } => conflict(
			"OUT_OF_ORDER",
			message,
			Some(format!(
				"Wait for your turn: {} signer(s) ahead of you have not signed yet",
				actual.saturating_sub(expected)
			)),
		),
		SigningError::InvalidTransition { .. } => conflict("INVALID_TRANSITION", message, None),
		SigningError::Guard(guard) => guard_error(guard),
	}
}

fn factory_error(error: FactoryError) -> APIError {
	let message = error.to_string();
	match error {
		FactoryError::InvalidParameters(_) => bad_request("INVALID_PARAMETERS", message),
		FactoryError::CreationFailed(inner) => signing_error(inner),
		FactoryError::FactoryPaused => paused(message),
		FactoryError::ProcessNotFound(_) => APIError::NotFound {
			error_type: "PROCESS_NOT_FOUND".to_string(),
			message,
		},
		FactoryError::UnauthorizedAccess(_) => forbidden(
			"UNAUTHORIZED",
			message,
			"Only the initiator or the factory owner can do this",
		),
		FactoryError::Guard(guard) => guard_error(guard),
	}
}

fn storage_error(error: StorageError) -> APIError {
	let message = error.to_string();
	match error {
		StorageError::NotFound => APIError::NotFound {
			error_type: "DOCUMENT_NOT_FOUND".to_string(),
			message,
		},
		StorageError::EmptyDocument
		| StorageError::TooLarge { .. }
		| StorageError::UnsupportedType(_) => bad_request("INVALID_DOCUMENT", message),
		_ => APIError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message,
		},
	}
}

/// Converts an engine error into the API error returned to the client.
pub fn api_error(error: EngineError) -> APIError {
	match error {
		EngineError::Signing(e) => signing_error(e),
		EngineError::Factory(e) => factory_error(e),
		EngineError::Storage(e) => storage_error(e),
		EngineError::Config(message) => APIError::InternalServerError {
			error_type: "CONFIGURATION_ERROR".to_string(),
			message,
		},
	}
}
