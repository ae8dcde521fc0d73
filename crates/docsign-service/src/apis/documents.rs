//! Document upload, retrieval and integrity endpoints.
//!
//! Uploads take the raw document bytes as the request body and the file
//! name as a query parameter. The returned pointer is what a signing
//! process is later opened against.

use super::{caller::parse_address, errors::api_error};
use axum::{
	body::Bytes,
	extract::{Path, Query, State},
	http::{header, StatusCode},
	response::{IntoResponse, Json},
};
use docsign_types::{APIError, StoredDocument};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
	pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
	pub process: String,
	pub matches: bool,
}

/// Handles POST /api/documents requests.
pub async fn upload(
	State(state): State<AppState>,
	Query(query): Query<UploadQuery>,
	body: Bytes,
) -> Result<(StatusCode, Json<StoredDocument>), APIError> {
	tracing::debug!(filename = %query.filename, size = body.len(), "Uploading document");

	match state.engine.upload_document(&body, &query.filename).await {
		Ok(document) => Ok((StatusCode::CREATED, Json(document))),
		Err(e) => {
			tracing::warn!("Document upload failed: {}", e);
			Err(api_error(e))
		},
	}
}

/// Handles GET /api/processes/{address}/document requests.
pub async fn retrieve(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<impl IntoResponse, APIError> {
	let process = parse_address(&address)?;
	let blob = state
		.engine
		.retrieve_document(process)
		.await
		.map_err(api_error)?;
	Ok(([(header::CONTENT_TYPE, "application/octet-stream")], blob))
}

/// Handles GET /api/processes/{address}/verify requests.
pub async fn verify(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<VerifyResponse>, APIError> {
	let process = parse_address(&address)?;
	let matches = state
		.engine
		.verify_document(process)
		.await
		.map_err(api_error)?;
	Ok(Json(VerifyResponse {
		process: process.to_string(),
		matches,
	}))
}
