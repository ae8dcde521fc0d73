//! Owner-only endpoints.
//!
//! Factory pausing is reserved to the factory owner; the process routes
//! are reserved to the owner of the addressed process. Everything else is
//! rejected with `NOT_OWNER`.

use super::{
	caller::{parse_address, Caller},
	errors::api_error,
};
use axum::{
	extract::{Path, State},
	response::Json,
};
use docsign_core::EngineError;
use docsign_types::{
	APIError, ContentPointerRequest, FactoryStatus, ProcessStatusReport, ReplaceSignerRequest,
};

use crate::server::AppState;

fn rejected(action: &str, error: EngineError) -> APIError {
	tracing::warn!("{} rejected: {}", action, error);
	api_error(error)
}

/// Handles GET /api/factory requests.
pub async fn factory_status(State(state): State<AppState>) -> Json<FactoryStatus> {
	Json(state.engine.factory_status())
}

/// Handles POST /api/factory/pause requests.
pub async fn pause_factory(
	State(state): State<AppState>,
	Caller(caller): Caller,
) -> Result<Json<FactoryStatus>, APIError> {
	state
		.engine
		.pause_factory(caller)
		.map(Json)
		.map_err(|e| rejected("Factory pause", e))
}

/// Handles POST /api/factory/unpause requests.
pub async fn unpause_factory(
	State(state): State<AppState>,
	Caller(caller): Caller,
) -> Result<Json<FactoryStatus>, APIError> {
	state
		.engine
		.unpause_factory(caller)
		.map(Json)
		.map_err(|e| rejected("Factory unpause", e))
}

/// Handles POST /api/processes/{address}/replace-signer requests.
pub async fn replace_signer(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
	Json(request): Json<ReplaceSignerRequest>,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state
		.engine
		.replace_signer(caller, process, &request)
		.map(Json)
		.map_err(|e| rejected("Signer replacement", e))
}

/// Handles POST /api/processes/{address}/pointer requests.
pub async fn update_pointer(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
	Json(request): Json<ContentPointerRequest>,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state
		.engine
		.update_content_pointer(caller, process, &request.content_pointer)
		.map(Json)
		.map_err(|e| rejected("Pointer update", e))
}

/// Handles POST /api/processes/{address}/versions requests.
pub async fn add_version(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
	Json(request): Json<ContentPointerRequest>,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state
		.engine
		.add_document_version(caller, process, &request.content_pointer)
		.await
		.map(Json)
		.map_err(|e| rejected("New version", e))
}

/// Handles POST /api/processes/{address}/pause requests.
pub async fn pause_process(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state
		.engine
		.pause_process(caller, process)
		.map(Json)
		.map_err(|e| rejected("Process pause", e))
}

/// Handles POST /api/processes/{address}/unpause requests.
pub async fn unpause_process(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state
		.engine
		.unpause_process(caller, process)
		.map(Json)
		.map_err(|e| rejected("Process unpause", e))
}
