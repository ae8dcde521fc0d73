//! Signing process endpoints.

use super::{
	caller::{parse_address, Caller},
	errors::api_error,
};
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use docsign_types::{
	APIError, CreateProcessRequest, CreateProcessResponse, FactoryStats, ListProcessesQuery, Page,
	ProcessStatusReport, ProcessSummary, SignRequest,
};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct DeactivateResponse {
	pub process: String,
	/// False when the process was already inactive.
	pub deactivated: bool,
}

/// Handles POST /api/processes requests.
pub async fn create(
	State(state): State<AppState>,
	Caller(caller): Caller,
	Json(request): Json<CreateProcessRequest>,
) -> Result<(StatusCode, Json<CreateProcessResponse>), APIError> {
	match state.engine.create_process(caller, request).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Process creation failed: {}", e);
			Err(api_error(e))
		},
	}
}

/// Handles GET /api/processes requests.
pub async fn list(
	State(state): State<AppState>,
	Query(query): Query<ListProcessesQuery>,
) -> Result<Json<Page<ProcessSummary>>, APIError> {
	state
		.engine
		.list_processes(&query)
		.map(Json)
		.map_err(api_error)
}

/// Handles GET /api/processes/{address} requests.
pub async fn status(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	state.engine.status(process).map(Json).map_err(api_error)
}

/// Handles POST /api/processes/{address}/sign requests.
pub async fn sign(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
	Json(request): Json<SignRequest>,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	match state.engine.sign(caller, process, &request.note) {
		Ok(report) => Ok(Json(report)),
		Err(e) => {
			tracing::warn!("Signing rejected: {}", e);
			Err(api_error(e))
		},
	}
}

/// Handles POST /api/processes/{address}/cancel requests.
pub async fn cancel(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
) -> Result<Json<ProcessStatusReport>, APIError> {
	let process = parse_address(&address)?;
	match state.engine.cancel(caller, process) {
		Ok(report) => Ok(Json(report)),
		Err(e) => {
			tracing::warn!("Cancellation rejected: {}", e);
			Err(api_error(e))
		},
	}
}

/// Handles POST /api/processes/{address}/deactivate requests.
pub async fn deactivate(
	State(state): State<AppState>,
	Path(address): Path<String>,
	Caller(caller): Caller,
) -> Result<Json<DeactivateResponse>, APIError> {
	let process = parse_address(&address)?;
	match state.engine.deactivate(caller, process) {
		Ok(deactivated) => Ok(Json(DeactivateResponse {
			process: process.to_string(),
			deactivated,
		})),
		Err(e) => {
			tracing::warn!("Deactivation rejected: {}", e);
			Err(api_error(e))
		},
	}
}

/// Handles GET /api/initiators/{address}/processes requests.
pub async fn by_initiator(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<Vec<ProcessSummary>>, APIError> {
	let initiator = parse_address(&address)?;
	state
		.engine
		.processes_by_initiator(&initiator)
		.map(Json)
		.map_err(api_error)
}

/// Handles GET /api/stats requests.
pub async fn stats(State(state): State<AppState>) -> Json<FactoryStats> {
	Json(state.engine.stats())
}
