//! HTTP server for the document signing API.
//!
//! Every route lives under `/api`. Mutating routes identify the caller
//! through the `x-docsign-caller` header.

use crate::apis::{admin, documents, processes};
use axum::{
	extract::DefaultBodyLimit,
	routing::{get, post},
	Router,
};
use docsign_config::ApiConfig;
use docsign_core::DocsignEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the signing engine for processing requests.
	pub engine: Arc<DocsignEngine>,
}

/// Builds the API router.
///
/// Request bodies may be as large as the biggest accepted document plus
/// some headroom for JSON routes.
pub fn router(engine: Arc<DocsignEngine>) -> Router {
	let body_limit = engine.config().storage.max_document_size + 64 * 1024;

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/documents", post(documents::upload))
				.route("/processes", post(processes::create).get(processes::list))
				.route("/processes/{address}", get(processes::status))
				.route("/processes/{address}/sign", post(processes::sign))
				.route("/processes/{address}/cancel", post(processes::cancel))
				.route("/processes/{address}/deactivate", post(processes::deactivate))
				.route("/processes/{address}/replace-signer", post(admin::replace_signer))
				.route("/processes/{address}/pointer", post(admin::update_pointer))
				.route("/processes/{address}/versions", post(admin::add_version))
				.route("/processes/{address}/pause", post(admin::pause_process))
				.route("/processes/{address}/unpause", post(admin::unpause_process))
				.route("/processes/{address}/document", get(documents::retrieve))
				.route("/processes/{address}/verify", get(documents::verify))
				.route("/initiators/{address}/processes", get(processes::by_initiator))
				.route("/stats", get(processes::stats))
				.route("/factory", get(admin::factory_status))
				.route("/factory/pause", post(admin::pause_factory))
				.route("/factory/unpause", post(admin::unpause_factory)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(body_limit)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<DocsignEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Docsign API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
