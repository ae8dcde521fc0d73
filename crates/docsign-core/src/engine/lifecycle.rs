//! Lifecycle management for the signing engine.
//!
//! Handles startup and shutdown logging of the engine and its registry.

use super::DocsignEngine;
use docsign_types::short_address;

impl DocsignEngine {
	/// Performs any initialization required before running
	pub async fn initialize(&self) -> Result<(), super::EngineError> {
		tracing::info!(
			service = %self.config.service.id,
			factory = %short_address(&self.factory.address()),
			paused = self.factory.is_paused(),
			"Initializing signing engine"
		);
		Ok(())
	}

	/// Reports what the registry and event journal hold at exit.
	pub async fn shutdown(&self) -> Result<(), super::EngineError> {
		let stats = self.factory.stats();
		tracing::info!(
			processes = stats.total,
			active = stats.active,
			events = self.event_bus.journal().len(),
			"Shutting down signing engine"
		);
		Ok(())
	}
}
