//! Builder pattern for constructing signing engines.
//!
//! Composes a DocsignEngine from the configuration and a map of storage
//! factory functions, so the service decides which backends are compiled in
//! while the configuration decides which one is used.

use crate::clock::{Clock, SystemClock};
use crate::engine::DocsignEngine;
use crate::event_bus::EventBus;
use crate::factory::SigningFactory;
use docsign_config::Config;
use docsign_storage::{
	ContentLimits, ContentService, StorageError, StorageFactory, StorageInterface, StorageService,
};
use docsign_types::short_address;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct DocsignFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

impl DocsignFactories<StorageFactory> {
	/// Every storage backend shipped with docsign-storage.
	pub fn with_defaults() -> Self {
		Self {
			storage_factories: docsign_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

/// Builder for constructing a DocsignEngine with pluggable storage.
pub struct DocsignBuilder {
	config: Config,
	clock: Arc<dyn Clock>,
}

impl DocsignBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: Arc::new(SystemClock),
		}
	}

	/// Replaces the wall clock used to timestamp signatures and registry entries.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	/// Builds the DocsignEngine using the given storage factories.
	pub fn build<SF>(self, factories: DocsignFactories<SF>) -> Result<DocsignEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						storage_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					},
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					},
				}
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::MissingComponent(
				"No valid storage implementations available".into(),
			));
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;

		let content = Arc::new(ContentService::new(
			StorageService::new(storage_backend),
			ContentLimits {
				max_document_size: self.config.storage.max_document_size,
				allowed_extensions: self
					.config
					.storage
					.allowed_extensions
					.iter()
					.map(|ext| ext.to_lowercase())
					.collect(),
			},
		));

		let event_bus = EventBus::new(1000);
		let mut factory = SigningFactory::new(
			self.config.factory.address,
			self.config.factory.owner,
			Arc::new(event_bus.clone()),
			self.clock,
		);
		if self.config.factory.start_paused {
			factory = factory.starting_paused();
		}

		tracing::info!(
			component = "factory",
			address = %short_address(&self.config.factory.address),
			owner = %short_address(&self.config.factory.owner),
			paused = self.config.factory.start_paused,
			"Loaded"
		);

		Ok(DocsignEngine::new(
			self.config,
			Arc::new(factory),
			content,
			event_bus,
		))
	}
}
