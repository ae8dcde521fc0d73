//! Configuration builder for tests and local development.

use crate::{ApiConfig, Config, FactoryConfig, ServiceConfig, StorageConfig};
use docsign_types::Identity;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to an in-memory storage backend and the well-known local
/// development accounts for the factory address and owner.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	factory_address: Identity,
	factory_owner: Identity,
	start_paused: bool,
	storage_primary: String,
	max_document_size: usize,
	allowed_extensions: Vec<String>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "docsign-test".to_string(),
			factory_address: Identity::repeat_byte(0xfa),
			factory_owner: Identity::repeat_byte(0x0e),
			start_paused: false,
			storage_primary: "memory".to_string(),
			max_document_size: 1024 * 1024,
			allowed_extensions: vec!["pdf".to_string(), "txt".to_string()],
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn factory_address(mut self, address: Identity) -> Self {
		self.factory_address = address;
		self
	}

	pub fn factory_owner(mut self, owner: Identity) -> Self {
		self.factory_owner = owner;
		self
	}

	pub fn start_paused(mut self, paused: bool) -> Self {
		self.start_paused = paused;
		self
	}

	/// Sets the primary storage implementation. It is registered with an
	/// empty configuration table.
	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	pub fn max_document_size(mut self, size: usize) -> Self {
		self.max_document_size = size;
		self
	}

	pub fn allowed_extensions(mut self, extensions: Vec<String>) -> Self {
		self.allowed_extensions = extensions;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		implementations.insert(
			self.storage_primary.clone(),
			toml::Value::Table(toml::Table::new()),
		);

		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			factory: FactoryConfig {
				address: self.factory_address,
				owner: self.factory_owner,
				start_paused: self.start_paused,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations,
				max_document_size: self.max_document_size,
				allowed_extensions: self.allowed_extensions,
			},
			api: self.api,
		}
	}
}
