//! Registry trait for self-registering backend implementations.
//!
//! Every pluggable backend (currently the storage backends) exposes a
//! `Registry` type implementing this trait, so the service can assemble its
//! factory map from names that match the TOML configuration.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "memory" for `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
