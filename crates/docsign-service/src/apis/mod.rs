//! HTTP API handlers for the signing service.

pub mod admin;
pub mod caller;
pub mod documents;
pub mod errors;
pub mod processes;
