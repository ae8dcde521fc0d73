//! Core of the document signing ledger.
//!
//! This crate holds the signing process state machine and the contracts that
//! wrap it, the factory that creates and indexes processes, the access and
//! lifecycle guards they share, and the engine that ties them to off-chain
//! document storage and the event bus.

pub mod builder;
pub mod clock;
pub mod contract;
pub mod engine;
pub mod event_bus;
pub mod factory;
pub mod guards;
pub mod state;

pub use builder::{BuilderError, DocsignBuilder, DocsignFactories};
pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::SigningContract;
pub use engine::{DocsignEngine, DocumentSubmission, EngineError};
pub use event_bus::{AuditLog, EventBus, EventSink, LoggedEvent};
pub use factory::{FactoryError, SigningFactory};
pub use guards::{only_owner, GuardError, Pausable, ReentrancyGuard};
pub use state::{ProcessState, SigningError};
