//! Document signing engine.
//!
//! `DocsignEngine` ties the factory, the off-chain content store and the
//! event bus together into the workflows the service exposes: uploading a
//! document and opening a signing process for it, signing, cancelling,
//! deactivating, and reporting on processes.

pub mod lifecycle;
pub mod report;

use crate::event_bus::EventBus;
use crate::factory::{FactoryError, SigningFactory};
use crate::state::SigningError;
use docsign_config::Config;
use docsign_storage::{ContentService, StorageError};
use docsign_types::{
	short_address, CreateProcessParams, CreateProcessRequest, CreateProcessResponse, DocsignEvent,
	FactoryStats, FactoryStatus, Identity, ListProcessesQuery, Page, ProcessStatusReport,
	ProcessSummary, ReplaceSignerRequest, StoredDocument,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::instrument;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Signing(#[from] SigningError),
	#[error(transparent)]
	Factory(#[from] FactoryError),
	#[error(transparent)]
	Storage(#[from] StorageError),
}

/// A document blob plus everything needed to open a signing process for it.
#[derive(Debug, Clone)]
pub struct DocumentSubmission {
	pub blob: Vec<u8>,
	pub filename: String,
	pub signers: Vec<Identity>,
	pub sequential: bool,
	pub title: String,
	pub description: String,
	/// Put the initiator first in the signer list.
	pub include_initiator: bool,
}

/// Main engine driving the signing workflows.
#[derive(Clone)]
pub struct DocsignEngine {
	pub(crate) config: Config,
	pub(crate) factory: Arc<SigningFactory>,
	pub(crate) content: Arc<ContentService>,
	pub(crate) event_bus: EventBus,
}

/// Builds the final signer list: optional initiator first, then `signers`,
/// keeping the first occurrence of each identity.
fn signer_list(initiator: Identity, signers: &[Identity], include_initiator: bool) -> Vec<Identity> {
	let mut seen = HashSet::new();
	include_initiator
		.then_some(initiator)
		.into_iter()
		.chain(signers.iter().copied())
		.filter(|signer| seen.insert(*signer))
		.collect()
}

impl DocsignEngine {
	pub fn new(
		config: Config,
		factory: Arc<SigningFactory>,
		content: Arc<ContentService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			config,
			factory,
			content,
			event_bus,
		}
	}

	/// Stores a document off-chain and returns its pointer and hash.
	pub async fn upload_document(
		&self,
		blob: &[u8],
		filename: &str,
	) -> Result<StoredDocument, EngineError> {
		Ok(self.content.upload(blob, filename).await?)
	}

	/// Opens a signing process for an already uploaded document.
	///
	/// The document hash is taken from the upload manifest of
	/// `request.content_pointer`.
	#[instrument(skip_all, fields(initiator = %short_address(&caller)))]
	pub async fn create_process(
		&self,
		caller: Identity,
		request: CreateProcessRequest,
	) -> Result<CreateProcessResponse, EngineError> {
		let document = self.content.manifest(&request.content_pointer).await?;
		self.open_process(
			caller,
			document,
			&request.signers,
			request.include_initiator,
			request.sequential,
			request.title,
			request.description,
		)
	}

	/// Uploads a document and opens a signing process for it.
	#[instrument(skip_all, fields(initiator = %short_address(&caller)))]
	pub async fn submit_document(
		&self,
		caller: Identity,
		submission: DocumentSubmission,
	) -> Result<CreateProcessResponse, EngineError> {
		let document = self
			.content
			.upload(&submission.blob, &submission.filename)
			.await?;
		self.open_process(
			caller,
			document,
			&submission.signers,
			submission.include_initiator,
			submission.sequential,
			submission.title,
			submission.description,
		)
	}

	#[allow(clippy::too_many_arguments)]
	fn open_process(
		&self,
		caller: Identity,
		document: StoredDocument,
		signers: &[Identity],
		include_initiator: bool,
		sequential: bool,
		title: String,
		description: String,
	) -> Result<CreateProcessResponse, EngineError> {
		let signers = signer_list(caller, signers, include_initiator);
		let params = CreateProcessParams {
			document_hash: document.hash,
			content_pointer: document.pointer.clone(),
			required_signers: signers.clone(),
			sequential,
			title,
			description,
		};
		let address = self.factory.create_signing_process(caller, params)?;

		Ok(CreateProcessResponse {
			address,
			document_hash: document.hash,
			content_pointer: document.pointer,
			signers,
		})
	}

	/// Signs a process as `caller` and returns its updated status.
	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn sign(
		&self,
		caller: Identity,
		process: Identity,
		note: &str,
	) -> Result<ProcessStatusReport, EngineError> {
		self.factory.process(&process)?.sign(caller, note)?;
		self.status(process)
	}

	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn cancel(&self, caller: Identity, process: Identity) -> Result<ProcessStatusReport, EngineError> {
		self.factory.process(&process)?.cancel(caller)?;
		self.status(process)
	}

	/// Swaps a signer who has not signed yet. Process owner only.
	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn replace_signer(
		&self,
		caller: Identity,
		process: Identity,
		request: &ReplaceSignerRequest,
	) -> Result<ProcessStatusReport, EngineError> {
		self.factory.process(&process)?.replace_signer(
			caller,
			request.old_signer,
			request.new_signer,
		)?;
		self.status(process)
	}

	/// Moves the current document to a new storage location.
	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn update_content_pointer(
		&self,
		caller: Identity,
		process: Identity,
		pointer: &str,
	) -> Result<ProcessStatusReport, EngineError> {
		self.factory
			.process(&process)?
			.update_content_pointer(caller, pointer)?;
		self.status(process)
	}

	/// Makes an uploaded document the current version of a process.
	///
	/// The version hash is taken from the upload manifest of `pointer`.
	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub async fn add_document_version(
		&self,
		caller: Identity,
		process: Identity,
		pointer: &str,
	) -> Result<ProcessStatusReport, EngineError> {
		let contract = self.factory.process(&process)?;
		let document = self.content.manifest(pointer).await?;
		contract.add_document_version(caller, document.hash, &document.pointer)?;
		self.status(process)
	}

	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn pause_process(
		&self,
		caller: Identity,
		process: Identity,
	) -> Result<ProcessStatusReport, EngineError> {
		self.factory.process(&process)?.pause(caller)?;
		self.status(process)
	}

	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn unpause_process(
		&self,
		caller: Identity,
		process: Identity,
	) -> Result<ProcessStatusReport, EngineError> {
		self.factory.process(&process)?.unpause(caller)?;
		self.status(process)
	}

	/// Blocks process creation. Factory owner only.
	#[instrument(skip_all, fields(by = %short_address(&caller)))]
	pub fn pause_factory(&self, caller: Identity) -> Result<FactoryStatus, EngineError> {
		self.factory.pause(caller)?;
		Ok(self.factory_status())
	}

	#[instrument(skip_all, fields(by = %short_address(&caller)))]
	pub fn unpause_factory(&self, caller: Identity) -> Result<FactoryStatus, EngineError> {
		self.factory.unpause(caller)?;
		Ok(self.factory_status())
	}

	pub fn factory_status(&self) -> FactoryStatus {
		FactoryStatus {
			address: self.factory.address(),
			owner: self.factory.owner(),
			paused: self.factory.is_paused(),
		}
	}

	/// Hides a process from active listings. Returns whether anything changed.
	#[instrument(skip_all, fields(process = %short_address(&process)))]
	pub fn deactivate(&self, caller: Identity, process: Identity) -> Result<bool, EngineError> {
		Ok(self.factory.deactivate_process(caller, process)?)
	}

	/// Full status report of a process.
	pub fn status(&self, process: Identity) -> Result<ProcessStatusReport, EngineError> {
		let snapshot = self.factory.process(&process)?.snapshot();
		let is_active = self
			.factory
			.process_info(&process)
			.ok()
			.map(|entry| entry.is_active);
		Ok(report::status_report(&snapshot, is_active))
	}

	/// Every process opened by `initiator`, with its live status.
	pub fn processes_by_initiator(
		&self,
		initiator: &Identity,
	) -> Result<Vec<ProcessSummary>, EngineError> {
		self.factory
			.processes_by_initiator(initiator)
			.iter()
			.map(|process| self.summary(process))
			.collect()
	}

	/// One page of the registry, optionally restricted to active processes.
	pub fn list_processes(
		&self,
		query: &ListProcessesQuery,
	) -> Result<Page<ProcessSummary>, EngineError> {
		let page = if query.active_only {
			self.factory.active_processes(query.offset, query.limit)
		} else {
			self.factory.all_processes(query.offset, query.limit)
		};
		let items = page
			.items
			.iter()
			.map(|entry| self.summary(&entry.process))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Page {
			items,
			total: page.total,
		})
	}

	fn summary(&self, process: &Identity) -> Result<ProcessSummary, EngineError> {
		let entry = self.factory.process_info(process)?;
		let snapshot = self.factory.process(process)?.snapshot();
		Ok(report::summary(&entry, &snapshot))
	}

	pub fn stats(&self) -> FactoryStats {
		self.factory.stats()
	}

	/// Fetches the current document version of a process.
	pub async fn retrieve_document(&self, process: Identity) -> Result<Vec<u8>, EngineError> {
		let pointer = self.factory.process(&process)?.content_pointer();
		Ok(self.content.retrieve(&pointer).await?)
	}

	/// Checks the stored blob of the current version against the recorded hash.
	pub async fn verify_document(&self, process: Identity) -> Result<bool, EngineError> {
		let contract = self.factory.process(&process)?;
		let (pointer, hash) = (contract.content_pointer(), contract.document_hash());
		let matches = self.content.verify(&pointer, &hash).await?;
		if !matches {
			tracing::warn!(
				process = %short_address(&process),
				pointer = %pointer,
				"Stored document does not match the recorded hash"
			);
		}
		Ok(matches)
	}

	/// Logs every ledger event until shutdown is requested.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();

		loop {
			tokio::select! {
				received = events.recv() => match received {
					Ok(event) => log_event(&event),
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "Event log fell behind");
					}
					Err(RecvError::Closed) => break,
				},

				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		Ok(())
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn factory(&self) -> &Arc<SigningFactory> {
		&self.factory
	}

	pub fn content(&self) -> &Arc<ContentService> {
		&self.content
	}
}

fn log_event(event: &DocsignEvent) {
	match event {
		DocsignEvent::Process(event) => {
			tracing::info!(
				event = event.name(),
				process = %short_address(&event.process()),
				"Ledger event"
			);
		},
		DocsignEvent::Factory(event) => {
			tracing::info!(event = event.name(), "Ledger event");
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::{DocsignBuilder, DocsignFactories};
	use alloy_primitives::{address, Address};
	use docsign_config::builders::config::ConfigBuilder;
	use crate::guards::GuardError;
	use docsign_types::ProcessStatus;

	const ALICE: Address = address!("a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
	const BOB: Address = address!("b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2");
	const CAROL: Address = address!("c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3");

	fn engine() -> DocsignEngine {
		DocsignBuilder::new(ConfigBuilder::new().build())
			.build(DocsignFactories::with_defaults())
			.unwrap()
	}

	fn submission(signers: Vec<Address>, include_initiator: bool) -> DocumentSubmission {
		DocumentSubmission {
			blob: b"%PDF-1.7 agreement".to_vec(),
			filename: "agreement.pdf".to_string(),
			signers,
			sequential: false,
			title: "Agreement".to_string(),
			description: "Supplier terms".to_string(),
			include_initiator,
		}
	}

	#[test]
	fn test_signer_list_dedupes_in_order() {
		assert_eq!(
			signer_list(ALICE, &[BOB, CAROL, BOB], false),
			vec![BOB, CAROL]
		);
		assert_eq!(
			signer_list(ALICE, &[BOB, ALICE, CAROL], true),
			vec![ALICE, BOB, CAROL]
		);
		assert!(signer_list(ALICE, &[], false).is_empty());
	}

	#[tokio::test]
	async fn test_submit_document_end_to_end() {
		let engine = engine();
		let response = engine
			.submit_document(ALICE, submission(vec![BOB, BOB], true))
			.await
			.unwrap();

		assert_eq!(response.signers, vec![ALICE, BOB]);
		assert_eq!(
			response.document_hash,
			ContentService::hash(b"%PDF-1.7 agreement")
		);
		assert!(response.content_pointer.starts_with("Qm"));

		let report = engine.sign(ALICE, response.address, "approved").unwrap();
		assert_eq!(report.status, ProcessStatus::InProgress);
		assert_eq!(report.completion_percentage, 50);
		assert!(report.signers[0].signed);
		assert!(!report.signers[1].signed);

		let report = engine.sign(BOB, response.address, "").unwrap();
		assert_eq!(report.status, ProcessStatus::Completed);
		assert!(report.is_fully_signed);
		assert_eq!(report.is_active, Some(true));

		assert_eq!(
			engine.retrieve_document(response.address).await.unwrap(),
			b"%PDF-1.7 agreement"
		);
		assert!(engine.verify_document(response.address).await.unwrap());

		let names = engine.event_bus().journal().names();
		assert_eq!(
			names,
			vec![
				"ContractCreated",
				"ProcessCreated",
				"DocumentSigned",
				"DocumentSigned",
				"SigningCompleted"
			]
		);
	}

	#[tokio::test]
	async fn test_create_process_uses_manifest_hash() {
		let engine = engine();
		let stored = engine
			.upload_document(b"terms", "terms.txt")
			.await
			.unwrap();

		let response = engine
			.create_process(
				ALICE,
				CreateProcessRequest {
					content_pointer: stored.pointer.clone(),
					signers: vec![BOB],
					sequential: true,
					title: "Terms".to_string(),
					description: String::new(),
					include_initiator: false,
				},
			)
			.await
			.unwrap();
		assert_eq!(response.document_hash, stored.hash);

		let report = engine.status(response.address).unwrap();
		assert!(report.sequential);
		assert_eq!(report.next_signer, Some(BOB));
	}

	#[tokio::test]
	async fn test_create_process_requires_upload() {
		let engine = engine();
		let result = engine
			.create_process(
				ALICE,
				CreateProcessRequest {
					content_pointer: "QmNeverUploaded".to_string(),
					signers: vec![BOB],
					sequential: false,
					title: String::new(),
					description: String::new(),
					include_initiator: false,
				},
			)
			.await;
		assert!(matches!(
			result,
			Err(EngineError::Storage(StorageError::NotFound))
		));
	}

	#[tokio::test]
	async fn test_empty_signer_list_is_rejected() {
		let engine = engine();
		let result = engine.submit_document(ALICE, submission(vec![], false)).await;
		assert!(matches!(
			result,
			Err(EngineError::Factory(FactoryError::InvalidParameters(_)))
		));
	}

	#[tokio::test]
	async fn test_processes_by_initiator_and_listing() {
		let engine = engine();
		let first = engine
			.submit_document(ALICE, submission(vec![BOB], false))
			.await
			.unwrap();
		let second = engine
			.submit_document(ALICE, submission(vec![CAROL], false))
			.await
			.unwrap();
		engine
			.submit_document(BOB, submission(vec![ALICE], false))
			.await
			.unwrap();

		engine.sign(BOB, first.address, "").unwrap();
		assert!(engine.deactivate(ALICE, second.address).unwrap());
		assert!(!engine.deactivate(ALICE, second.address).unwrap());

		let mine = engine.processes_by_initiator(&ALICE).unwrap();
		assert_eq!(mine.len(), 2);
		assert_eq!(mine[0].status, ProcessStatus::Completed);
		assert_eq!(mine[0].progress.to_string(), "1/1");
		assert!(!mine[1].is_active);

		let page = engine
			.list_processes(&ListProcessesQuery {
				offset: 0,
				limit: 10,
				active_only: true,
			})
			.unwrap();
		assert_eq!(page.total, 2);

		let stats = engine.stats();
		assert_eq!((stats.total, stats.active, stats.inactive), (3, 2, 1));
	}

	#[tokio::test]
	async fn test_unknown_process() {
		let engine = engine();
		let unknown = Address::repeat_byte(0x42);
		assert!(matches!(
			engine.status(unknown),
			Err(EngineError::Factory(FactoryError::ProcessNotFound(p))) if p == unknown
		));
		assert!(matches!(
			engine.retrieve_document(unknown).await,
			Err(EngineError::Factory(FactoryError::ProcessNotFound(_)))
		));
	}

	#[tokio::test]
	async fn test_cancel_through_engine() {
		let engine = engine();
		let response = engine
			.submit_document(ALICE, submission(vec![BOB], false))
			.await
			.unwrap();

		assert!(matches!(
			engine.cancel(BOB, response.address),
			Err(EngineError::Signing(SigningError::Guard(_)))
		));
		let report = engine.cancel(ALICE, response.address).unwrap();
		assert_eq!(report.status, ProcessStatus::Cancelled);
		assert!(matches!(
			engine.sign(BOB, response.address, ""),
			Err(EngineError::Signing(SigningError::ContractAlreadyCompleted(
				ProcessStatus::Cancelled
			)))
		));
	}

	#[tokio::test]
	async fn test_start_paused_factory_is_resumed_by_owner() {
		let owner = Address::repeat_byte(0x0e);
		let engine = DocsignBuilder::new(ConfigBuilder::new().start_paused(true).build())
			.build(DocsignFactories::with_defaults())
			.unwrap();
		assert!(engine.factory_status().paused);

		assert!(matches!(
			engine.submit_document(ALICE, submission(vec![BOB], false)).await,
			Err(EngineError::Factory(FactoryError::FactoryPaused))
		));
		assert!(matches!(
			engine.unpause_factory(ALICE),
			Err(EngineError::Factory(FactoryError::Guard(GuardError::NotOwner { .. })))
		));

		let status = engine.unpause_factory(owner).unwrap();
		assert!(!status.paused);
		assert_eq!(status.owner, owner);
		engine
			.submit_document(ALICE, submission(vec![BOB], false))
			.await
			.unwrap();

		assert!(engine.pause_factory(owner).unwrap().paused);
		assert_eq!(
			engine.event_bus().journal().names(),
			vec!["FactoryUnpaused", "ContractCreated", "ProcessCreated", "FactoryPaused"]
		);
	}

	#[tokio::test]
	async fn test_owner_administration() {
		let engine = engine();
		let dave = Address::repeat_byte(0xd4);
		let process = engine
			.submit_document(ALICE, submission(vec![BOB, CAROL], false))
			.await
			.unwrap()
			.address;

		let swap = ReplaceSignerRequest {
			old_signer: BOB,
			new_signer: dave,
		};
		assert!(matches!(
			engine.replace_signer(BOB, process, &swap),
			Err(EngineError::Signing(SigningError::Guard(GuardError::NotOwner { .. })))
		));
		let report = engine.replace_signer(ALICE, process, &swap).unwrap();
		assert_eq!(report.signers[0].address, dave);

		let report = engine.pause_process(ALICE, process).unwrap();
		assert!(report.paused);
		assert!(matches!(
			engine.sign(dave, process, ""),
			Err(EngineError::Signing(SigningError::Guard(GuardError::Paused)))
		));
		assert!(!engine.unpause_process(ALICE, process).unwrap().paused);
		engine.sign(dave, process, "").unwrap();

		let revised = engine
			.upload_document(b"%PDF-1.7 agreement v2", "agreement-v2.pdf")
			.await
			.unwrap();
		let report = engine
			.add_document_version(ALICE, process, &revised.pointer)
			.await
			.unwrap();
		assert_eq!(report.document_hash, revised.hash);
		assert_eq!(report.metadata.versions.len(), 2);
		assert!(report.signers[0].signed);
		assert!(matches!(
			engine
				.add_document_version(ALICE, process, "QmNeverUploaded")
				.await,
			Err(EngineError::Storage(StorageError::NotFound))
		));

		let report = engine
			.update_content_pointer(ALICE, process, "QmMirror")
			.unwrap();
		assert_eq!(report.content_pointer, "QmMirror");
		assert_eq!(report.document_hash, revised.hash);
		assert!(matches!(
			engine.update_content_pointer(ALICE, process, ""),
			Err(EngineError::Signing(SigningError::InvalidContentPointer))
		));
	}
}
