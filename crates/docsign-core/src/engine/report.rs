//! Builds API reports from process snapshots.

use docsign_types::{
	completion_percentage, ProcessSnapshot, ProcessStatusReport, ProcessSummary, RegistryEntry,
	SignerStatus, SigningProgress,
};

fn progress(snapshot: &ProcessSnapshot) -> SigningProgress {
	SigningProgress::new(snapshot.signatures.len(), snapshot.required_signers.len())
}

/// Detailed per-signer report of one process.
///
/// `next_signer` is only set for a sequential process that still waits on
/// someone and has not reached a terminal status.
pub fn status_report(snapshot: &ProcessSnapshot, is_active: Option<bool>) -> ProcessStatusReport {
	let progress = progress(snapshot);
	let next_signer = (snapshot.sequential && !snapshot.status.is_terminal())
		.then(|| snapshot.required_signers.get(snapshot.next_signer_cursor))
		.flatten()
		.copied();

	let signers = snapshot
		.required_signers
		.iter()
		.enumerate()
		.map(|(position, address)| SignerStatus {
			address: *address,
			position,
			signed: snapshot
				.signatures
				.iter()
				.any(|record| record.signer == *address),
		})
		.collect();

	ProcessStatusReport {
		address: snapshot.address,
		status: snapshot.status,
		document_hash: snapshot.document_hash,
		content_pointer: snapshot.content_pointer.clone(),
		progress,
		completion_percentage: completion_percentage(progress.signed, progress.total),
		is_fully_signed: snapshot.is_fully_signed,
		sequential: snapshot.sequential,
		next_signer,
		paused: snapshot.paused,
		signers,
		signatures: snapshot.signatures.clone(),
		metadata: snapshot.metadata.clone(),
		is_active,
	}
}

/// One-line listing entry combining the registry record with live status.
pub fn summary(entry: &RegistryEntry, snapshot: &ProcessSnapshot) -> ProcessSummary {
	ProcessSummary {
		address: entry.process,
		title: entry.title.clone(),
		document_hash: snapshot.document_hash,
		content_pointer: snapshot.content_pointer.clone(),
		created_at: entry.created_at,
		is_active: entry.is_active,
		status: snapshot.status,
		progress: progress(snapshot),
	}
}
