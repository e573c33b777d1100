// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Submission of the privileged code upgrade and tracking of its status.

use crate::{
	chain::{
		status_error_reason, BlockHash, StatusSubscription, TransactionStatus, UpgradeChain,
		UpgradeRequest,
	},
	Error, Result, LOG_TARGET,
};
use futures::StreamExt;

/// Submit `request` signed by `signer` and wait until the transaction is finalized.
///
/// Returns the hash of the finalized block. Resolves on the first terminal status and releases
/// the status subscription on every exit path, including when the returned future is dropped.
/// Failures are not retried.
pub async fn submit_upgrade<C: UpgradeChain>(
	chain: &C,
	request: &UpgradeRequest,
	signer: &C::Signer,
) -> Result<BlockHash> {
	log::info!(
		target: LOG_TARGET,
		"Submitting runtime upgrade: {} bytes of code, weight {:?}",
		request.code_hex().len().saturating_sub(2) / 2,
		request.weight(),
	);

	let mut subscription = chain.submit_privileged(request, signer).await?;
	let outcome = wait_for_finalization(&mut subscription).await;
	subscription.release();

	outcome
}

async fn wait_for_finalization(subscription: &mut StatusSubscription) -> Result<BlockHash> {
	while let Some(status) = subscription.next().await {
		match status {
			Ok(TransactionStatus::Submitted) => {
				log::debug!(target: LOG_TARGET, "Upgrade transaction is waiting for inclusion");
			},
			Ok(TransactionStatus::InBlock(block_hash)) => {
				log::info!(target: LOG_TARGET, "Transaction included at blockHash {block_hash:?}");
			},
			Ok(TransactionStatus::Finalized(block_hash)) => {
				log::info!(target: LOG_TARGET, "Transaction finalized at blockHash {block_hash:?}");
				return Ok(block_hash)
			},
			Ok(TransactionStatus::Errored(reason)) => {
				log::error!(target: LOG_TARGET, "Transaction error: {reason}");
				return Err(Error::submission(reason))
			},
			Err(error) => {
				log::error!(target: LOG_TARGET, "Transaction status subscription failed: {error}");
				return Err(Error::submission(status_error_reason(&error)))
			},
		}
	}

	Err(Error::submission("status subscription closed before the transaction was finalized"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::Weight,
		mock::{MockChain, MockSigner, Step, BLOCK},
	};
	use assert_matches::assert_matches;
	use std::time::Duration;
	use subxt::utils::H256;

	fn request() -> UpgradeRequest {
		UpgradeRequest::new(b"\0asm\x01\0\0\0", Weight::default())
	}

	#[tokio::test]
	async fn resolves_with_the_finalized_block() {
		let chain = MockChain::new();

		let block = submit_upgrade(&chain, &request(), &MockSigner("//Alice")).await.unwrap();

		assert_eq!(block, BLOCK);
		assert_eq!(chain.releases(), 1);
		assert_eq!(chain.submitted(), vec![(request(), "//Alice")]);
	}

	#[tokio::test]
	async fn errored_after_in_block_fails_once_and_releases_once() {
		let chain = MockChain::new().with_steps(vec![
			Step::Status(TransactionStatus::Submitted),
			Step::Status(TransactionStatus::InBlock(H256::repeat_byte(1))),
			Step::Status(TransactionStatus::InBlock(H256::repeat_byte(2))),
			Step::Status(TransactionStatus::Errored("Invalid Transaction: bad proof".into())),
			Step::Status(TransactionStatus::Finalized(BLOCK)),
		]);

		let result = submit_upgrade(&chain, &request(), &MockSigner("//Alice")).await;

		assert_matches!(&result, Err(Error::Submission { reason }) if reason.contains("bad proof"));
		assert_eq!(chain.releases(), 1);
		// nothing is read past the terminal event
		assert_eq!(chain.consumed(), 4);
	}

	#[tokio::test]
	async fn stops_at_the_first_terminal_event() {
		let chain = MockChain::new().with_steps(vec![
			Step::Status(TransactionStatus::Finalized(BLOCK)),
			Step::Status(TransactionStatus::Errored("late".into())),
		]);

		assert_eq!(submit_upgrade(&chain, &request(), &MockSigner("//Bob")).await.unwrap(), BLOCK);
		assert_eq!(chain.consumed(), 1);
		assert_eq!(chain.releases(), 1);
	}

	#[tokio::test]
	async fn transport_error_keeps_its_reason() {
		let chain = MockChain::new().with_steps(vec![
			Step::Status(TransactionStatus::Submitted),
			Step::Error("connection reset".into()),
		]);

		let result = submit_upgrade(&chain, &request(), &MockSigner("//Alice")).await;

		let reason = result.unwrap_err().submission_reason().map(str::to_owned);
		assert!(reason.unwrap().contains("connection reset"));
		assert_eq!(chain.releases(), 1);
	}

	#[tokio::test]
	async fn closed_stream_without_terminal_event_is_a_failure() {
		let chain = MockChain::new()
			.with_steps(vec![Step::Status(TransactionStatus::InBlock(BLOCK))]);

		let result = submit_upgrade(&chain, &request(), &MockSigner("//Alice")).await;

		assert_matches!(result, Err(Error::Submission { .. }));
		assert_eq!(chain.releases(), 1);
	}

	#[tokio::test]
	async fn rejected_submission_is_not_retried() {
		let chain = MockChain::new().rejecting_submission("bad signature");

		let result = submit_upgrade(&chain, &request(), &MockSigner("//Alice")).await;

		assert_matches!(&result, Err(Error::Submission { .. }));
		assert_eq!(result.unwrap_err().submission_reason(), Some("bad signature"));
		assert!(chain.submitted().is_empty());
		assert_eq!(chain.releases(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn abandoning_the_submission_releases_the_subscription() {
		let chain = MockChain::new().with_steps(vec![
			Step::Status(TransactionStatus::Submitted),
			Step::Status(TransactionStatus::InBlock(BLOCK)),
			Step::Hang,
		]);

		let signer = MockSigner("//Alice");
		let abandoned = tokio::time::timeout(
			Duration::from_secs(30),
			submit_upgrade(&chain, &request(), &signer),
		)
		.await;

		assert!(abandoned.is_err());
		assert_eq!(chain.consumed(), 2);
		assert_eq!(chain.releases(), 1);
	}
}
