// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! The node capabilities the upgrade orchestration relies on.

use crate::{Error, Result};
use async_trait::async_trait;
use futures::{stream::BoxStream, Stream, StreamExt};
use std::{
	pin::Pin,
	task::{Context, Poll},
};
use subxt::utils::H256;

/// Parachain identifier, as registered on the relay chain.
pub type ParaId = u32;

/// Hash of the block a transaction was included in.
pub type BlockHash = H256;

/// Two dimensional weight passed to `Sudo::sudo_unchecked_weight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weight {
	pub ref_time: u64,
	pub proof_size: u64,
}

impl Weight {
	pub const fn from_parts(ref_time: u64, proof_size: u64) -> Self {
		Self { ref_time, proof_size }
	}
}

impl Default for Weight {
	/// The nominal weight used for unchecked code upgrades.
	fn default() -> Self {
		Self::from_parts(1, 0)
	}
}

/// A single attempt to replace the runtime code.
#[derive(Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
	code_hex: String,
	weight: Weight,
}

impl std::fmt::Debug for UpgradeRequest {
	fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
		fmt.debug_struct("UpgradeRequest")
			.field("code_len", &(self.code_hex.len().saturating_sub(2) / 2))
			.field("weight", &self.weight)
			.finish()
	}
}

impl UpgradeRequest {
	pub fn new(code: &[u8], weight: Weight) -> Self {
		Self { code_hex: format!("0x{}", hex::encode(code)), weight }
	}

	/// Build a request from `0x`-prefixed hex. Fails if the payload is not valid hex.
	pub fn from_hex(code_hex: impl Into<String>, weight: Weight) -> Result<Self> {
		let request = Self { code_hex: code_hex.into(), weight };
		request.code()?;
		Ok(request)
	}

	/// The hex encoded code, `0x`-prefixed.
	pub fn code_hex(&self) -> &str {
		&self.code_hex
	}

	/// Decoded code bytes.
	pub fn code(&self) -> Result<Vec<u8>> {
		let hex = self.code_hex.strip_prefix("0x").unwrap_or(&self.code_hex);
		Ok(hex::decode(hex)?)
	}

	pub fn weight(&self) -> Weight {
		self.weight
	}
}

/// Progress of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
	/// Accepted by the node, waiting to be included.
	Submitted,
	/// Included in a (not yet final) block.
	InBlock(BlockHash),
	/// Included in a finalized block. Terminal.
	Finalized(BlockHash),
	/// Rejected, dropped or failed. Terminal.
	Errored(String),
}

impl TransactionStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, TransactionStatus::Finalized(_) | TransactionStatus::Errored(_))
	}
}

/// A live subscription to the status of a submitted transaction.
///
/// The subscription is released exactly once: explicitly with [`StatusSubscription::release`]
/// or, failing that, when it is dropped.
pub struct StatusSubscription {
	stream: BoxStream<'static, Result<TransactionStatus>>,
	release: Option<Box<dyn FnOnce() + Send>>,
}

impl StatusSubscription {
	/// Wrap a status stream. `release` is called once when the subscription is let go.
	pub fn new(
		stream: impl Stream<Item = Result<TransactionStatus>> + Send + 'static,
		release: impl FnOnce() + Send + 'static,
	) -> Self {
		Self { stream: stream.boxed(), release: Some(Box::new(release)) }
	}

	/// Unsubscribe. Calling it again (or dropping afterwards) does nothing.
	///
	/// The underlying stream is dropped before `release` runs.
	pub fn release(&mut self) {
		if let Some(release) = self.release.take() {
			self.stream = futures::stream::empty().boxed();
			release();
		}
	}

	pub fn is_released(&self) -> bool {
		self.release.is_none()
	}
}

impl Stream for StatusSubscription {
	type Item = Result<TransactionStatus>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		if self.is_released() {
			return Poll::Ready(None)
		}
		self.stream.poll_next_unpin(cx)
	}
}

impl Drop for StatusSubscription {
	fn drop(&mut self) {
		self.release();
	}
}

/// Access to a node that can have its runtime upgraded.
#[async_trait]
pub trait UpgradeChain: Send + Sync {
	/// Capability used to sign the privileged upgrade transaction.
	type Signer: Send + Sync;

	/// Raw `:code` of the chain at its latest block.
	async fn stored_code(&self) -> Result<Vec<u8>>;

	/// Code hash the relay chain currently records for `para_id`, if any.
	async fn current_code_hash(&self, para_id: ParaId) -> Result<Option<H256>>;

	/// Sign and submit `Sudo::sudo_unchecked_weight(System::set_code_without_checks(code))` and
	/// subscribe to its status.
	///
	/// A transaction the node refuses to accept fails with [`Error::Submission`].
	async fn submit_privileged(
		&self,
		request: &UpgradeRequest,
		signer: &Self::Signer,
	) -> Result<StatusSubscription>;
}

#[async_trait]
impl<C: UpgradeChain> UpgradeChain for std::sync::Arc<C> {
	type Signer = C::Signer;

	async fn stored_code(&self) -> Result<Vec<u8>> {
		(**self).stored_code().await
	}

	async fn current_code_hash(&self, para_id: ParaId) -> Result<Option<H256>> {
		(**self).current_code_hash(para_id).await
	}

	async fn submit_privileged(
		&self,
		request: &UpgradeRequest,
		signer: &Self::Signer,
	) -> Result<StatusSubscription> {
		(**self).submit_privileged(request, signer).await
	}
}

/// Turn a stream error into the reason reported for a failed submission.
pub(crate) fn status_error_reason(error: &Error) -> String {
	match error {
		Error::Submission { reason } => reason.clone(),
		other => other.to_string(),
	}
}
