// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! [`UpgradeChain`] backed by a `subxt` client connected to a live node.

use crate::{
	chain::{ParaId, StatusSubscription, TransactionStatus, UpgradeChain, UpgradeRequest},
	Error, Result, LOG_TARGET,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::str::FromStr;
use subxt::{
	ext::scale_value::Value,
	tx::{DynamicPayload, TxStatus},
	utils::H256,
	OnlineClient, PolkadotConfig,
};
use subxt_signer::{sr25519::Keypair, SecretUri};

/// Derive the sr25519 key pair used to sign upgrades from a secret URI such as `//Alice`.
pub fn signer_from_uri(suri: &str) -> Result<Keypair> {
	let uri = SecretUri::from_str(suri).map_err(|e| Error::Signer(e.to_string()))?;
	Keypair::from_uri(&uri).map_err(|e| Error::Signer(e.to_string()))
}

/// `Sudo::sudo_unchecked_weight(System::set_code_without_checks { code }, weight)`.
pub fn sudo_unchecked_set_code_call(request: &UpgradeRequest) -> Result<DynamicPayload> {
	let code = request.code()?;
	let weight = request.weight();

	let set_code =
		Value::named_variant("set_code_without_checks", [("code", Value::from_bytes(code))]);
	let system_call = Value::unnamed_variant("System", [set_code]);
	let weight = Value::named_composite([
		("ref_time", Value::u128(weight.ref_time as u128)),
		("proof_size", Value::u128(weight.proof_size as u128)),
	]);

	Ok(subxt::tx::dynamic("Sudo", "sudo_unchecked_weight", vec![system_call, weight]))
}

/// A node reachable over its RPC endpoint.
#[derive(Clone)]
pub struct SubxtChain {
	client: OnlineClient<PolkadotConfig>,
}

impl SubxtChain {
	/// Connect to the node at `url`, e.g. `ws://127.0.0.1:9944`.
	pub async fn connect(url: &str) -> Result<Self> {
		log::info!(target: LOG_TARGET, "Connecting to {url}");
		let client = OnlineClient::<PolkadotConfig>::from_url(url).await?;
		Ok(Self::from_client(client))
	}

	pub fn from_client(client: OnlineClient<PolkadotConfig>) -> Self {
		Self { client }
	}

	pub fn client(&self) -> &OnlineClient<PolkadotConfig> {
		&self.client
	}
}

#[async_trait]
impl UpgradeChain for SubxtChain {
	type Signer = Keypair;

	async fn stored_code(&self) -> Result<Vec<u8>> {
		let code_key = sp_core::storage::well_known_keys::CODE;
		self.client
			.storage()
			.at_latest()
			.await?
			.fetch_raw(code_key)
			.await?
			.ok_or(Error::MissingCode)
	}

	async fn current_code_hash(&self, para_id: ParaId) -> Result<Option<H256>> {
		let address = subxt::dynamic::storage(
			"Paras",
			"CurrentCodeHash",
			vec![Value::u128(para_id as u128)],
		);
		let Some(value) = self.client.storage().at_latest().await?.fetch(&address).await? else {
			return Ok(None)
		};

		// `ValidationCodeHash` is a plain 32 byte hash
		let encoded = value.encoded();
		if encoded.len() != 32 {
			return Err(Error::InvalidChainState(format!(
				"code hash of para {para_id} has {} bytes, expected 32",
				encoded.len()
			)))
		}
		Ok(Some(H256::from_slice(encoded)))
	}

	async fn submit_privileged(
		&self,
		request: &UpgradeRequest,
		signer: &Keypair,
	) -> Result<StatusSubscription> {
		let call = sudo_unchecked_set_code_call(request)?;
		// the pool rejecting the transaction is a failed submission, not a transport problem
		let progress = self
			.client
			.tx()
			.sign_and_submit_then_watch_default(&call, signer)
			.await
			.map_err(|error| Error::submission(error.to_string()))?;
		log::debug!(
			target: LOG_TARGET,
			"Submitted upgrade transaction {:?}",
			progress.extrinsic_hash()
		);

		let statuses = progress.filter_map(|status| async move {
			match status {
				Ok(status) => transaction_status(status).await.map(Ok),
				Err(error) => Some(Err(Error::from(error))),
			}
		});

		Ok(StatusSubscription::new(statuses, || {
			log::debug!(target: LOG_TARGET, "Unsubscribed from upgrade transaction status");
		}))
	}
}

/// Map a pool status onto [`TransactionStatus`]. Statuses that carry no progress yield `None`.
///
/// A finalized transaction whose dispatch failed is reported as errored.
async fn transaction_status(
	status: TxStatus<PolkadotConfig, OnlineClient<PolkadotConfig>>,
) -> Option<TransactionStatus> {
	let status = match status {
		TxStatus::Validated | TxStatus::Broadcasted { .. } => TransactionStatus::Submitted,
		TxStatus::NoLongerInBestBlock => {
			log::warn!(target: LOG_TARGET, "Upgrade transaction is no longer in best block");
			return None
		},
		TxStatus::InBestBlock(block) => TransactionStatus::InBlock(block.block_hash()),
		TxStatus::InFinalizedBlock(block) => match block.wait_for_success().await {
			Ok(_) => TransactionStatus::Finalized(block.block_hash()),
			Err(error) => TransactionStatus::Errored(error.to_string()),
		},
		TxStatus::Error { message } |
		TxStatus::Invalid { message } |
		TxStatus::Dropped { message } => TransactionStatus::Errored(message),
	};
	Some(status)
}
