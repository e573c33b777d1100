// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Settings shared by all upgrade operations.

use crate::{
	chain::Weight,
	fetch::Fetcher,
	subxt_chain::{signer_from_uri, SubxtChain},
	upgrade::RuntimeUpgrader,
	Result,
};
use std::time::Duration;

/// Node the tool talks to when nothing else is configured.
pub const DEFAULT_NODE_URL: &str = "ws://127.0.0.1:9944";

/// Development account used to sign upgrades when nothing else is configured.
pub const DEFAULT_SURI: &str = "//Alice";

/// Where to upgrade, who signs, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeConfig {
	/// RPC endpoint of the chain whose runtime is upgraded.
	pub node_url: String,
	/// RPC endpoint of the relay chain used to check parachain code hashes.
	///
	/// Defaults to `node_url`.
	pub relay_url: Option<String>,
	/// Secret URI of the sudo key.
	pub suri: String,
	pub weight: Weight,
	/// Upper bound for downloading a runtime, unlimited if `None`.
	pub fetch_timeout: Option<Duration>,
}

impl Default for UpgradeConfig {
	fn default() -> Self {
		Self {
			node_url: DEFAULT_NODE_URL.into(),
			relay_url: None,
			suri: DEFAULT_SURI.into(),
			weight: Weight::default(),
			fetch_timeout: None,
		}
	}
}

impl UpgradeConfig {
	pub fn relay_url(&self) -> &str {
		self.relay_url.as_deref().unwrap_or(&self.node_url)
	}

	pub fn fetcher(&self) -> Fetcher {
		match self.fetch_timeout {
			Some(timeout) => Fetcher::new().with_timeout(timeout),
			None => Fetcher::new(),
		}
	}

	/// Connect to `node_url` and set up an upgrader signing with `suri`.
	pub async fn upgrader(&self) -> Result<RuntimeUpgrader<SubxtChain>> {
		let signer = signer_from_uri(&self.suri)?;
		let chain = SubxtChain::connect(&self.node_url).await?;
		Ok(RuntimeUpgrader::new(chain, signer)
			.with_weight(self.weight)
			.with_fetcher(self.fetcher()))
	}

	/// Connect to the relay chain.
	pub async fn relay_chain(&self) -> Result<SubxtChain> {
		SubxtChain::connect(self.relay_url()).await
	}
}
