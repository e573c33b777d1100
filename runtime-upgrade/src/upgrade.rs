// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! The two upgrade flows: installing code taken from a URL, and re-installing the code the chain
//! already runs with an extra custom section.

use crate::{
	blob::RuntimeBlob,
	chain::{UpgradeChain, UpgradeRequest, Weight},
	fetch::{Fetcher, RuntimeSource},
	hash::code_hash,
	submit::submit_upgrade,
	Result, LOG_TARGET,
};
use subxt::utils::H256;

/// Performs runtime upgrades on one chain, signing with one identity.
pub struct RuntimeUpgrader<C: UpgradeChain> {
	chain: C,
	signer: C::Signer,
	weight: Weight,
	fetcher: Fetcher,
}

impl<C: UpgradeChain> RuntimeUpgrader<C> {
	pub fn new(chain: C, signer: C::Signer) -> Self {
		Self { chain, signer, weight: Weight::default(), fetcher: Fetcher::new() }
	}

	/// Weight hint passed to the privileged call.
	pub fn with_weight(mut self, weight: Weight) -> Self {
		self.weight = weight;
		self
	}

	pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
		self.fetcher = fetcher;
		self
	}

	pub fn chain(&self) -> &C {
		&self.chain
	}

	/// Fetch the code at `url` and install it.
	///
	/// Returns the hash of the installed code once the upgrade transaction is finalized.
	pub async fn upgrade_runtime(&self, url: &str) -> Result<H256> {
		let code = self.fetcher.fetch(url).await?;
		self.install(&code).await
	}

	/// Like [`Self::upgrade_runtime`], for code that may also come from the local file system.
	pub async fn upgrade_runtime_from_source(&self, source: &RuntimeSource) -> Result<H256> {
		let code = self.fetcher.load(source).await?;
		self.install(&code).await
	}

	/// Re-install the current runtime with a custom section appended.
	///
	/// The stored code is decompressed, extended and compressed again. The runtime behaves the
	/// same but its code hash changes, which makes this a cheap way to exercise the upgrade
	/// machinery. Returns the hash of the new code.
	pub async fn upgrade_runtime_with_custom_section(&self) -> Result<H256> {
		let stored = RuntimeBlob::new(self.chain.stored_code().await?);
		log::info!(
			target: LOG_TARGET,
			"Current runtime code: {} bytes, hash {:?}",
			stored.bytes().len(),
			stored.hash(),
		);

		let code = stored.decompress()?.with_custom_section()?.compress()?.into_bytes();
		self.install(&code).await
	}

	async fn install(&self, code: &[u8]) -> Result<H256> {
		let hash = code_hash(code);
		log::info!(target: LOG_TARGET, "New runtime code: {} bytes, hash {hash:?}", code.len());

		let request = UpgradeRequest::new(code, self.weight);
		let block = submit_upgrade(&self.chain, &request, &self.signer).await?;
		log::info!(target: LOG_TARGET, "Runtime upgrade {hash:?} finalized in block {block:?}");

		Ok(hash)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blob::{compress, CUSTOM_SECTION},
		mock::{MockChain, MockSigner},
		Error,
	};
	use assert_matches::assert_matches;

	const MODULE: [u8; 14] =
		[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x04, 0x01, 0x60, 0x00, 0x00];

	#[tokio::test]
	async fn custom_section_upgrade_submits_recompressed_code() {
		let chain = MockChain::new().with_code(compress(&MODULE).unwrap());
		let upgrader = RuntimeUpgrader::new(chain, MockSigner("//Alice"))
			.with_weight(Weight::from_parts(1_000, 64));

		let hash = upgrader.upgrade_runtime_with_custom_section().await.unwrap();

		let submitted = upgrader.chain().submitted();
		assert_eq!(submitted.len(), 1);
		let (request, signer) = &submitted[0];
		assert_eq!(*signer, "//Alice");
		assert_eq!(request.weight(), Weight::from_parts(1_000, 64));

		let code = request.code().unwrap();
		assert_eq!(hash, code_hash(&code));
		let module = RuntimeBlob::new(code).decompress().unwrap().into_bytes();
		assert_eq!(module, [&MODULE[..], &CUSTOM_SECTION[..]].concat());
	}

	#[tokio::test]
	async fn custom_section_upgrade_accepts_uncompressed_code() {
		let chain = MockChain::new().with_code(MODULE.to_vec());
		let upgrader = RuntimeUpgrader::new(chain, MockSigner("//Alice"));

		let hash = upgrader.upgrade_runtime_with_custom_section().await.unwrap();

		let (request, _) = upgrader.chain().submitted().remove(0);
		assert_eq!(hash, code_hash(&request.code().unwrap()));
		assert!(RuntimeBlob::new(request.code().unwrap()).is_compressed());
	}

	#[tokio::test]
	async fn missing_stored_code_fails_before_submitting() {
		let upgrader = RuntimeUpgrader::new(MockChain::new(), MockSigner("//Alice"));

		assert_matches!(
			upgrader.upgrade_runtime_with_custom_section().await,
			Err(Error::MissingCode)
		);
		assert!(upgrader.chain().submitted().is_empty());
	}

	#[tokio::test]
	async fn non_wasm_code_is_not_extended() {
		let chain = MockChain::new().with_code(compress(b"PVM\0\x01\x02\x03").unwrap());
		let upgrader = RuntimeUpgrader::new(chain, MockSigner("//Alice"));

		assert_matches!(
			upgrader.upgrade_runtime_with_custom_section().await,
			Err(Error::Decode(_))
		);
		assert!(upgrader.chain().submitted().is_empty());
	}

	#[tokio::test]
	async fn local_file_source_is_installed() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("runtime.compact.compressed.wasm");
		let code = compress(&MODULE).unwrap();
		std::fs::write(&file, &code).unwrap();

		let upgrader = RuntimeUpgrader::new(MockChain::new(), MockSigner("//Bob"));
		let source = RuntimeSource::Path(file);
		let hash = upgrader.upgrade_runtime_from_source(&source).await.unwrap();

		assert_eq!(hash, code_hash(&code));
		let (request, _) = upgrader.chain().submitted().remove(0);
		assert_eq!(request, UpgradeRequest::new(&code, Weight::default()));
	}
}
