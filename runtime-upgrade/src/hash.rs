// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Content hashing of runtime code.

use subxt::utils::H256;

/// Hash of a code blob, the same BLAKE2b-256 digest the relay chain stores as
/// `Paras::CurrentCodeHash`.
pub fn code_hash(code: &[u8]) -> H256 {
	sp_core::blake2_256(code).into()
}

/// Parse a `0x`-prefixed (or bare) hex string into a code hash.
pub fn parse_code_hash(input: &str) -> Result<H256, hex::FromHexError> {
	let mut bytes = [0u8; 32];
	hex::decode_to_slice(input.strip_prefix("0x").unwrap_or(input), &mut bytes)?;
	Ok(H256(bytes))
}
