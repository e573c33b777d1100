// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Runtime code blobs and the transformations applied to them before an upgrade.
//!
//! Runtime code is stored by the node as a "maybe compressed" blob: either the raw module or a
//! zstd stream behind a fixed magic prefix (see [`sp_maybe_compressed_blob`]). The custom section
//! upgrade decompresses the stored code, appends a custom section to the wasm module and
//! compresses it again, which yields a new code hash for a semantically identical runtime.

use crate::{hash::code_hash, Error, Result};
use sp_maybe_compressed_blob::CODE_BLOB_BOMB_LIMIT;
use subxt::utils::H256;

/// Prefix the node puts in front of zstd compressed code.
///
/// It differs from the wasm magic, so a plain module never starts with it.
pub const ZSTD_PREFIX: [u8; 8] = [82, 188, 83, 118, 70, 219, 142, 5];

/// The magic number every wasm module starts with.
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// Custom section appended by [`inject_custom_section`].
///
/// Section id `0` (custom), content length `7`, name length `5`, name `dummy`, one payload byte.
/// Custom sections carry no semantics, so the module stays valid and behaves the same.
pub const CUSTOM_SECTION: [u8; 9] = [0x00, 0x07, 0x05, b'd', b'u', b'm', b'm', b'y', 0x0a];

/// Decompress a maybe compressed code blob.
///
/// Blobs without the compression prefix are returned as they are.
pub fn decompress(blob: &[u8]) -> Result<Vec<u8>> {
	sp_maybe_compressed_blob::decompress(blob, CODE_BLOB_BOMB_LIMIT)
		.map(|code| code.into_owned())
		.map_err(|e| Error::Decode(format!("decompression error: {e:?}")))
}

/// Compress a code blob the way the node expects compressed code.
///
/// Uses the fast zstd level; the node decompresses any level.
pub fn compress(blob: &[u8]) -> Result<Vec<u8>> {
	sp_maybe_compressed_blob::compress_weakly(blob, CODE_BLOB_BOMB_LIMIT).ok_or_else(|| {
		Error::Decode(format!(
			"blob of {} bytes exceeds the code size limit of {CODE_BLOB_BOMB_LIMIT} bytes",
			blob.len()
		))
	})
}

/// Append [`CUSTOM_SECTION`] after the last section of an uncompressed module.
pub fn inject_custom_section(module: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(module.len() + CUSTOM_SECTION.len());
	out.extend_from_slice(module);
	out.extend_from_slice(&CUSTOM_SECTION);
	out
}

/// A program blob containing a runtime, compressed or not.
#[derive(Clone, PartialEq, Eq)]
pub struct RuntimeBlob {
	bytes: Vec<u8>,
	compressed: bool,
}

impl std::fmt::Debug for RuntimeBlob {
	fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
		fmt.debug_struct("RuntimeBlob")
			.field("len", &self.bytes.len())
			.field("compressed", &self.compressed)
			.finish()
	}
}

impl RuntimeBlob {
	/// Wrap raw code bytes. Whether they are compressed is detected from the zstd prefix.
	pub fn new(bytes: Vec<u8>) -> Self {
		let compressed = bytes.starts_with(&ZSTD_PREFIX);
		Self { bytes, compressed }
	}

	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}

	pub fn is_compressed(&self) -> bool {
		self.compressed
	}

	/// Returns `true` if the (uncompressed) blob is a wasm module.
	pub fn is_wasm(&self) -> bool {
		!self.compressed && self.bytes.starts_with(&WASM_MAGIC)
	}

	/// Content hash of the blob as it is now.
	pub fn hash(&self) -> H256 {
		code_hash(&self.bytes)
	}

	/// Decompress the blob. Does nothing if it is not compressed.
	pub fn decompress(self) -> Result<Self> {
		if !self.compressed {
			return Ok(self)
		}
		Ok(Self { bytes: decompress(&self.bytes)?, compressed: false })
	}

	/// Compress the blob. Does nothing if it is already compressed.
	pub fn compress(self) -> Result<Self> {
		if self.compressed {
			return Ok(self)
		}
		Ok(Self { bytes: compress(&self.bytes)?, compressed: true })
	}

	/// Append [`CUSTOM_SECTION`] to the module.
	///
	/// Only valid for uncompressed wasm modules; other blobs are rejected since appending bytes
	/// would corrupt them.
	pub fn with_custom_section(self) -> Result<Self> {
		if self.compressed {
			return Err(Error::Decode("cannot add a custom section to a compressed blob".into()))
		}
		if !self.is_wasm() {
			return Err(Error::Decode(
				"expected a WebAssembly module, custom sections can only be added to wasm".into(),
			))
		}
		Ok(Self { bytes: inject_custom_section(&self.bytes), compressed: false })
	}
}
