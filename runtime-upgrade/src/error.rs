// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Errors of the runtime upgrade orchestration.

use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that may happen while upgrading a runtime or waiting for it to be adopted.
#[derive(Debug, Error)]
pub enum Error {
	/// Fetching the runtime blob over HTTP failed, including bodies cut short of their
	/// `Content-Length`.
	#[error("failed to fetch runtime from {url}: {source}")]
	Fetch {
		url: String,
		#[source]
		source: reqwest::Error,
	},
	/// Reading a runtime blob from the local file system failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// The code blob could not be decompressed, compressed or is not a module we can mutate.
	#[error("failed to decode runtime blob: {0}")]
	Decode(String),
	/// The code payload of an upgrade request is not valid hex.
	#[error("invalid runtime payload: {0}")]
	InvalidPayload(#[from] hex::FromHexError),
	/// The signer secret URI could not be turned into a key pair.
	#[error("invalid signer: {0}")]
	Signer(String),
	/// The node has no `:code` entry in its storage.
	#[error("runtime code is missing from the node storage")]
	MissingCode,
	/// The node returned something we did not expect.
	#[error("RPC response indicates invalid chain state: {0}")]
	InvalidChainState(String),
	/// The privileged upgrade transaction was rejected or failed.
	#[error("runtime upgrade transaction failed: {reason}")]
	Submission { reason: String },
	/// The expected code hash was not adopted in time.
	#[error("timeout ({0:?}) waiting for the runtime code hash")]
	Timeout(Duration),
	/// A [`subxt::Error`] wrapper error.
	#[error(transparent)]
	Client(#[from] subxt::Error),
}

impl Error {
	/// Build a [`Error::Submission`] from anything that describes the failure.
	pub fn submission(reason: impl Into<String>) -> Self {
		Error::Submission { reason: reason.into() }
	}

	/// Returns the reason reported for a failed submission, if this is one.
	pub fn submission_reason(&self) -> Option<&str> {
		match self {
			Error::Submission { reason } => Some(reason),
			_ => None,
		}
	}
}
