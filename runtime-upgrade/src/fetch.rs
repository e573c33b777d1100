// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Retrieval of runtime blobs.

use crate::{Error, Result, LOG_TARGET};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

/// Where to take the new runtime code from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSource {
	/// An `http://` or `https://` URL, the whole response body is the code.
	Url(String),
	/// A file on the local file system, usually a `*.compact.compressed.wasm` artifact.
	Path(PathBuf),
}

impl FromStr for RuntimeSource {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		if s.starts_with("http://") || s.starts_with("https://") {
			Ok(RuntimeSource::Url(s.to_string()))
		} else {
			Ok(RuntimeSource::Path(s.strip_prefix("file://").unwrap_or(s).into()))
		}
	}
}

impl fmt::Display for RuntimeSource {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			RuntimeSource::Url(url) => f.write_str(url),
			RuntimeSource::Path(path) => write!(f, "file://{}", path.display()),
		}
	}
}

/// Downloads runtime blobs. Failures are returned as they are, nothing is retried.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
	client: reqwest::Client,
	timeout: Option<Duration>,
}

impl Fetcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Limit the duration of a single download.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Fetch the full body of `url` as raw bytes.
	pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
		log::info!(target: LOG_TARGET, "Fetching runtime from {url}");
		let fetch_error = |source| Error::Fetch { url: url.to_string(), source };

		let mut request = self.client.get(url);
		if let Some(timeout) = self.timeout {
			request = request.timeout(timeout);
		}
		let response = request
			.send()
			.await
			.and_then(|response| response.error_for_status())
			.map_err(fetch_error)?;

		// a body shorter than its `Content-Length` fails here as an incomplete body
		let body = response.bytes().await.map_err(fetch_error)?;

		log::debug!(target: LOG_TARGET, "Fetched {} bytes from {url}", body.len());
		Ok(body.to_vec())
	}

	/// Load the code from any supported source.
	pub async fn load(&self, source: &RuntimeSource) -> Result<Vec<u8>> {
		match source {
			RuntimeSource::Url(url) => self.fetch(url).await,
			RuntimeSource::Path(path) => {
				log::info!(target: LOG_TARGET, "Reading runtime from {}", path.display());
				Ok(tokio::fs::read(path).await?)
			},
		}
	}
}
