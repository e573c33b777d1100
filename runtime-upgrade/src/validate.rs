// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Waiting for a parachain to adopt a new validation code hash.
//!
//! The relay chain records the code hash of every parachain in `Paras::CurrentCodeHash`. After an
//! upgrade the new hash shows up there once the upgrade is enacted, which may take a few
//! sessions. The validator polls that value until it matches or the timeout passes.
//!
//! The deadline is only checked before each poll, so a failing validation may take up to one
//! poll interval longer than the timeout.

use crate::{
	chain::{ParaId, UpgradeChain},
	Error, Result, LOG_TARGET,
};
use std::time::Duration;
use subxt::utils::H256;
use tokio::time::{sleep, Instant};

/// Delay between two code hash queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default time to wait for the new code hash.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// What to wait for, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationQuery {
	pub para_id: ParaId,
	pub expected_hash: H256,
	pub timeout: Duration,
	pub poll_interval: Duration,
}

impl ValidationQuery {
	pub fn new(para_id: ParaId, expected_hash: H256, timeout: Duration) -> Self {
		Self { para_id, expected_hash, timeout, poll_interval: DEFAULT_POLL_INTERVAL }
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}
}

/// Returns `true` once `para_id` runs code with `expected_hash`, `false` if that did not happen
/// within `timeout`.
pub async fn validate_runtime_code<C: UpgradeChain>(
	chain: &C,
	para_id: ParaId,
	expected_hash: H256,
	timeout: Duration,
) -> bool {
	validate(chain, &ValidationQuery::new(para_id, expected_hash, timeout)).await
}

/// Like [`validate_runtime_code`], for a fully specified query.
pub async fn validate<C: UpgradeChain>(chain: &C, query: &ValidationQuery) -> bool {
	match wait_for_code_hash(chain, query).await {
		Ok(elapsed) => {
			log::info!(
				target: LOG_TARGET,
				"Parachain {} adopted code hash {:?} after {elapsed:?}",
				query.para_id,
				query.expected_hash,
			);
			true
		},
		Err(error) => {
			log::warn!(
				target: LOG_TARGET,
				"Parachain {} did not adopt code hash {:?}: {error}",
				query.para_id,
				query.expected_hash,
			);
			false
		},
	}
}

/// Poll the code hash of `query.para_id` until it equals `query.expected_hash`.
///
/// Returns the elapsed time on success and [`Error::Timeout`] once the deadline has passed.
/// Failed queries are logged and count as a mismatch.
pub async fn wait_for_code_hash<C: UpgradeChain>(
	chain: &C,
	query: &ValidationQuery,
) -> Result<Duration> {
	let started = Instant::now();
	// a timeout too large to be represented never expires
	let deadline = started.checked_add(query.timeout);

	loop {
		if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
			return Err(Error::Timeout(query.timeout))
		}

		sleep(query.poll_interval).await;

		match chain.current_code_hash(query.para_id).await {
			Ok(Some(current_hash)) => {
				log::info!(
					target: LOG_TARGET,
					"parachain {} current code hash : {current_hash:?}",
					query.para_id,
				);
				if current_hash == query.expected_hash {
					return Ok(started.elapsed())
				}
			},
			Ok(None) => {
				log::info!(target: LOG_TARGET, "parachain {} has no code hash yet", query.para_id);
			},
			Err(error) => {
				log::warn!(
					target: LOG_TARGET,
					"Failed to query the code hash of parachain {}: {error}",
					query.para_id,
				);
			},
		}
	}
}
