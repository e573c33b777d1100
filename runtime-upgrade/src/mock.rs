// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`UpgradeChain`] used by the tests.

use crate::{
	chain::{ParaId, StatusSubscription, TransactionStatus, UpgradeChain, UpgradeRequest},
	Error, Result,
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::{
	atomic::{AtomicUsize, Ordering},
	Arc, Mutex,
};
use subxt::utils::H256;

/// Block the mock "includes" transactions in.
pub const BLOCK: H256 = H256([7u8; 32]);

/// One scripted item of a status stream.
#[derive(Debug, Clone)]
pub enum Step {
	Status(TransactionStatus),
	/// The subscription yields a transport error.
	Error(String),
	/// The stream stays open without further events.
	Hang,
}

pub struct MockSigner(pub &'static str);

type CodeHashFn = Box<dyn Fn(usize) -> Result<Option<H256>> + Send + Sync>;

pub struct MockChain {
	code: Option<Vec<u8>>,
	steps: Vec<Step>,
	reject_submission: Option<String>,
	code_hashes: CodeHashFn,
	submitted: Mutex<Vec<(UpgradeRequest, &'static str)>>,
	releases: Arc<AtomicUsize>,
	consumed: Arc<AtomicUsize>,
	queries: AtomicUsize,
}

impl MockChain {
	pub fn new() -> Self {
		Self {
			code: None,
			steps: vec![
				Step::Status(TransactionStatus::Submitted),
				Step::Status(TransactionStatus::InBlock(BLOCK)),
				Step::Status(TransactionStatus::Finalized(BLOCK)),
			],
			reject_submission: None,
			code_hashes: Box::new(|_| Ok(None)),
			submitted: Mutex::new(Vec::new()),
			releases: Arc::new(AtomicUsize::new(0)),
			consumed: Arc::new(AtomicUsize::new(0)),
			queries: AtomicUsize::new(0),
		}
	}

	pub fn with_code(mut self, code: Vec<u8>) -> Self {
		self.code = Some(code);
		self
	}

	pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
		self.steps = steps;
		self
	}

	pub fn rejecting_submission(mut self, reason: &str) -> Self {
		self.reject_submission = Some(reason.into());
		self
	}

	/// Answer the `n`-th code hash query (starting at 0) with `f(n)`.
	pub fn with_code_hashes(
		mut self,
		f: impl Fn(usize) -> Result<Option<H256>> + Send + Sync + 'static,
	) -> Self {
		self.code_hashes = Box::new(f);
		self
	}

	pub fn submitted(&self) -> Vec<(UpgradeRequest, &'static str)> {
		self.submitted.lock().unwrap().clone()
	}

	pub fn releases(&self) -> usize {
		self.releases.load(Ordering::SeqCst)
	}

	/// Number of status events handed out to the submitter.
	pub fn consumed(&self) -> usize {
		self.consumed.load(Ordering::SeqCst)
	}

	pub fn queries(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl UpgradeChain for MockChain {
	type Signer = MockSigner;

	async fn stored_code(&self) -> Result<Vec<u8>> {
		self.code.clone().ok_or(Error::MissingCode)
	}

	async fn current_code_hash(&self, _para_id: ParaId) -> Result<Option<H256>> {
		let n = self.queries.fetch_add(1, Ordering::SeqCst);
		(self.code_hashes)(n)
	}

	async fn submit_privileged(
		&self,
		request: &UpgradeRequest,
		signer: &MockSigner,
	) -> Result<StatusSubscription> {
		if let Some(reason) = &self.reject_submission {
			return Err(Error::submission(reason.clone()))
		}
		self.submitted.lock().unwrap().push((request.clone(), signer.0));

		let hang = matches!(self.steps.last(), Some(Step::Hang));
		let items = self
			.steps
			.iter()
			.filter_map(|step| match step {
				Step::Status(status) => Some(Ok(status.clone())),
				Step::Error(message) => Some(Err(Error::InvalidChainState(message.clone()))),
				Step::Hang => None,
			})
			.collect::<Vec<_>>();

		let consumed = self.consumed.clone();
		let statuses = stream::iter(items).inspect(move |_| {
			consumed.fetch_add(1, Ordering::SeqCst);
		});
		let releases = self.releases.clone();
		let release = move || {
			releases.fetch_add(1, Ordering::SeqCst);
		};

		Ok(if hang {
			StatusSubscription::new(statuses.chain(stream::pending()), release)
		} else {
			StatusSubscription::new(statuses, release)
		})
	}
}
