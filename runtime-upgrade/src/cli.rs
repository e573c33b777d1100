// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Command line interface of the `runtime-upgrade` tool.

use clap::{Args, Parser, Subcommand};
use runtime_upgrade::{
	config::{DEFAULT_NODE_URL, DEFAULT_SURI},
	hash::parse_code_hash,
	validate::{DEFAULT_POLL_INTERVAL, DEFAULT_VALIDATION_TIMEOUT},
	ParaId, RuntimeSource, UpgradeChain, UpgradeConfig, ValidationQuery, Weight, LOG_TARGET,
};
use std::time::Duration;
use subxt::utils::H256;

/// Sudo runtime upgrades for development networks.
#[derive(Parser, Debug)]
#[command(name = "runtime-upgrade", author, about, version)]
pub struct CliCommand {
	/// RPC endpoint of the chain to upgrade.
	#[arg(long, global = true, env = "RUNTIME_UPGRADE_NODE_URL", default_value = DEFAULT_NODE_URL)]
	pub node_url: String,

	/// RPC endpoint of the relay chain, used to check parachain code hashes. Defaults to
	/// `--node-url`.
	#[arg(long, global = true, env = "RUNTIME_UPGRADE_RELAY_URL")]
	pub relay_url: Option<String>,

	/// Secret URI of the sudo key.
	#[arg(
		long,
		global = true,
		env = "RUNTIME_UPGRADE_SURI",
		default_value = DEFAULT_SURI,
		hide_env_values = true
	)]
	pub suri: String,

	/// `ref_time` of the weight passed to `sudo_unchecked_weight`.
	#[arg(long, global = true, default_value_t = Weight::default().ref_time)]
	pub ref_time: u64,

	/// `proof_size` of the weight passed to `sudo_unchecked_weight`.
	#[arg(long, global = true, default_value_t = Weight::default().proof_size)]
	pub proof_size: u64,

	/// Give up downloading a runtime after this many seconds.
	#[arg(long, global = true, value_parser = parse_seconds)]
	pub fetch_timeout: Option<Duration>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Install the runtime found at an URL or local path.
	Upgrade {
		/// `http(s)://` URL, `file://` URL or path of the runtime blob.
		#[arg(long)]
		source: RuntimeSource,

		#[command(flatten)]
		validation: AdoptionArgs,
	},
	/// Re-install the current runtime with an extra custom section, changing only its hash.
	UpgradeCustomSection {
		#[command(flatten)]
		validation: AdoptionArgs,
	},
	/// Wait until a parachain runs code with the given hash. Exits with 1 if it does not.
	Validate {
		#[arg(long)]
		para_id: ParaId,

		/// Expected code hash, `0x` prefixed hex.
		#[arg(long, value_parser = parse_code_hash)]
		code_hash: H256,

		/// Seconds to wait for the code hash.
		#[arg(long, value_parser = parse_seconds, default_value = "10")]
		timeout: Duration,

		/// Seconds between two code hash queries.
		#[arg(long, value_parser = parse_poll_interval, default_value = "2")]
		poll_interval: Duration,
	},
}

/// Optional check that a parachain adopts the code installed by an upgrade.
#[derive(Args, Debug)]
pub struct AdoptionArgs {
	/// Wait until this parachain reports the new code hash on the relay chain.
	#[arg(long)]
	pub para_id: Option<ParaId>,

	/// Seconds to wait for the parachain to adopt the new code.
	#[arg(long, value_parser = parse_seconds, default_value = "10")]
	pub timeout: Duration,
}

fn parse_seconds(input: &str) -> Result<Duration, std::num::ParseIntError> {
	input.parse().map(Duration::from_secs)
}

fn parse_poll_interval(input: &str) -> Result<Duration, String> {
	let interval = parse_seconds(input).map_err(|error| error.to_string())?;
	if interval.is_zero() {
		return Err("poll interval must be at least one second".into())
	}
	Ok(interval)
}

impl CliCommand {
	pub fn config(&self) -> UpgradeConfig {
		UpgradeConfig {
			node_url: self.node_url.clone(),
			relay_url: self.relay_url.clone(),
			suri: self.suri.clone(),
			weight: Weight::from_parts(self.ref_time, self.proof_size),
			fetch_timeout: self.fetch_timeout,
		}
	}
}

/// Run the parsed command. Returns `false` if a code hash was not adopted in time.
pub async fn run(cmd: CliCommand) -> anyhow::Result<bool> {
	let config = cmd.config();

	match cmd.command {
		Command::Upgrade { source, validation } => {
			let hash = config.upgrader().await?.upgrade_runtime_from_source(&source).await?;
			println!("{hash:?}");
			validation.check(&config, hash).await
		},
		Command::UpgradeCustomSection { validation } => {
			let hash = config.upgrader().await?.upgrade_runtime_with_custom_section().await?;
			println!("{hash:?}");
			validation.check(&config, hash).await
		},
		Command::Validate { para_id, code_hash, timeout, poll_interval } => {
			let relay = config.relay_chain().await?;
			let query =
				ValidationQuery::new(para_id, code_hash, timeout).with_poll_interval(poll_interval);
			Ok(validate_until_interrupted(&relay, &query).await)
		},
	}
}

impl AdoptionArgs {
	async fn check(&self, config: &UpgradeConfig, hash: H256) -> anyhow::Result<bool> {
		let Some(para_id) = self.para_id else { return Ok(true) };

		let relay = config.relay_chain().await?;
		let query = ValidationQuery::new(para_id, hash, self.timeout);
		Ok(validate_until_interrupted(&relay, &query).await)
	}
}

/// Validate until done or until the user hits Ctrl-C, which counts as not adopted.
async fn validate_until_interrupted<C: UpgradeChain>(chain: &C, query: &ValidationQuery) -> bool {
	tokio::select! {
		adopted = runtime_upgrade::validate(chain, query) => adopted,
		_ = tokio::signal::ctrl_c() => {
			log::warn!(target: LOG_TARGET, "Interrupted, para {} not validated", query.para_id);
			false
		},
	}
}
