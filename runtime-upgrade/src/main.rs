// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Sudo runtime upgrades for development networks.
//!
//! # Usage
//!
//! ```bash
//! runtime-upgrade --node-url ws://127.0.0.1:9988 \
//!   upgrade --source target/release/wbuild/runtime.compact.compressed.wasm \
//!   --relay-url ws://127.0.0.1:9944 --para-id 2000 --timeout 300
//! ```

use clap::Parser;
use std::process::ExitCode;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	env_logger::try_init_from_env(
		env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
	)?;

	let cmd = cli::CliCommand::parse();
	if cli::run(cmd).await? {
		Ok(ExitCode::SUCCESS)
	} else {
		Ok(ExitCode::FAILURE)
	}
}
