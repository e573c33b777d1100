// Copyright (C) Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Runtime upgrades for development and test networks.
//!
//! Two ways to replace the code of a running chain are supported, both through
//! `Sudo::sudo_unchecked_weight(System::set_code_without_checks)`:
//!
//! - [`RuntimeUpgrader::upgrade_runtime`] installs code downloaded from a URL.
//! - [`RuntimeUpgrader::upgrade_runtime_with_custom_section`] re-installs the code the chain
//!   already runs with an inert custom section appended, so only the code hash changes.
//!
//! Both return the hash of the installed code. [`validate_runtime_code`] then waits until a
//! parachain reports that hash as its current code hash on the relay chain.
//!
//! The upgrade call is unchecked and must only be used on networks the operator controls.

pub mod blob;
pub mod chain;
pub mod config;
mod error;
pub mod fetch;
pub mod hash;
pub mod submit;
pub mod subxt_chain;
pub mod upgrade;
pub mod validate;

#[cfg(test)]
mod mock;

pub use chain::{
	BlockHash, ParaId, StatusSubscription, TransactionStatus, UpgradeChain, UpgradeRequest, Weight,
};
pub use config::UpgradeConfig;
pub use error::{Error, Result};
pub use fetch::{Fetcher, RuntimeSource};
pub use hash::code_hash;
pub use subxt_chain::{signer_from_uri, SubxtChain};
pub use upgrade::RuntimeUpgrader;
pub use validate::{validate, validate_runtime_code, ValidationQuery};

/// Log target used by this crate.
pub const LOG_TARGET: &str = "runtime-upgrade";
