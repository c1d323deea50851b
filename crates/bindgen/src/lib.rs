//! Generates the metadata files that accompany contract bindings.
//!
//! Contracts come from one of two sources:
//!   - local forge artifacts, see [`local`]
//!   - deployed contracts fetched from Etherscan, see [`etherscan`]
//!
//! For every contract the ABI and bytecode are staged in a temporary directory and passed to a
//! [`BindingGenerator`], then a `<contract>_more.rs` module is written that holds the contract's
//! deployed bytecode (and for local contracts its canonical storage layout) and registers it with
//! a [`MetadataRegistry`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod contracts;
pub mod etherscan;
pub mod generator;
pub mod local;
pub mod metadata;
pub mod pipeline;
pub mod registry;
pub mod writer;

pub use config::{BindgenConfig, ErrorPolicy, EtherscanConfig, LocalConfig};
pub use contracts::{ContractSpec, ContractsList};
pub use contract_bindgen_core::error::{BindgenError, Result};
pub use generator::{BindingGenerator, CommandGenerator, NoopGenerator};
pub use pipeline::{MetadataProvider, Pipeline};
pub use registry::MetadataRegistry;

use std::path::PathBuf;

/// Generates bindings and metadata for every local contract named in the contract list.
///
/// Returns the paths of the written metadata files.
pub fn gen_local_bindings<G>(config: &BindgenConfig, generator: &G) -> Result<Vec<PathBuf>>
where
    G: BindingGenerator + ?Sized,
{
    let contracts = contracts::read_local_contracts(&config.contract_list)?;
    let contracts = contracts::require_contracts(contracts, &config.contract_list)?;
    let provider = local::LocalProvider::new(&config.local, config.source_maps_set())?;
    Pipeline::new(config, generator)?.run(&provider, &contracts)
}

/// Generates bindings and metadata for every Etherscan contract named in the contract list.
///
/// Returns the paths of the written metadata files.
pub fn gen_etherscan_bindings<G>(config: &BindgenConfig, generator: &G) -> Result<Vec<PathBuf>>
where
    G: BindingGenerator + ?Sized,
{
    let contracts = contracts::read_etherscan_contracts(&config.contract_list)?;
    let contracts = contracts::require_contracts(contracts, &config.contract_list)?;
    let resolver = etherscan::EtherscanResolver::new(&config.etherscan);
    Pipeline::new(config, generator)?.run(&resolver, &contracts)
}

/// Runs [`gen_local_bindings`] and then [`gen_etherscan_bindings`].
pub fn gen_all_bindings<G>(config: &BindgenConfig, generator: &G) -> Result<Vec<PathBuf>>
where
    G: BindingGenerator + ?Sized,
{
    let mut written = gen_local_bindings(config, generator)?;
    written.extend(gen_etherscan_bindings(config, generator)?);
    Ok(written)
}
