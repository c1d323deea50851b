//! Forge artifact types.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use alloy_json_abi::JsonAbi;
use serde::{Deserialize, Serialize};

pub mod ast;
pub mod bytecode;
pub mod output;
pub mod serde_helpers;
pub mod storage;

pub use bytecode::{Bytecode, BytecodeObject};
pub use storage::{Storage, StorageLayout, StorageType};

/// The JSON artifact forge writes for every compiled contract, usually at
/// `out/<File>.sol/<Contract>.json`.
///
/// Only the fields needed to generate bindings and their metadata are typed, everything else in
/// the file is ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForgeArtifact {
    pub abi: JsonAbi,
    pub bytecode: Bytecode,
    pub deployed_bytecode: Bytecode,
    /// The contract storage layout, empty for interfaces and libraries or when forge was not
    /// asked to emit it.
    #[serde(
        default,
        deserialize_with = "serde_helpers::default_for_null",
        skip_serializing_if = "StorageLayout::is_empty"
    )]
    pub storage_layout: StorageLayout,
}

impl ForgeArtifact {
    /// The deployed bytecode's source map, empty if the artifact carries none
    pub fn deployed_source_map(&self) -> &str {
        self.deployed_bytecode.source_map.as_deref().unwrap_or_default()
    }
}
