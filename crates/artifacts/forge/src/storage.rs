//! Storage layout types, see <https://docs.soliditylang.org/en/latest/internals/layout_in_storage.html>

use crate::serde_helpers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageLayout {
    #[serde(default, deserialize_with = "serde_helpers::default_for_null")]
    pub storage: Vec<Storage>,
    #[serde(default, deserialize_with = "serde_helpers::default_for_null")]
    pub types: BTreeMap<String, StorageType>,
}

impl StorageLayout {
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty() && self.types.is_empty()
    }
}

/// A state variable, or a member of a struct type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    #[serde(rename = "astId")]
    pub ast_id: u64,
    /// `<source path>:<contract name>` of the declaring contract
    pub contract: String,
    pub label: String,
    pub offset: i64,
    pub slot: String,
    #[serde(rename = "type")]
    pub storage_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageType {
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub label: String,
    #[serde(rename = "numberOfBytes")]
    pub number_of_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Element type of arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Members of struct types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Storage>>,
}
