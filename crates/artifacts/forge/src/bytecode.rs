//! Bytecode related types.

use alloy_primitives::{hex, Bytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
    /// The bytecode as a hex string.
    pub object: BytecodeObject,
    /// The source mapping as a string. See the solidity documentation for the format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
    /// Library placeholders, kept as-is
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub link_references: serde_json::Value,
}

/// Represents the bytecode of a contract that might be not fully linked yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BytecodeObject {
    /// Fully linked bytecode object.
    Bytecode(Bytes),
    /// Bytecode as hex string that's not fully linked yet and contains library placeholders.
    Unlinked(String),
}

impl BytecodeObject {
    /// Returns a reference to the underlying `Bytes` if the object is a valid bytecode.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytecode(bytes) => Some(bytes),
            Self::Unlinked(_) => None,
        }
    }

    /// Returns true if the object is a valid bytecode.
    pub fn is_bytecode(&self) -> bool {
        matches!(self, Self::Bytecode(_))
    }

    /// Returns true if the object contains library placeholders.
    pub fn is_unlinked(&self) -> bool {
        matches!(self, Self::Unlinked(_))
    }

    /// Returns true if the object holds no code at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytecode(bytes) => bytes.is_empty(),
            Self::Unlinked(s) => s.is_empty(),
        }
    }
}

impl Default for BytecodeObject {
    fn default() -> Self {
        Self::Bytecode(Bytes::new())
    }
}

/// Linked bytecode is rendered `0x`-prefixed, unlinked bytecode verbatim.
impl fmt::Display for BytecodeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytecode(bytes) => write!(f, "{bytes}"),
            Self::Unlinked(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for BytecodeObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        Ok(match hex::decode(stripped) {
            Ok(bytes) => Self::Bytecode(bytes.into()),
            Err(_) => Self::Unlinked(s),
        })
    }
}

impl Serialize for BytecodeObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
