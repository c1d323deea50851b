//! The contract list naming which contracts to generate metadata for.

use contract_bindgen_core::{
    error::{BindgenError, Result},
    utils,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The parsed contract list file:
///
/// ```json
/// {
///   "local": ["L1CrossDomainMessenger", "OptimismPortal"],
///   "etherscan": [{"name": "MultiCall3", "deployedAddress": "0xcA11bde05977b3631167028862bE2a173976CA11"}]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractsList {
    #[serde(default)]
    pub local: Vec<String>,
    #[serde(default)]
    pub etherscan: Vec<ContractSpec>,
}

impl ContractsList {
    /// Reads and parses the contract list at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        utils::read_json_file(path)
            .map_err(|err| BindgenError::ContractList { path: path.to_path_buf(), err: Box::new(err) })
    }
}

/// A contract deployed on chain whose ABI and bytecode are fetched from Etherscan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSpec {
    pub name: String,
    pub deployed_address: String,
    /// The address the contract is predeployed at on L2, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predeploy_address: Option<String>,
}

/// A contract as named in the contract list.
pub trait NamedContract {
    fn name(&self) -> &str;
}

impl NamedContract for String {
    fn name(&self) -> &str {
        self
    }
}

impl NamedContract for ContractSpec {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Reads the names of the local contracts from the contract list.
pub fn read_local_contracts(path: impl AsRef<Path>) -> Result<Vec<String>> {
    ContractsList::read(path).map(|list| list.local)
}

/// Reads the Etherscan contracts from the contract list.
pub fn read_etherscan_contracts(path: impl AsRef<Path>) -> Result<Vec<ContractSpec>> {
    ContractsList::read(path).map(|list| list.etherscan)
}

/// An empty contract list is a configuration error, never a successful no-op.
pub fn require_contracts<T>(contracts: Vec<T>, path: impl AsRef<Path>) -> Result<Vec<T>> {
    if contracts.is_empty() {
        return Err(BindgenError::EmptyContractList(path.as_ref().to_path_buf()));
    }
    Ok(contracts)
}
