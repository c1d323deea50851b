//! Lookup tables populated by the generated `<contract>_more.rs` modules.

use contract_bindgen_artifacts_forge::StorageLayout;
use contract_bindgen_core::error::{BindgenError, Result};
use std::collections::BTreeMap;

/// Deployed bytecode, storage layouts and source maps of the generated contracts, keyed by
/// contract name.
///
/// Every generated metadata module exposes a `register` function that inserts its contract:
///
/// ```no_run
/// # mod l1bridge_more { pub fn register(_: &mut contract_bindgen::MetadataRegistry) {} }
/// use contract_bindgen::MetadataRegistry;
///
/// let mut registry = MetadataRegistry::default();
/// l1bridge_more::register(&mut registry);
/// let bin = registry.deployed_bytecode("L1Bridge");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataRegistry {
    deployed_bytecodes: BTreeMap<&'static str, &'static str>,
    storage_layouts: BTreeMap<&'static str, &'static str>,
    deployed_source_maps: BTreeMap<&'static str, &'static str>,
}

impl MetadataRegistry {
    pub fn insert_deployed_bytecode(&mut self, name: &'static str, bin: &'static str) {
        self.deployed_bytecodes.insert(name, bin);
    }

    pub fn insert_storage_layout(&mut self, name: &'static str, layout_json: &'static str) {
        self.storage_layouts.insert(name, layout_json);
    }

    pub fn insert_deployed_source_map(&mut self, name: &'static str, source_map: &'static str) {
        self.deployed_source_maps.insert(name, source_map);
    }

    pub fn deployed_bytecode(&self, name: &str) -> Option<&'static str> {
        self.deployed_bytecodes.get(name).copied()
    }

    /// The canonical storage layout of the contract as JSON.
    pub fn storage_layout_json(&self, name: &str) -> Option<&'static str> {
        self.storage_layouts.get(name).copied()
    }

    /// Parses the registered storage layout of the contract.
    pub fn storage_layout(&self, name: &str) -> Result<Option<StorageLayout>> {
        self.storage_layout_json(name)
            .map(|json| {
                serde_json::from_str(json).map_err(|err| BindgenError::StorageLayout {
                    contract: name.to_string(),
                    err,
                })
            })
            .transpose()
    }

    pub fn deployed_source_map(&self, name: &str) -> Option<&'static str> {
        self.deployed_source_maps.get(name).copied()
    }

    /// Names of all contracts with registered bytecode, sorted.
    pub fn contracts(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.deployed_bytecodes.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_register_contracts() {
        let mut registry = MetadataRegistry::default();
        registry.insert_deployed_bytecode("OptimismPortal", "0x6080");
        registry.insert_deployed_bytecode("L1Bridge", "0x6001");
        registry.insert_storage_layout(
            "L1Bridge",
            r#"{"storage":[{"astId":1000,"contract":"src/L1Bridge.sol:L1Bridge","label":"messenger","offset":0,"slot":"0","type":"t_address"}],"types":{"t_address":{"encoding":"inplace","label":"address","numberOfBytes":"20"}}}"#,
        );

        assert_eq!(registry.contracts().collect::<Vec<_>>(), vec!["L1Bridge", "OptimismPortal"]);
        assert_eq!(registry.deployed_bytecode("OptimismPortal"), Some("0x6080"));
        assert_eq!(registry.deployed_source_map("L1Bridge"), None);

        let layout = registry.storage_layout("L1Bridge").unwrap().unwrap();
        assert_eq!(layout.storage[0].label, "messenger");
        assert!(registry.storage_layout("OptimismPortal").unwrap().is_none());
    }

    #[test]
    fn invalid_layout_names_contract() {
        let mut registry = MetadataRegistry::default();
        registry.insert_storage_layout("Broken", "{");
        let err = registry.storage_layout("Broken").unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }
}
