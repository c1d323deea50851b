//! Canonicalization of the AST ids solc embeds in storage layouts.
//!
//! Raw ids depend on how many AST nodes the compiler created before a declaration, so adding an
//! unrelated file to a build shifts them. The canonical form replaces them with sequential ids
//! and makes absolute source paths relative to a base directory.

use crate::storage::{Storage, StorageLayout, StorageType};
use once_cell::sync::Lazy;
use path_slash::PathExt;
use regex::{Captures, Regex};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

/// The first id handed out to a canonicalized AST node.
pub const FIRST_CANONICAL_ID: u64 = 1000;

/// Matches type identifiers that embed the AST id of their declaration, e.g.
/// `t_struct(Withdrawal)1234_storage`, `t_contract(IERC20)56` or `t_enum(Status)78`. Names may
/// contain `$`, which solc uses to escape nested and library qualified names.
static TYPE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"t_(?:struct|contract|enum|userDefinedValueType)\([\w$]+\)(\d+)").unwrap()
});

#[derive(Debug)]
struct CanonicalIds(u64);

impl CanonicalIds {
    fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// Returns the canonical form of `layout`.
///
/// Ids are assigned in this order:
///   1. storage entries, in declaration order
///   2. type identifiers embedding an id, as first seen walking the sorted type ids
///   3. struct members, in sorted type order and then member order
///
/// The result only depends on `layout` and `base`.
pub fn canonicalize_ast_ids(layout: &StorageLayout, base: impl AsRef<Path>) -> StorageLayout {
    let base = base.as_ref();
    let mut ids = CanonicalIds(FIRST_CANONICAL_ID);

    let mut ast_ids = HashMap::with_capacity(layout.storage.len());
    for entry in &layout.storage {
        ast_ids.insert(entry.ast_id, ids.next());
    }

    let mut type_ids: HashMap<String, String> = HashMap::new();
    let type_refs = layout.types.keys().chain(layout.storage.iter().map(|s| &s.storage_type));
    for ty in type_refs {
        for caps in TYPE_ID_RE.captures_iter(ty) {
            let token = &caps[0];
            if !type_ids.contains_key(token) {
                let prefix = &token[..token.len() - caps[1].len()];
                type_ids.insert(token.to_string(), format!("{prefix}{}", ids.next()));
            }
        }
    }
    let remap = |ty: &str| -> String {
        TYPE_ID_RE
            .replace_all(ty, |caps: &Captures<'_>| {
                type_ids.get(&caps[0]).cloned().unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    };

    let storage = layout
        .storage
        .iter()
        .map(|entry| Storage {
            ast_id: ast_ids.get(&entry.ast_id).copied().unwrap_or(entry.ast_id),
            contract: relative_contract(&entry.contract, base),
            label: entry.label.clone(),
            offset: entry.offset,
            slot: entry.slot.clone(),
            storage_type: remap(&entry.storage_type),
        })
        .collect();

    let mut types = BTreeMap::new();
    for (id, ty) in &layout.types {
        let members = ty.members.as_ref().map(|members| {
            members
                .iter()
                .map(|member| Storage {
                    ast_id: ids.next(),
                    contract: relative_contract(&member.contract, base),
                    label: member.label.clone(),
                    offset: member.offset,
                    slot: member.slot.clone(),
                    storage_type: remap(&member.storage_type),
                })
                .collect()
        });
        types.insert(
            remap(id),
            StorageType {
                encoding: ty.encoding.clone(),
                key: ty.key.as_deref().map(&remap),
                label: ty.label.clone(),
                number_of_bytes: ty.number_of_bytes.clone(),
                value: ty.value.as_deref().map(&remap),
                base: ty.base.as_deref().map(&remap),
                members,
            },
        );
    }

    StorageLayout { storage, types }
}

/// Absolute `<path>:<Contract>` references happen when two imported contracts share a name; they
/// are rewritten relative to `base` so the layout does not depend on the checkout location.
fn relative_contract(contract: &str, base: &Path) -> String {
    let path = Path::new(contract);
    if !path.is_absolute() {
        return contract.to_string();
    }
    match path.strip_prefix(base) {
        Ok(relative) => relative.to_slash_lossy().into_owned(),
        Err(_) => contract.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn layout(raw: &str) -> StorageLayout {
        serde_json::from_str(raw).unwrap()
    }

    fn bridge_layout(owner_id: u64, deposits_id: u64, struct_id: u64, member_id: u64) -> StorageLayout {
        layout(&format!(
            r#"{{
                "storage": [
                    {{"astId": {owner_id}, "contract": "/repo/packages/contracts/src/L1/Bridge.sol:Bridge", "label": "owner", "offset": 0, "slot": "0", "type": "t_address"}},
                    {{"astId": {deposits_id}, "contract": "/repo/packages/contracts/src/L1/Bridge.sol:Bridge", "label": "deposits", "offset": 0, "slot": "1", "type": "t_mapping(t_address,t_struct(Deposit){struct_id}_storage)"}}
                ],
                "types": {{
                    "t_address": {{"encoding": "inplace", "label": "address", "numberOfBytes": "20"}},
                    "t_mapping(t_address,t_struct(Deposit){struct_id}_storage)": {{"encoding": "mapping", "key": "t_address", "label": "mapping(address => struct Bridge.Deposit)", "numberOfBytes": "32", "value": "t_struct(Deposit){struct_id}_storage"}},
                    "t_struct(Deposit){struct_id}_storage": {{"encoding": "inplace", "label": "struct Bridge.Deposit", "numberOfBytes": "32", "members": [
                        {{"astId": {member_id}, "contract": "src/L1/Bridge.sol:Bridge", "label": "amount", "offset": 0, "slot": "0", "type": "t_uint256"}}
                    ]}},
                    "t_uint256": {{"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}}
                }}
            }}"#
        ))
    }

    #[test]
    fn assigns_sequential_ids() {
        let canonical = canonicalize_ast_ids(&bridge_layout(51, 60, 44, 42), "/repo/packages/contracts");
        assert_eq!(canonical.storage[0].ast_id, 1000);
        assert_eq!(canonical.storage[1].ast_id, 1001);
        assert_eq!(canonical.storage[1].storage_type, "t_mapping(t_address,t_struct(Deposit)1002_storage)");
        assert_eq!(canonical.storage[0].contract, "src/L1/Bridge.sol:Bridge");

        let deposit = &canonical.types["t_struct(Deposit)1002_storage"];
        let members = deposit.members.as_ref().unwrap();
        assert_eq!(members[0].ast_id, 1003);
        assert_eq!(members[0].storage_type, "t_uint256");

        let mapping = &canonical.types["t_mapping(t_address,t_struct(Deposit)1002_storage)"];
        assert_eq!(mapping.key.as_deref(), Some("t_address"));
        assert_eq!(mapping.value.as_deref(), Some("t_struct(Deposit)1002_storage"));
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let raw = bridge_layout(51, 60, 44, 42);
        let first = serde_json::to_string(&canonicalize_ast_ids(&raw, "/repo/packages/contracts")).unwrap();
        for _ in 0..8 {
            let again = serde_json::to_string(&canonicalize_ast_ids(&raw, "/repo/packages/contracts")).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn raw_ids_do_not_leak_into_output() {
        let a = canonicalize_ast_ids(&bridge_layout(51, 60, 44, 42), "/repo/packages/contracts");
        let b = canonicalize_ast_ids(&bridge_layout(9051, 9060, 9044, 9042), "/repo/packages/contracts");
        assert_eq!(a, b);
    }

    #[test]
    fn fixed_size_arrays_keep_their_length() {
        let raw = layout(
            r#"{
                "storage": [{"astId": 3, "contract": "src/A.sol:A", "label": "xs", "offset": 0, "slot": "0", "type": "t_array(t_uint256)3_storage"}],
                "types": {
                    "t_array(t_uint256)3_storage": {"encoding": "inplace", "label": "uint256[3]", "numberOfBytes": "96", "base": "t_uint256"},
                    "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
                }
            }"#,
        );
        let canonical = canonicalize_ast_ids(&raw, "/irrelevant");
        assert_eq!(canonical.storage[0].storage_type, "t_array(t_uint256)3_storage");
        assert!(canonical.types.contains_key("t_array(t_uint256)3_storage"));
        assert_eq!(canonical.storage[0].contract, "src/A.sol:A");
    }

    #[test]
    fn escaped_type_names_are_remapped() {
        let raw = layout(
            r#"{
                "storage": [
                    {"astId": 21, "contract": "src/A.sol:A", "label": "slots", "offset": 0, "slot": "0", "type": "t_struct(Slots$_$_$Lib)871_storage"},
                    {"astId": 22, "contract": "src/A.sol:A", "label": "kind", "offset": 0, "slot": "2", "type": "t_enum(Kind$$$)905"}
                ],
                "types": {
                    "t_enum(Kind$$$)905": {"encoding": "inplace", "label": "enum Kind", "numberOfBytes": "1"},
                    "t_struct(Slots$_$_$Lib)871_storage": {"encoding": "inplace", "label": "struct Lib.Slots", "numberOfBytes": "64", "members": []}
                }
            }"#,
        );
        let canonical = canonicalize_ast_ids(&raw, "/irrelevant");
        assert_eq!(canonical.storage[0].storage_type, "t_struct(Slots$_$_$Lib)1003_storage");
        assert_eq!(canonical.storage[1].storage_type, "t_enum(Kind$$$)1002");
        let json = serde_json::to_string(&canonical).unwrap();
        assert!(!json.contains("871") && !json.contains("905"), "{json}");
    }

    #[test]
    fn paths_outside_base_are_kept() {
        assert_eq!(relative_contract("/elsewhere/A.sol:A", Path::new("/repo")), "/elsewhere/A.sol:A");
        assert_eq!(relative_contract("/repo/src/A.sol:A", Path::new("/repo/")), "src/A.sol:A");
    }
}
