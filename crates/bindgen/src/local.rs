//! Resolves contracts from a local forge `out/` directory.

use crate::{
    config::LocalConfig,
    metadata::{ContractMetadata, LocalContractMetadata},
    pipeline::{MetadataProvider, StagedFiles},
};
use contract_bindgen_artifacts_forge::{ast::canonicalize_ast_ids, output, ForgeArtifact};
use contract_bindgen_core::{
    error::{BindgenError, Result},
    utils,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

/// Maps sanitized contract names to the artifact files found under a directory.
///
/// Files are visited sorted by name and when several files share a sanitized name, the one
/// visited last wins. Every such name is also recorded as a collision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtifactPathIndex {
    paths: BTreeMap<String, PathBuf>,
    collisions: BTreeMap<String, Vec<PathBuf>>,
}

impl ArtifactPathIndex {
    /// Indexes every `*.json` file under `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let mut index = Self::default();
        for file in utils::json_files_sorted(root.as_ref())? {
            index.insert(file);
        }
        for (name, candidates) in &index.collisions {
            debug!(%name, ?candidates, "several artifacts share a contract name");
        }
        Ok(index)
    }

    /// Adds `path` under its sanitized file name, replacing any earlier entry.
    pub fn insert(&mut self, path: PathBuf) {
        let Some(name) = output::sanitized_contract_name(&path) else { return };
        if let Some(previous) = self.paths.insert(name.clone(), path.clone()) {
            let candidates = self.collisions.entry(name).or_insert_with(|| vec![previous]);
            candidates.push(path);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    /// Every path that was indexed under `name`, in visiting order, if there was more than one.
    pub fn candidates(&self, name: &str) -> Option<&[PathBuf]> {
        self.collisions.get(name).map(Vec::as_slice)
    }

    pub fn collisions(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<PathBuf> for ArtifactPathIndex {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut index = Self::default();
        for path in iter {
            index.insert(path);
        }
        index
    }
}

/// Reads forge artifacts by contract name.
#[derive(Clone, Debug)]
pub struct LocalResolver {
    root: PathBuf,
    index: ArtifactPathIndex,
    deny_ambiguous: bool,
}

impl LocalResolver {
    /// Indexes the artifacts under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index = ArtifactPathIndex::new(&root)?;
        debug!(root = %root.display(), artifacts = index.len(), "indexed forge artifacts");
        Ok(Self { root, index, deny_ambiguous: false })
    }

    /// Fail on names shared by several artifacts instead of using the last one.
    #[must_use]
    pub fn deny_ambiguous(mut self, deny: bool) -> Self {
        self.deny_ambiguous = deny;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &ArtifactPathIndex {
        &self.index
    }

    /// Finds the artifact file of the contract.
    ///
    /// The conventional `<root>/<name>.sol/<name>.json` location is tried first, then the index.
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        let conventional = output::conventional_artifact_path(&self.root, name);
        if conventional.is_file() {
            return Ok(conventional);
        }
        info!(
            contract = name,
            path = %conventional.display(),
            "cannot find forge-artifact at standard path, trying the artifact index"
        );

        let lookup = output::strip_version(name);
        let Some(path) = self.index.get(&lookup) else {
            return Err(BindgenError::ArtifactNotFound { contract: name.to_string(), path: conventional });
        };
        if let Some(candidates) = self.index.candidates(&lookup) {
            if self.deny_ambiguous {
                return Err(BindgenError::AmbiguousArtifact {
                    contract: name.to_string(),
                    paths: candidates.to_vec(),
                });
            }
            warn!(
                contract = name,
                ?candidates,
                path = %path.display(),
                "several forge artifacts match, using the last one"
            );
        }
        Ok(path.to_path_buf())
    }

    /// Reads and parses the artifact of the contract.
    #[instrument(level = "debug", skip(self))]
    pub fn read_artifact(&self, name: &str) -> Result<ForgeArtifact> {
        let path = self.artifact_path(name)?;
        let content = fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => {
                BindgenError::ArtifactNotFound { contract: name.to_string(), path: path.clone() }
            }
            _ => BindgenError::io(err, &path),
        })?;
        let artifact = serde_json::from_str(&content).map_err(|err| {
            BindgenError::MalformedArtifact { contract: name.to_string(), path: path.clone(), err }
        })?;
        trace!(path = %path.display(), "read forge artifact");
        Ok(artifact)
    }
}

/// Names of the contracts whose deployed source map is embedded in their metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceMapsSet(BTreeSet<String>);

impl SourceMapsSet {
    /// Parses a comma separated list, entries are trimmed and empty ones dropped.
    pub fn parse(list: &str) -> Self {
        list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for SourceMapsSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Escapes `s` for the inside of a double quoted string literal.
pub fn escape_for_literal(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Returns the deployed source map of the contract, empty unless it is in `source_maps`, and its
/// canonical storage layout as compact JSON escaped for a string literal.
pub fn canonicalize_storage_layout(
    artifact: &ForgeArtifact,
    monorepo_base: &Path,
    source_maps: &SourceMapsSet,
    name: &str,
) -> Result<(String, String)> {
    let layout = canonicalize_ast_ids(&artifact.storage_layout, monorepo_base);
    let json = serde_json::to_string(&layout)
        .map_err(|err| BindgenError::StorageLayout { contract: name.to_string(), err })?;

    let source_map = if source_maps.contains(name) {
        artifact.deployed_source_map().to_string()
    } else {
        String::new()
    };
    Ok((source_map, escape_for_literal(&json)))
}

/// [`MetadataProvider`] reading local forge artifacts.
#[derive(Clone, Debug)]
pub struct LocalProvider {
    resolver: LocalResolver,
    monorepo_base: PathBuf,
    source_maps: SourceMapsSet,
}

impl LocalProvider {
    /// A relative `monorepo_base` is resolved against the current directory.
    pub fn new(config: &LocalConfig, source_maps: SourceMapsSet) -> Result<Self> {
        let resolver = LocalResolver::new(&config.forge_artifacts)?
            .deny_ambiguous(config.deny_ambiguous_artifacts);
        let monorepo_base = utils::absolute_path(&config.monorepo_base)?;
        Ok(Self { resolver, monorepo_base, source_maps })
    }

    pub fn resolver(&self) -> &LocalResolver {
        &self.resolver
    }
}

impl MetadataProvider for LocalProvider {
    type Contract = String;
    type Artifact = ForgeArtifact;

    const KIND: &'static str = "local";

    fn resolve(&self, contract: &String) -> Result<ForgeArtifact> {
        self.resolver.read_artifact(contract)
    }

    fn staged_files(&self, artifact: &ForgeArtifact) -> Result<StagedFiles> {
        Ok(StagedFiles {
            abi: serde_json::to_vec(&artifact.abi)?,
            bytecode: artifact.bytecode.object.to_string().into_bytes(),
        })
    }

    fn metadata(
        &self,
        contract: &String,
        artifact: ForgeArtifact,
        package: &str,
    ) -> Result<ContractMetadata> {
        let (deployed_source_map, storage_layout) =
            canonicalize_storage_layout(&artifact, &self.monorepo_base, &self.source_maps, contract)?;
        Ok(ContractMetadata::Local(LocalContractMetadata {
            name: contract.clone(),
            package: package.to_string(),
            deployed_bin: artifact.deployed_bytecode.object.to_string(),
            storage_layout,
            deployed_source_map,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const ARTIFACT: &str = r#"{
        "abi": [],
        "bytecode": {"object": "0x6080"},
        "deployedBytecode": {"object": "0x6001", "sourceMap": "1:2:3:-:0"},
        "storageLayout": {
            "storage": [{"astId": 77, "contract": "/repo/src/Bridge.sol:Bridge", "label": "name", "offset": 0, "slot": "0", "type": "t_string_storage"}],
            "types": {"t_string_storage": {"encoding": "bytes", "label": "string", "numberOfBytes": "32"}}
        }
    }"#;

    fn write(root: &Path, file: &str, contents: &str) -> PathBuf {
        let path = root.join(file);
        utils::create_parent_dir_all(&path).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn last_visited_artifact_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let first = write(tmp.path(), "A.sol/Bridge.0.8.15.json", ARTIFACT);
        let second = write(tmp.path(), "B.sol/Bridge.json", ARTIFACT);
        write(tmp.path(), "C.sol/Other.json", ARTIFACT);

        let index = ArtifactPathIndex::new(tmp.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Bridge"), Some(second.as_path()));
        assert_eq!(index.candidates("Bridge"), Some(&[first, second][..]));
        assert!(index.candidates("Other").is_none());
    }

    #[test]
    fn prefers_conventional_path() {
        let tmp = tempfile::tempdir().unwrap();
        let conventional = write(tmp.path(), "Bridge.sol/Bridge.json", ARTIFACT);
        write(tmp.path(), "Z.sol/Bridge.json", ARTIFACT);

        let resolver = LocalResolver::new(tmp.path()).unwrap().deny_ambiguous(true);
        assert_eq!(resolver.artifact_path("Bridge").unwrap(), conventional);
    }

    #[test]
    fn ambiguous_lookup_can_be_denied() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "L1/Bridge.sol/Bridge.json", ARTIFACT);
        let last = write(tmp.path(), "L2/Bridge.sol/Bridge.json", ARTIFACT);

        let resolver = LocalResolver::new(tmp.path()).unwrap();
        assert_eq!(resolver.artifact_path("Bridge").unwrap(), last);

        let err = resolver.deny_ambiguous(true).artifact_path("Bridge").unwrap_err();
        assert!(matches!(err, BindgenError::AmbiguousArtifact { ref paths, .. } if paths.len() == 2));
    }

    #[test]
    fn missing_and_malformed_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "Broken.sol/Broken.json", "{\"abi\": 3}");
        let resolver = LocalResolver::new(tmp.path()).unwrap();

        let err = resolver.read_artifact("Missing").unwrap_err();
        assert!(matches!(err, BindgenError::ArtifactNotFound { .. }));
        assert!(err.to_string().contains("Missing"));

        let err = resolver.read_artifact("Broken").unwrap_err();
        assert!(matches!(err, BindgenError::MalformedArtifact { .. }));
        assert!(err.to_string().contains("Broken.json"));
    }

    #[test]
    fn parses_source_maps_list() {
        let set = SourceMapsSet::parse(" MIPS, ,PreimageOracle,");
        assert!(set.contains("MIPS"));
        assert!(set.contains("PreimageOracle"));
        assert!(!set.contains(""));
        assert!(SourceMapsSet::parse("").is_empty());
    }

    #[test]
    fn source_map_is_gated() {
        let artifact: ForgeArtifact = serde_json::from_str(ARTIFACT).unwrap();
        let base = Path::new("/repo");

        let (source_map, layout) =
            canonicalize_storage_layout(&artifact, base, &SourceMapsSet::parse("Bridge"), "Bridge")
                .unwrap();
        assert_eq!(source_map, "1:2:3:-:0");
        assert_eq!(
            layout,
            r#"{\"storage\":[{\"astId\":1000,\"contract\":\"src/Bridge.sol:Bridge\",\"label\":\"name\",\"offset\":0,\"slot\":\"0\",\"type\":\"t_string_storage\"}],\"types\":{\"t_string_storage\":{\"encoding\":\"bytes\",\"label\":\"string\",\"numberOfBytes\":\"32\"}}}"#
        );

        let (source_map, again) =
            canonicalize_storage_layout(&artifact, base, &SourceMapsSet::parse("MIPS"), "Bridge")
                .unwrap();
        assert_eq!(source_map, "");
        assert_eq!(again, layout);
    }

    #[test]
    fn relative_base_strips_absolute_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        let raw = ARTIFACT.replace("/repo/src/Bridge.sol", &format!("{}/src/Bridge.sol", cwd.display()));
        write(tmp.path(), "Bridge.sol/Bridge.json", &raw);

        let provider =
            LocalProvider::new(&LocalConfig::new(tmp.path(), "."), SourceMapsSet::default()).unwrap();
        let name = "Bridge".to_string();
        let artifact = provider.resolve(&name).unwrap();
        let ContractMetadata::Local(metadata) = provider.metadata(&name, artifact, "bindings").unwrap()
        else {
            panic!("expected local metadata")
        };
        assert!(metadata.storage_layout.contains(r#"\"contract\":\"src/Bridge.sol:Bridge\""#));
        assert_eq!(metadata.deployed_source_map, "");
    }

    #[test]
    fn escapes_backslashes_first() {
        assert_eq!(escape_for_literal(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_for_literal(r#"\""#), r#"\\\""#);
    }
}
