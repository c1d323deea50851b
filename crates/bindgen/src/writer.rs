//! Stages the ABI and bytecode of a contract on disk for the binding generator.

use contract_bindgen_core::{
    error::{BindgenError, Result},
    utils,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of the per-run temporary directory.
pub const TEMP_DIR_PREFIX: &str = "op-bindings";

/// The temporary directory the contract artifacts of one run are staged in.
///
/// The directory is removed by [`TempArtifactsDir::close`], or when dropped.
#[derive(Debug)]
pub struct TempArtifactsDir {
    dir: TempDir,
}

impl TempArtifactsDir {
    /// Creates a new `op-bindings*` directory inside `root`, or the system's temp dir.
    pub fn new(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root).map_err(|err| BindgenError::io(err, root)),
            None => builder.tempdir().map_err(|err| BindgenError::io(err, std::env::temp_dir())),
        }?;
        debug!(dir = %dir.path().display(), "created temporary artifacts directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory.
    ///
    /// A failed removal is logged, it never fails the run.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(dir = %path.display(), "successfully removed temporary artifacts directory"),
            Err(err) => {
                error!(dir = %path.display(), "error removing temporary artifact directory: {err}")
            }
        }
    }
}

/// The staged files of a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractArtifactPaths {
    pub abi: PathBuf,
    pub bytecode: PathBuf,
}

/// Writes `<dir>/<name>.abi` and `<dir>/<name>.bin`.
pub fn write_contract_artifacts(
    dir: &Path,
    name: &str,
    abi: &[u8],
    bytecode: &[u8],
) -> Result<ContractArtifactPaths> {
    let abi_path = dir.join(format!("{name}.abi"));
    utils::write_file(&abi_path, abi)?;
    trace!(path = %abi_path.display(), "wrote ABI");

    let bytecode_path = dir.join(format!("{name}.bin"));
    utils::write_file(&bytecode_path, bytecode)?;
    trace!(path = %bytecode_path.display(), "wrote bytecode");

    Ok(ContractArtifactPaths { abi: abi_path, bytecode: bytecode_path })
}
