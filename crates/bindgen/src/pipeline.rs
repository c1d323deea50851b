//! The per-contract generation loop shared by all contract sources.

use crate::{
    config::{BindgenConfig, ErrorPolicy},
    contracts::NamedContract,
    generator::BindingGenerator,
    metadata::{ContractMetadata, MetadataEmitter},
    writer::{self, TempArtifactsDir},
};
use contract_bindgen_core::error::{BindgenError, Result};
use std::path::{Path, PathBuf};

/// The contents of the `.abi` and `.bin` files handed to the binding generator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagedFiles {
    pub abi: Vec<u8>,
    pub bytecode: Vec<u8>,
}

/// A source of contract artifacts.
pub trait MetadataProvider {
    /// How contracts of this source are named in the contract list
    type Contract: NamedContract;
    /// What is resolved for a contract
    type Artifact;

    /// Human readable name of the source, used in logs
    const KIND: &'static str;

    fn resolve(&self, contract: &Self::Contract) -> Result<Self::Artifact>;

    /// The ABI and bytecode to stage for the binding generator.
    fn staged_files(&self, artifact: &Self::Artifact) -> Result<StagedFiles>;

    fn metadata(
        &self,
        contract: &Self::Contract,
        artifact: Self::Artifact,
        package: &str,
    ) -> Result<ContractMetadata>;
}

/// Runs resolution, binding generation and metadata emission for a list of contracts.
pub struct Pipeline<'a, G: ?Sized> {
    generator: &'a G,
    emitter: MetadataEmitter,
    package: String,
    error_policy: ErrorPolicy,
    temp_root: Option<PathBuf>,
}

impl<'a, G> Pipeline<'a, G>
where
    G: BindingGenerator + ?Sized,
{
    pub fn new(config: &BindgenConfig, generator: &'a G) -> Result<Self> {
        Ok(Self {
            generator,
            emitter: MetadataEmitter::new(&config.metadata_out)?,
            package: config.package.clone(),
            error_policy: config.error_policy,
            temp_root: config.temp_root.clone(),
        })
    }

    pub fn emitter(&self) -> &MetadataEmitter {
        &self.emitter
    }

    /// Processes `contracts` in order and returns the written metadata files.
    ///
    /// With [`ErrorPolicy::FailFast`] the first failing contract aborts the run, with
    /// [`ErrorPolicy::Collect`] the remaining contracts are still processed and all failures are
    /// returned as [`BindgenError::Batch`]. The temporary directory is removed either way.
    pub fn run<P: MetadataProvider>(
        &self,
        provider: &P,
        contracts: &[P::Contract],
    ) -> Result<Vec<PathBuf>> {
        let temp_dir = TempArtifactsDir::new(self.temp_root.as_deref())?;
        let result = self.run_in(temp_dir.path(), provider, contracts);
        temp_dir.close();
        result
    }

    fn run_in<P: MetadataProvider>(
        &self,
        temp_dir: &Path,
        provider: &P,
        contracts: &[P::Contract],
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(contracts.len());
        let mut failures = Vec::new();
        for contract in contracts {
            let name = contract.name();
            info!(contract = name, source = P::KIND, "generating bindings and metadata");
            match self.process(temp_dir, provider, contract) {
                Ok(path) => written.push(path),
                Err(err) => match self.error_policy {
                    ErrorPolicy::FailFast => return Err(err),
                    ErrorPolicy::Collect => {
                        error!(contract = name, "{err}");
                        failures.push((name.to_string(), err));
                    }
                },
            }
        }

        if !failures.is_empty() {
            return Err(BindgenError::Batch(failures));
        }
        Ok(written)
    }

    fn process<P: MetadataProvider>(
        &self,
        temp_dir: &Path,
        provider: &P,
        contract: &P::Contract,
    ) -> Result<PathBuf> {
        let name = contract.name();
        let artifact = provider.resolve(contract)?;

        let staged = provider.staged_files(&artifact)?;
        let paths = writer::write_contract_artifacts(temp_dir, name, &staged.abi, &staged.bytecode)?;
        self.generator.generate(&paths.abi, &paths.bytecode, &self.package, name)?;

        let metadata = provider.metadata(contract, artifact, &self.package)?;
        self.emitter.write(&metadata)
    }
}
