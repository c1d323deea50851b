//! Error types shared by the contract-bindgen crates.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::ExitStatus,
};
use thiserror::Error;

pub type Result<T, E = BindgenError> = std::result::Result<T, E>;

/// Boxed error returned by collaborators whose error types this crate does not know about, such
/// as the template engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Various error types
#[derive(Debug, Error)]
pub enum BindgenError {
    /// Errors related to the filesystem
    #[error(transparent)]
    Io(#[from] BindgenIoError),
    /// Deserialization error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// The contract list could not be read or parsed
    #[error("error reading contract list {}: {err}", .path.display())]
    ContractList { path: PathBuf, err: Box<BindgenError> },
    /// The contract list parsed, but named no contracts
    #[error("no contracts parsable from given contract list: {}", .0.display())]
    EmptyContractList(PathBuf),
    /// The request never produced a response body
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// The explorer responded with something that is not the expected envelope
    #[error("failed to parse response from {url}: {err}")]
    MalformedResponse { url: String, err: serde_json::Error },
    /// The explorer responded with a non-OK status that is not retryable
    #[error("there was an issue with the Etherscan request to {url}, received response: {response}")]
    EtherscanStatus { url: String, response: String },
    /// Every attempt was rate limited
    #[error("failed to fetch ABI of {contract} after {retries} retries")]
    RetriesExhausted { contract: String, retries: u32 },
    /// No artifact could be located for the contract
    #[error("cannot find forge artifact of {contract:?} (tried {})", .path.display())]
    ArtifactNotFound { contract: String, path: PathBuf },
    /// More than one artifact shares the contract's sanitized name
    #[error("ambiguous forge artifact for {contract:?}, candidates: {}", DisplayPaths(.paths))]
    AmbiguousArtifact { contract: String, paths: Vec<PathBuf> },
    /// The artifact exists but is not a valid forge artifact
    #[error("failed to parse forge artifact of {contract:?} at {}: {err}", .path.display())]
    MalformedArtifact { contract: String, path: PathBuf, err: serde_json::Error },
    /// The canonical storage layout could not be serialized
    #[error("error marshaling canonical storage of {contract}: {err}")]
    StorageLayout { contract: String, err: serde_json::Error },
    /// The metadata file could not be created or written
    #[error("error opening {contract}'s metadata file at {}: {err}", .path.display())]
    MetadataFile { contract: String, path: PathBuf, err: io::Error },
    /// The metadata template failed to render
    #[error("error writing {contract}'s contract metadata at {}: {err}", .path.display())]
    Render { contract: String, path: PathBuf, err: BoxError },
    /// The external binding generator exited unsuccessfully
    #[error("binding generator failed for {contract} ({status}):\n{stderr}")]
    Generator { contract: String, status: ExitStatus, stderr: String },
    /// Several contracts failed in a run that collects errors
    #[error("{} contract(s) failed:\n{}", .0.len(), DisplayFailures(.0))]
    Batch(Vec<(String, BindgenError)>),
    #[error("{0}")]
    Message(String),
}

impl BindgenError {
    pub fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        BindgenIoError::new(err, path).into()
    }

    pub fn msg(msg: impl fmt::Display) -> Self {
        Self::Message(msg.to_string())
    }

    /// Whether this error was caused by a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(err) if err.source().kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct BindgenIoError {
    io: io::Error,
    path: PathBuf,
}

impl BindgenIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    /// The path at which the error occurred
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying `io::Error`
    pub fn source(&self) -> &io::Error {
        &self.io
    }
}

impl From<BindgenIoError> for io::Error {
    fn from(err: BindgenIoError) -> Self {
        err.io
    }
}

struct DisplayPaths<'a>(&'a [PathBuf]);

impl fmt::Display for DisplayPaths<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

struct DisplayFailures<'a>(&'a [(String, BindgenError)]);

impl fmt::Display for DisplayFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (contract, err) in self.0 {
            writeln!(f, "  {contract}: {err}")?;
        }
        Ok(())
    }
}
