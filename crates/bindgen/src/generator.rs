//! The binding generator seam and its command line implementation.

use crate::config::BindgenConfig;
use contract_bindgen_core::error::{BindgenError, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

pub const ABIGEN: &str = "abigen";

/// Environment variable overriding the binding generator executable.
pub const BINDGEN_PATH_ENV: &str = "BINDGEN_PATH";

/// Generates the bindings of a contract from its staged ABI and bytecode.
pub trait BindingGenerator {
    fn generate(&self, abi: &Path, bytecode: &Path, package: &str, name: &str) -> Result<()>;
}

impl<T: BindingGenerator + ?Sized> BindingGenerator for &T {
    fn generate(&self, abi: &Path, bytecode: &Path, package: &str, name: &str) -> Result<()> {
        (**self).generate(abi, bytecode, package, name)
    }
}

/// Skips binding generation, only the metadata files are written.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGenerator;

impl BindingGenerator for NoopGenerator {
    fn generate(&self, _abi: &Path, _bytecode: &Path, _package: &str, name: &str) -> Result<()> {
        trace!(contract = name, "skipping binding generation");
        Ok(())
    }
}

/// Abstraction over an `abigen`-style command line utility
///
/// By default the executable is configured as follows, with descending priority:
///   1. `BINDGEN_PATH` environment variable
///   2. `abigen` otherwise
///
/// Each contract is generated with
/// `<program> [args..] --abi <abi> --bin <bin> --pkg <package> --type <name> --out <out_dir>/<name>.<extension>`
/// where the file name is the lowercased contract name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandGenerator {
    /// Path to the executable
    pub program: PathBuf,
    /// Additional arguments passed before the generated ones
    pub args: Vec<String>,
    /// Directory the bindings are written to
    pub out_dir: PathBuf,
    pub extension: String,
}

impl Default for CommandGenerator {
    fn default() -> Self {
        let program = std::env::var(BINDGEN_PATH_ENV).unwrap_or_else(|_| ABIGEN.to_string());
        Self::new(program, "bindings")
    }
}

impl fmt::Display for CommandGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.join(" "))?;
        }
        Ok(())
    }
}

impl CommandGenerator {
    pub fn new(program: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            out_dir: out_dir.into(),
            extension: "rs".to_string(),
        }
    }

    /// The default executable writing to the configured bindings directory.
    pub fn from_config(config: &BindgenConfig) -> Self {
        Self { out_dir: config.bindings_out.clone(), ..Default::default() }
    }

    /// Adds an argument to pass to the command.
    #[must_use]
    pub fn arg<T: Into<String>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments to pass to the command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The file the bindings of `name` are written to.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", name.to_lowercase(), self.extension))
    }

    fn command(&self, abi: &Path, bytecode: &Path, package: &str, name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--abi")
            .arg(abi)
            .arg("--bin")
            .arg(bytecode)
            .arg("--pkg")
            .arg(package)
            .arg("--type")
            .arg(name)
            .arg("--out")
            .arg(self.output_path(name));
        cmd.stdin(Stdio::null()).stderr(Stdio::piped()).stdout(Stdio::piped());
        cmd
    }

    fn map_io_err(&self) -> impl FnOnce(std::io::Error) -> BindgenError + '_ {
        move |err| BindgenError::io(err, &self.program)
    }
}

impl BindingGenerator for CommandGenerator {
    #[instrument(name = "generate", level = "debug", skip_all, fields(contract = name))]
    fn generate(&self, abi: &Path, bytecode: &Path, package: &str, name: &str) -> Result<()> {
        let mut cmd = self.command(abi, bytecode, package, name);
        debug!(?cmd, "generating bindings");
        let output = cmd.output().map_err(self.map_io_err())?;
        debug!(%output.status, output.stderr = ?String::from_utf8_lossy(&output.stderr), "finished");
        generator_output(name, output)
    }
}

fn generator_output(name: &str, output: Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(BindgenError::Generator {
            contract: name.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
