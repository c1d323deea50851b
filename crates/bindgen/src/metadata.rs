//! Renders the `<contract>_more.rs` module holding a contract's metadata.

use contract_bindgen_core::error::{BindgenError, Result};
use handlebars::{no_escape, Handlebars};
use heck::ToShoutySnakeCase;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Appended to the lowercased contract name to form the metadata file stem.
pub const METADATA_FILE_SUFFIX: &str = "_more";

pub const METADATA_FILE_EXTENSION: &str = "rs";

const ETHERSCAN_TEMPLATE_NAME: &str = "etherscan";
const LOCAL_TEMPLATE_NAME: &str = "local";

const ETHERSCAN_TEMPLATE: &str = r#"// Code generated - DO NOT EDIT.
// This file is a generated binding and any manual changes will be lost.

//! Metadata of the `{{name}}` contract in the `{{package}}` package.

use contract_bindgen::MetadataRegistry;

pub const {{const_prefix}}_DEPLOYED_BIN: &str = "{{deployed_bin}}";

pub fn register(registry: &mut MetadataRegistry) {
    registry.insert_deployed_bytecode("{{name}}", {{const_prefix}}_DEPLOYED_BIN);
}
"#;

const LOCAL_TEMPLATE: &str = r#"// Code generated - DO NOT EDIT.
// This file is a generated binding and any manual changes will be lost.

//! Metadata of the `{{name}}` contract in the `{{package}}` package.

use contract_bindgen::MetadataRegistry;

pub const {{const_prefix}}_STORAGE_LAYOUT_JSON: &str = "{{storage_layout}}";

pub const {{const_prefix}}_DEPLOYED_BIN: &str = "{{deployed_bin}}";
{{#if deployed_source_map}}

pub const {{const_prefix}}_DEPLOYED_SOURCE_MAP: &str = "{{deployed_source_map}}";
{{/if}}

pub fn register(registry: &mut MetadataRegistry) {
    registry.insert_storage_layout("{{name}}", {{const_prefix}}_STORAGE_LAYOUT_JSON);
    registry.insert_deployed_bytecode("{{name}}", {{const_prefix}}_DEPLOYED_BIN);
{{#if deployed_source_map}}
    registry.insert_deployed_source_map("{{name}}", {{const_prefix}}_DEPLOYED_SOURCE_MAP);
{{/if}}
}
"#;

/// Metadata of a contract fetched from Etherscan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EtherscanContractMetadata {
    pub name: String,
    pub package: String,
    pub deployed_bin: String,
}

/// Metadata of a contract read from a local forge artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocalContractMetadata {
    pub name: String,
    pub package: String,
    pub deployed_bin: String,
    /// Canonical storage layout JSON, escaped for a string literal
    pub storage_layout: String,
    /// Empty unless the contract's source map was requested
    pub deployed_source_map: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractMetadata {
    Etherscan(EtherscanContractMetadata),
    Local(LocalContractMetadata),
}

impl ContractMetadata {
    pub fn name(&self) -> &str {
        match self {
            Self::Etherscan(m) => &m.name,
            Self::Local(m) => &m.name,
        }
    }
}

#[derive(Serialize)]
struct TemplateContext<'a, T> {
    #[serde(flatten)]
    metadata: &'a T,
    const_prefix: String,
}

impl<'a, T> TemplateContext<'a, T> {
    fn new(name: &str, metadata: &'a T) -> Self {
        Self { metadata, const_prefix: name.to_shouty_snake_case() }
    }
}

/// Writes metadata modules into a directory.
#[derive(Debug)]
pub struct MetadataEmitter {
    handlebars: Handlebars<'static>,
    out_dir: PathBuf,
}

impl MetadataEmitter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(no_escape);
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(ETHERSCAN_TEMPLATE_NAME, ETHERSCAN_TEMPLATE)
            .map_err(|err| BindgenError::msg(format!("invalid Etherscan metadata template: {err}")))?;
        handlebars
            .register_template_string(LOCAL_TEMPLATE_NAME, LOCAL_TEMPLATE)
            .map_err(|err| BindgenError::msg(format!("invalid local metadata template: {err}")))?;
        Ok(Self { handlebars, out_dir: out_dir.into() })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `<out_dir>/<lowercase name>_more.rs`
    pub fn metadata_file_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!(
            "{}{METADATA_FILE_SUFFIX}.{METADATA_FILE_EXTENSION}",
            name.to_lowercase()
        ))
    }

    /// Renders the metadata module of the contract and writes it, replacing any existing file.
    pub fn write(&self, metadata: &ContractMetadata) -> Result<PathBuf> {
        let name = metadata.name();
        let path = self.metadata_file_path(name);
        let rendered = match metadata {
            ContractMetadata::Etherscan(m) => {
                self.handlebars.render(ETHERSCAN_TEMPLATE_NAME, &TemplateContext::new(name, m))
            }
            ContractMetadata::Local(m) => {
                self.handlebars.render(LOCAL_TEMPLATE_NAME, &TemplateContext::new(name, m))
            }
        }
        .map_err(|err| BindgenError::Render {
            contract: name.to_string(),
            path: path.clone(),
            err: Box::new(err),
        })?;

        let file_err = |err: std::io::Error| BindgenError::MetadataFile {
            contract: name.to_string(),
            path: path.clone(),
            err,
        };
        fs::create_dir_all(&self.out_dir).map_err(file_err)?;
        fs::write(&path, rendered).map_err(file_err)?;
        info!(contract = name, path = %path.display(), "wrote contract metadata");
        Ok(path)
    }
}
