//! Configuration of a generation run.

use crate::local::SourceMapsSet;
use contract_bindgen_core::{error::Result, utils};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable the Etherscan API key is read from if none is configured.
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

/// The default Etherscan API endpoint.
pub const DEFAULT_ETHERSCAN_ENDPOINT: &str = "https://api.etherscan.io/api";

/// What to do when a contract fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the run on the first failing contract.
    #[default]
    FailFast,
    /// Keep going and report every failing contract at the end.
    Collect,
}

/// Settings shared by local and Etherscan runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindgenConfig {
    /// The JSON file listing the contracts to generate metadata for.
    pub contract_list: PathBuf,
    /// Comma-separated names of the contracts whose deployed source map is embedded.
    pub source_maps: String,
    /// Name of the package the bindings are generated into.
    pub package: String,
    /// Where `<contract>_more.rs` files are written.
    pub metadata_out: PathBuf,
    /// Where the binding generator writes the bindings.
    pub bindings_out: PathBuf,
    /// Parent of the per-run temporary directory, the system's temp dir if `None`.
    pub temp_root: Option<PathBuf>,
    pub error_policy: ErrorPolicy,
    pub etherscan: EtherscanConfig,
    pub local: LocalConfig,
}

impl Default for BindgenConfig {
    fn default() -> Self {
        Self {
            contract_list: "artifacts.json".into(),
            source_maps: String::new(),
            package: "bindings".to_string(),
            metadata_out: "bindings".into(),
            bindings_out: "bindings".into(),
            temp_root: None,
            error_policy: ErrorPolicy::default(),
            etherscan: EtherscanConfig::default(),
            local: LocalConfig::default(),
        }
    }
}

impl BindgenConfig {
    /// Reads the configuration from a JSON file, missing keys fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        utils::read_json_file(path.as_ref())
    }

    #[must_use]
    pub fn with_contract_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.contract_list = path.into();
        self
    }

    #[must_use]
    pub fn with_source_maps(mut self, source_maps: impl Into<String>) -> Self {
        self.source_maps = source_maps.into();
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    #[must_use]
    pub fn with_metadata_out(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_out = dir.into();
        self
    }

    #[must_use]
    pub fn with_bindings_out(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bindings_out = dir.into();
        self
    }

    #[must_use]
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    #[must_use]
    pub fn with_etherscan(mut self, etherscan: EtherscanConfig) -> Self {
        self.etherscan = etherscan;
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: LocalConfig) -> Self {
        self.local = local;
        self
    }

    /// The parsed `source_maps` allow-list
    pub fn source_maps_set(&self) -> SourceMapsSet {
        SourceMapsSet::parse(&self.source_maps)
    }
}

/// Settings of the Etherscan source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EtherscanConfig {
    pub api_key: String,
    pub endpoint: String,
    /// How many times a rate limited ABI request is attempted.
    pub max_retries: u32,
    /// Seconds to wait after a rate limited ABI request.
    #[serde(rename = "retryDelay")]
    pub retry_delay_secs: u64,
    /// Seconds a whole request may take.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    /// Seconds to establish a connection.
    #[serde(rename = "connectTimeout")]
    pub connect_timeout_secs: u64,
}

/// By default the API key is read from the `ETHERSCAN_API_KEY` environment variable.
impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var(ETHERSCAN_API_KEY_ENV).unwrap_or_default(),
            endpoint: DEFAULT_ETHERSCAN_ENDPOINT.to_string(),
            max_retries: 3,
            retry_delay_secs: 2,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl EtherscanConfig {
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay_secs: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_secs = retry_delay_secs;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Settings of the local forge artifacts source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalConfig {
    /// The forge `out/` directory.
    pub forge_artifacts: PathBuf,
    /// Absolute source paths in storage layouts are made relative to this directory, a relative
    /// base is resolved against the current directory.
    pub monorepo_base: PathBuf,
    /// Fail instead of picking the last artifact when several share a contract's name.
    pub deny_ambiguous_artifacts: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            forge_artifacts: "forge-artifacts".into(),
            monorepo_base: ".".into(),
            deny_ambiguous_artifacts: false,
        }
    }
}

impl LocalConfig {
    pub fn new(forge_artifacts: impl Into<PathBuf>, monorepo_base: impl Into<PathBuf>) -> Self {
        Self {
            forge_artifacts: forge_artifacts.into(),
            monorepo_base: monorepo_base.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn deny_ambiguous_artifacts(mut self, deny: bool) -> Self {
        self.deny_ambiguous_artifacts = deny;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config: BindgenConfig = serde_json::from_str(
            r#"{
                "contractList": "artifacts.json",
                "sourceMaps": "MIPS,PreimageOracle",
                "errorPolicy": "collect",
                "etherscan": {"apiKey": "key", "retryDelay": 5},
                "local": {"forgeArtifacts": "out", "monorepoBase": "/repo"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.package, "bindings");
        assert_eq!(config.error_policy, ErrorPolicy::Collect);
        assert_eq!(config.etherscan.api_key, "key");
        assert_eq!(config.etherscan.max_retries, 3);
        assert_eq!(config.etherscan.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.local.forge_artifacts, PathBuf::from("out"));
        assert!(!config.local.deny_ambiguous_artifacts);
        assert!(config.source_maps_set().contains("PreimageOracle"));
    }
}
