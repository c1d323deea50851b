//! Naming conventions of the forge `out/` directory.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// The compiler version forge appends to an artifact's file name when the same contract was
/// compiled with several compiler versions, e.g. `Greeter.0.8.11.json`.
static VERSION_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\d+\.\d+\.\d+").unwrap());

/// Returns the file name for the contract's artifact
/// `Greeter.json`
pub fn output_file_name(name: impl AsRef<str>) -> PathBuf {
    format!("{}.json", name.as_ref()).into()
}

/// Returns the path to the contract's artifact location based on the contract's file and name
///
/// This returns `contract.sol/contract.json` by default
pub fn output_file(contract_file: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    let name = name.as_ref();
    contract_file
        .as_ref()
        .file_name()
        .map(Path::new)
        .map(|p| p.join(output_file_name(name)))
        .unwrap_or_else(|| output_file_name(name))
}

/// Where forge puts the artifact of a contract that lives in a file of the same name:
/// `<root>/<name>.sol/<name>.json`
pub fn conventional_artifact_path(root: impl AsRef<Path>, name: impl AsRef<str>) -> PathBuf {
    let name = name.as_ref();
    root.as_ref().join(output_file(format!("{name}.sol"), name))
}

/// Expected to return the solidity contract's name derived from the artifact path
/// `out/Greeter.sol/Greeter.json` -> `Greeter`
pub fn contract_name(file: impl AsRef<Path>) -> Option<String> {
    file.as_ref().file_stem().and_then(|s| s.to_str().map(|s| s.to_string()))
}

/// Removes every embedded compiler version from `name`
///
/// `Greeter.0.8.11` -> `Greeter`
pub fn strip_version(name: &str) -> String {
    VERSION_SUFFIX_RE.replace_all(name, "").into_owned()
}

/// Same as [`contract_name`] with the compiler version removed
///
/// `out/Greeter.sol/Greeter.0.8.11.json` -> `Greeter`
pub fn sanitized_contract_name(file: impl AsRef<Path>) -> Option<String> {
    contract_name(file).map(|name| strip_version(&name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_build_output_paths() {
        assert_eq!(output_file("src/L1/Bridge.sol", "Bridge"), PathBuf::from("Bridge.sol/Bridge.json"));
        assert_eq!(output_file("", "Bridge"), PathBuf::from("Bridge.json"));
        assert_eq!(
            conventional_artifact_path("out", "Bridge"),
            PathBuf::from("out/Bridge.sol/Bridge.json")
        );
    }

    #[test]
    fn strips_compiler_versions() {
        assert_eq!(sanitized_contract_name("out/A.sol/A.0.8.15.json").as_deref(), Some("A"));
        assert_eq!(sanitized_contract_name("out/A.sol/A.json").as_deref(), Some("A"));
        assert_eq!(strip_version("ERC20.0.8.19"), "ERC20");
        // only full three part versions are removed
        assert_eq!(strip_version("Proxy.1.2"), "Proxy.1.2");
    }
}
