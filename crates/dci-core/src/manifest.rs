//! Reads the minimum supported Rust version and driver settings from `Cargo.toml`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CiError;

/// What the driver needs from the project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// `package.rust-version`.
    pub msrv: String,
    /// `package.metadata.dci`, if present.
    pub settings: DciSettings,
}

/// Optional `[package.metadata.dci]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DciSettings {
    /// Feature exercised by the second configuration of every suite.
    pub feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    package: Option<RawPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawPackage {
    rust_version: Option<toml::Value>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    dci: DciSettings,
}

/// Loads and validates the manifest at `path`.
///
/// # Errors
/// Returns [`CiError::Config`] if the file cannot be read or lacks a string
/// `rust-version` in its `[package]` table.
pub fn load(path: &Path) -> Result<Manifest, CiError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CiError::Config(format!("could not read {}: {e}", path.display())))?;
    parse(&text).map_err(|e| match e {
        CiError::Config(msg) => CiError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Parses manifest text.
///
/// # Errors
/// See [`load`].
pub fn parse(text: &str) -> Result<Manifest, CiError> {
    let raw: RawManifest =
        toml::from_str(text).map_err(|e| CiError::Config(format!("invalid TOML: {e}")))?;
    let package = raw
        .package
        .ok_or_else(|| CiError::Config("no [package] section found".into()))?;

    let msrv = match package.rust_version {
        None => return Err(CiError::Config("no rust-version key found".into())),
        Some(toml::Value::String(v)) => v.trim().to_string(),
        Some(_) => return Err(CiError::Config("rust-version is not a string".into())),
    };
    if msrv.is_empty() {
        return Err(CiError::Config("rust-version is empty".into()));
    }

    Ok(Manifest {
        msrv,
        settings: package.metadata.dci,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn config_message(result: Result<Manifest, CiError>) -> String {
        match result {
            Err(CiError::Config(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_reads_rust_version() {
        let manifest = parse(
            r#"
[package]
name = "demo"
version = "0.1.0"
rust-version = "1.70"

[dependencies]
rust-version = "not this one"
"#,
        )
        .unwrap();
        assert_eq!(manifest.msrv, "1.70");
        assert_eq!(manifest.settings, DciSettings::default());
    }

    #[test]
    fn test_reads_feature_setting() {
        let manifest = parse(
            r#"
[package]
rust-version = "1.75.0"

[package.metadata.dci]
feature = "async"
"#,
        )
        .unwrap();
        assert_eq!(manifest.settings.feature.as_deref(), Some("async"));
    }

    #[test]
    fn test_missing_package_section() {
        let msg = config_message(parse("[workspace]\nmembers = []\n"));
        assert!(msg.contains("[package]"));
    }

    #[test]
    fn test_missing_key() {
        let msg = config_message(parse("[package]\nname = \"demo\"\n"));
        assert_eq!(msg, "no rust-version key found");
    }

    #[test]
    fn test_workspace_inherited_version_is_rejected() {
        let msg = config_message(parse("[package]\nrust-version.workspace = true\n"));
        assert_eq!(msg, "rust-version is not a string");
    }

    #[test]
    fn test_malformed_toml() {
        let msg = config_message(parse("[package\nrust-version = \"1.70\""));
        assert!(msg.starts_with("invalid TOML"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Cargo.toml");
        fs::write(&path, "[package]\nrust-version = 170\n").unwrap();
        let msg = config_message(load(&path));
        assert!(msg.contains("Cargo.toml"));
        assert!(msg.ends_with("rust-version is not a string"));

        let missing = config_message(load(&dir.path().join("nope.toml")));
        assert!(missing.starts_with("could not read"));
    }
}
