use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Runtime settings a target module ships in `<module>.runtimeconfig.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Variables set on the process that loads the module.
    pub environment: BTreeMap<String, String>,
    pub working_directory: Option<PathBuf>,
}

impl RuntimeConfig {
    /// A missing file yields the empty configuration.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let mut config: Self = read_manifest(path)?;
        config.working_directory = config
            .working_directory
            .map(|dir| relative_to_manifest(path, dir));
        Ok(config)
    }
}

/// Native dependencies a target module ships in `<module>.deps.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependencyManifest {
    /// Directories searched for shared libraries before the inherited search path.
    pub library_paths: Vec<PathBuf>,
}

impl DependencyManifest {
    /// A missing file yields the empty manifest.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let mut manifest: Self = read_manifest(path)?;
        manifest.library_paths = manifest
            .library_paths
            .into_iter()
            .map(|dir| relative_to_manifest(path, dir))
            .collect();
        Ok(manifest)
    }
}

fn read_manifest<T: DeserializeOwned + Default>(path: &Path) -> crate::Result<T> {
    if !path.is_file() {
        log::debug!("{} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| crate::Error::Parse(format!("Failed to parse {}: {}", path.display(), e)))
}

fn relative_to_manifest(manifest: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    manifest
        .parent()
        .map(|dir| dir.join(&path))
        .unwrap_or(path)
}
