use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read from the configuration file handed to `swagger tofile`.
///
/// Keys are PascalCase, unknown keys are ignored and missing ones fall back to
/// empty or `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConfigurationSettings {
    pub output_json: bool,
    pub output_yaml: bool,
    #[serde(rename = "SerializeAsV2")]
    pub serialize_as_v2: bool,
    #[serde(alias = "AssemblyPath", deserialize_with = "null_as_empty")]
    pub assembly: String,
    pub base_path: Option<String>,
    pub host: Option<String>,
    pub output: Option<String>,
    pub swagger_doc: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ConfigurationSettings {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(crate::Error::Configuration(format!(
                "{} not found",
                path.display()
            )));
        }

        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::Parse(format!("Failed to parse configuration: {}", e)))
    }

    pub fn host(&self) -> Option<&str> {
        non_blank(&self.host)
    }

    pub fn base_path(&self) -> Option<&str> {
        non_blank(&self.base_path)
    }

    pub fn output(&self) -> Option<&Path> {
        non_blank(&self.output).map(Path::new)
    }

    pub fn swagger_doc(&self) -> Option<&str> {
        non_blank(&self.swagger_doc)
    }

    pub fn has_host(&self) -> bool {
        self.host().is_some()
    }

    pub fn has_base_path(&self) -> bool {
        self.base_path().is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output().is_some()
    }

    pub fn loop_through_versions(&self) -> bool {
        self.swagger_doc().is_none()
    }

    pub fn assembly_path(&self) -> &Path {
        Path::new(&self.assembly)
    }

    /// Copy of these settings with a relative `Assembly` and `Output` joined onto `base`.
    pub fn rooted_at(&self, base: &Path) -> Self {
        let root = |value: &str| -> String {
            if value.trim().is_empty() || Path::new(value).is_absolute() {
                value.to_string()
            } else {
                base.join(value).to_string_lossy().into_owned()
            }
        };

        Self {
            assembly: root(&self.assembly),
            output: self.output.as_deref().map(root),
            ..self.clone()
        }
    }

    /// Dependency manifest of the target module, e.g. `app.dll` -> `app.deps.json`.
    pub fn deps_file(&self) -> PathBuf {
        self.assembly_path().with_extension("deps.json")
    }

    /// Runtime configuration of the target module, e.g. `app.dll` -> `app.runtimeconfig.json`.
    pub fn runtime_config(&self) -> PathBuf {
        self.assembly_path().with_extension("runtimeconfig.json")
    }
}
