//! Registration contract between the tool and the applications it documents.
//!
//! A target application describes itself with a [`ModuleDefinition`]: the factory
//! types it exports and, optionally, a startup used when no factory is present. The
//! definitions are collected in a [`ModuleRegistry`], and the module file named in the
//! configuration selects one of them by its file stem.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::hosting::{Host, StartupFn, WebHost};

/// Parameterless factory function, tagged with the host type it returns.
#[derive(Clone, Copy)]
pub enum Factory {
    Host(fn() -> anyhow::Result<Host>),
    WebHost(fn() -> anyhow::Result<WebHost>),
}

impl Factory {
    pub fn return_type(&self) -> &'static str {
        match self {
            Factory::Host(_) => "Host",
            Factory::WebHost(_) => "WebHost",
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn() -> {}", self.return_type())
    }
}

#[derive(Debug, Clone)]
pub struct ExportedMethod {
    pub name: String,
    pub factory: Factory,
}

/// A type exported by a target module. Names may be path-qualified (`api::docs::Factory`).
#[derive(Debug, Clone)]
pub struct ExportedType {
    pub name: String,
    pub methods: Vec<ExportedMethod>,
}

impl ExportedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, factory: Factory) -> Self {
        self.methods.push(ExportedMethod {
            name: name.into(),
            factory,
        });
        self
    }

    /// Name without its module path.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn method(&self, name: &str) -> Option<&ExportedMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    name: String,
    types: Vec<ExportedType>,
    startup: Option<StartupFn>,
}

impl ModuleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            startup: None,
        }
    }

    pub fn export(mut self, exported: ExportedType) -> Self {
        self.types.push(exported);
        self
    }

    pub fn with_startup(mut self, startup: StartupFn) -> Self {
        self.startup = Some(startup);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[ExportedType] {
        &self.types
    }

    pub fn startup(&self) -> Option<StartupFn> {
        self.startup
    }
}

/// A registered module bound to the file it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedModule<'a> {
    definition: &'a ModuleDefinition,
    location: PathBuf,
}

impl<'a> LoadedModule<'a> {
    pub fn new(definition: &'a ModuleDefinition, location: impl Into<PathBuf>) -> Self {
        Self {
            definition,
            location: location.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Directory holding the module file.
    pub fn directory(&self) -> &Path {
        self.location.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn types(&self) -> &[ExportedType] {
        self.definition.types()
    }

    pub fn startup(&self) -> Option<StartupFn> {
        self.definition.startup()
    }
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDefinition>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: ModuleDefinition) -> crate::Result<&mut Self> {
        if self.get(module.name()).is_some() {
            return Err(crate::Error::Configuration(format!(
                "Module {} is already registered",
                module.name()
            )));
        }
        self.modules.push(module);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Binds the module file at `path` to the definition registered under its file stem.
    ///
    /// Returns `Ok(None)` when the file exists but no definition carries its name.
    pub fn load_from_path(&self, path: impl AsRef<Path>) -> crate::Result<Option<LoadedModule<'_>>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(crate::Error::Configuration(format!(
                "{} not found",
                path.display()
            )));
        }

        let location = path.canonicalize()?;
        let name = location
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let loaded = self.get(&name).map(|definition| LoadedModule::new(definition, location));
        if loaded.is_none() {
            log::warn!("No module named {} is registered", name);
        }
        Ok(loaded)
    }
}
