//! The outer half of `tofile`.
//!
//! The tool does not document the target in its own process. It re-executes itself
//! with the hidden `_tofile` command, under the environment the target's runtime
//! manifests describe, and hands back the child's exit code.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use execute::Execute;

use crate::manifest::{DependencyManifest, RuntimeConfig};
use crate::settings::ConfigurationSettings;
use crate::validation::ConfigurationSettingsValidator;

/// Set on the child to the target's dependency manifest.
pub const DEPS_FILE_VARIABLE: &str = "SWAGGER_DEPS_FILE";
/// Set on the child to the target's runtime configuration.
pub const RUNTIME_CONFIG_VARIABLE: &str = "SWAGGER_RUNTIME_CONFIG";
/// Set on the child to the directory `tofile` was started from. Relative paths in the
/// configuration file are resolved against it.
pub const BASE_DIRECTORY_VARIABLE: &str = "SWAGGER_BASE_DIRECTORY";

#[cfg(windows)]
pub const LIBRARY_PATH_VARIABLE: &str = "PATH";
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VARIABLE: &str = "DYLD_LIBRARY_PATH";
#[cfg(all(not(windows), not(target_os = "macos")))]
pub const LIBRARY_PATH_VARIABLE: &str = "LD_LIBRARY_PATH";

/// Name of the hidden command serving `command` inside the child process.
pub fn inner_command_name(command: &str) -> String {
    format!("_{}", command)
}

/// Everything needed to start the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
    pub current_dir: Option<PathBuf>,
}

impl ChildInvocation {
    pub fn build(
        program: impl Into<PathBuf>,
        command: &str,
        configuration_file: &Path,
        base_directory: &Path,
        settings: &ConfigurationSettings,
        runtime_config: &RuntimeConfig,
        dependencies: &DependencyManifest,
    ) -> crate::Result<Self> {
        let mut env: Vec<(OsString, OsString)> = runtime_config
            .environment
            .iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        env.push((DEPS_FILE_VARIABLE.into(), settings.deps_file().into()));
        env.push((
            RUNTIME_CONFIG_VARIABLE.into(),
            settings.runtime_config().into(),
        ));
        env.push((BASE_DIRECTORY_VARIABLE.into(), base_directory.into()));

        if !dependencies.library_paths.is_empty() {
            let inherited = std::env::var_os(LIBRARY_PATH_VARIABLE).unwrap_or_default();
            let search_path = std::env::join_paths(
                dependencies
                    .library_paths
                    .iter()
                    .cloned()
                    .chain(std::env::split_paths(&inherited).filter(|p| !p.as_os_str().is_empty())),
            )
            .map_err(|e| {
                crate::Error::Configuration(format!("Invalid library path in dependency manifest: {}", e))
            })?;
            env.push((LIBRARY_PATH_VARIABLE.into(), search_path));
        }

        Ok(Self {
            program: program.into(),
            args: vec![
                inner_command_name(command).into(),
                configuration_file.as_os_str().to_owned(),
            ],
            env,
            current_dir: runtime_config.working_directory.clone(),
        })
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Runs the child with inherited stdio and waits for it to exit.
    pub fn run(&self) -> crate::Result<i32> {
        let mut command = self.to_command();
        log::debug!("Running {:?}", command);

        let output = command.execute_output().map_err(|e| {
            crate::Error::ChildProcess(format!("Failed to start {}: {}", self.program.display(), e))
        })?;

        match output.status.code() {
            Some(0) => Ok(0),
            Some(code) => {
                log::error!("{} exited with code {}", self.program.display(), code);
                Ok(code)
            }
            None => Err(crate::Error::ChildProcess(format!(
                "{} was terminated before it could exit",
                self.program.display()
            ))),
        }
    }
}

/// Validates the configuration, then re-executes this binary as `_{command}` and
/// returns the child's exit code.
pub fn run_outer(command: &str, configuration_file: &Path) -> crate::Result<i32> {
    if !configuration_file.is_file() {
        return Err(crate::Error::Configuration(format!(
            "{} not found",
            configuration_file.display()
        )));
    }

    let settings = ConfigurationSettings::from_file(configuration_file)?;
    ConfigurationSettingsValidator.validate_and_throw(&settings)?;

    // The runtime config may move the child to another working directory.
    let base_directory = std::env::current_dir()?;
    let settings = settings.rooted_at(&base_directory);

    let runtime_config = RuntimeConfig::load(settings.runtime_config())?;
    let dependencies = DependencyManifest::load(settings.deps_file())?;

    let program = std::env::current_exe().map_err(|e| {
        crate::Error::ChildProcess(format!("Unable to locate the running executable: {}", e))
    })?;
    let configuration_file = configuration_file.canonicalize()?;

    let invocation = ChildInvocation::build(
        program,
        command,
        &configuration_file,
        &base_directory,
        &settings,
        &runtime_config,
        &dependencies,
    )?;
    invocation.run()
}
