use std::path::Path;

use crate::cli::{self, CommandKind, Config};
use crate::module::ModuleRegistry;
use crate::process::{self, BASE_DIRECTORY_VARIABLE, DEPS_FILE_VARIABLE, RUNTIME_CONFIG_VARIABLE};
use crate::settings::ConfigurationSettings;
use crate::{export, resolver};

/// Parses the process arguments, runs the selected command against `registry` and
/// returns the exit code. Errors are logged before their code is returned.
pub fn run_main(registry: &ModuleRegistry) -> i32 {
    let config = cli::parse_args().unwrap_or_else(|e| e.exit());
    match run(registry, &config) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{}", err);
            err.exit_code()
        }
    }
}

pub fn run(registry: &ModuleRegistry, config: &Config) -> crate::Result<i32> {
    match config.command {
        CommandKind::Export => process::run_outer(cli::EXPORT_COMMAND, &config.configuration_file),
        CommandKind::ExportInner => run_inner(registry, &config.configuration_file),
    }
}

/// Serves `_tofile` inside the re-executed process.
pub fn run_inner(registry: &ModuleRegistry, configuration_file: &Path) -> crate::Result<i32> {
    if let (Ok(deps), Ok(runtime)) = (
        std::env::var(DEPS_FILE_VARIABLE),
        std::env::var(RUNTIME_CONFIG_VARIABLE),
    ) {
        log::debug!("Running with dependency manifest {} and runtime config {}", deps, runtime);
    }

    let mut settings = ConfigurationSettings::from_file(configuration_file)?;
    if let Some(base_directory) = std::env::var_os(BASE_DIRECTORY_VARIABLE) {
        settings = settings.rooted_at(Path::new(&base_directory));
    }
    let module = registry.load_from_path(settings.assembly_path())?;
    let services = resolver::get_service_provider(module.as_ref())?;
    export::export(&services, &settings)
}
