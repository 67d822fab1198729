use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::services::{ServiceCollection, ServiceProvider};

/// Environment variable selecting the hosting environment name.
pub const ENVIRONMENT_VARIABLE: &str = "SWAGGER_ENVIRONMENT";
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Configures a target application's services.
pub type StartupFn = fn(&HostingEnvironment, &mut ServiceCollection) -> anyhow::Result<()>;

type ConfigureServices = Box<dyn FnOnce(&mut ServiceCollection) -> anyhow::Result<()>>;

#[derive(Debug, Clone, PartialEq)]
pub struct HostingEnvironment {
    pub application_name: String,
    pub environment_name: String,
    pub content_root: PathBuf,
    /// `appsettings.json` merged with `appsettings.{environment_name}.json`.
    pub configuration: Value,
}

impl HostingEnvironment {
    pub fn is_development(&self) -> bool {
        self.environment_name.eq_ignore_ascii_case("Development")
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }
}

/// Generic host returned by a `SwaggerHostFactory`.
pub struct Host {
    services: ServiceProvider,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    pub fn into_services(self) -> ServiceProvider {
        self.services
    }
}

#[derive(Default)]
pub struct HostBuilder {
    configure: Vec<ConfigureServices>,
}

impl HostBuilder {
    pub fn configure_services<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ServiceCollection) -> anyhow::Result<()> + 'static,
    {
        self.configure.push(Box::new(configure));
        self
    }

    pub fn build(self) -> anyhow::Result<Host> {
        let mut services = ServiceCollection::new();
        for configure in self.configure {
            configure(&mut services)?;
        }
        Ok(Host {
            services: services.build(),
        })
    }
}

/// Web host, either returned by a `SwaggerWebHostFactory` or built from a startup.
pub struct WebHost {
    services: ServiceProvider,
    environment: HostingEnvironment,
}

impl WebHost {
    /// Builder preconfigured with the environment name from [`ENVIRONMENT_VARIABLE`]
    /// and the current directory as content root.
    pub fn create_default_builder() -> WebHostBuilder {
        WebHostBuilder {
            application_name: None,
            startup: None,
            content_root: std::env::current_dir().unwrap_or_default(),
            environment_name: std::env::var(ENVIRONMENT_VARIABLE)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            configure: Vec::new(),
        }
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    pub fn environment(&self) -> &HostingEnvironment {
        &self.environment
    }

    pub fn into_services(self) -> ServiceProvider {
        self.services
    }
}

pub struct WebHostBuilder {
    application_name: Option<String>,
    startup: Option<StartupFn>,
    content_root: PathBuf,
    environment_name: String,
    configure: Vec<ConfigureServices>,
}

impl WebHostBuilder {
    /// Uses the startup registered for `application_name`, if any.
    pub fn use_startup(mut self, application_name: impl Into<String>, startup: Option<StartupFn>) -> Self {
        self.application_name = Some(application_name.into());
        self.startup = startup;
        self
    }

    pub fn use_content_root(mut self, content_root: impl Into<PathBuf>) -> Self {
        self.content_root = content_root.into();
        self
    }

    pub fn use_environment(mut self, environment_name: impl Into<String>) -> Self {
        self.environment_name = environment_name.into();
        self
    }

    pub fn configure_services<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ServiceCollection) -> anyhow::Result<()> + 'static,
    {
        self.configure.push(Box::new(configure));
        self
    }

    pub fn build(self) -> crate::Result<WebHost> {
        let application_name = self.application_name.ok_or_else(|| {
            crate::Error::Resolution("No startup application has been configured".to_string())
        })?;
        let startup = self.startup.ok_or_else(|| {
            crate::Error::Resolution(format!(
                "A startup for application '{}' has not been registered",
                application_name
            ))
        })?;

        let environment = HostingEnvironment {
            configuration: load_app_settings(&self.content_root, &self.environment_name)?,
            application_name,
            environment_name: self.environment_name,
            content_root: self.content_root,
        };
        log::debug!(
            "Building web host for {} ({}) from {}",
            environment.application_name,
            environment.environment_name,
            environment.content_root.display()
        );

        let mut services = ServiceCollection::new();
        startup(&environment, &mut services)?;
        for configure in self.configure {
            configure(&mut services)?;
        }

        Ok(WebHost {
            services: services.build(),
            environment,
        })
    }
}

fn load_app_settings(content_root: &Path, environment_name: &str) -> crate::Result<Value> {
    let mut merged = Map::new();
    for file in [
        "appsettings.json".to_string(),
        format!("appsettings.{}.json", environment_name),
    ] {
        let path = content_root.join(file);
        if !path.is_file() {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(settings)) => merged.extend(settings),
            Ok(_) => {
                return Err(crate::Error::Parse(format!(
                    "{} must contain a JSON object",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(crate::Error::Parse(format!(
                    "Failed to parse {}: {}",
                    path.display(),
                    e
                )));
            }
        }
    }
    Ok(Value::Object(merged))
}
