use crate::hosting::{Host, WebHost};
use crate::module::{Factory, LoadedModule};
use crate::services::ServiceProvider;

pub const HOST_FACTORY_TYPE: &str = "SwaggerHostFactory";
pub const HOST_FACTORY_METHOD: &str = "create_host";
pub const WEB_HOST_FACTORY_TYPE: &str = "SwaggerWebHostFactory";
pub const WEB_HOST_FACTORY_METHOD: &str = "create_web_host";

/// Host types a factory method may declare as its return type.
trait FactoryHost: Sized {
    const TYPE_NAME: &'static str;

    fn select(factory: Factory) -> Option<fn() -> anyhow::Result<Self>>;

    fn into_services(self) -> ServiceProvider;
}

impl FactoryHost for Host {
    const TYPE_NAME: &'static str = "Host";

    fn select(factory: Factory) -> Option<fn() -> anyhow::Result<Self>> {
        match factory {
            Factory::Host(create) => Some(create),
            Factory::WebHost(_) => None,
        }
    }

    fn into_services(self) -> ServiceProvider {
        Host::into_services(self)
    }
}

impl FactoryHost for WebHost {
    const TYPE_NAME: &'static str = "WebHost";

    fn select(factory: Factory) -> Option<fn() -> anyhow::Result<Self>> {
        match factory {
            Factory::WebHost(create) => Some(create),
            Factory::Host(_) => None,
        }
    }

    fn into_services(self) -> ServiceProvider {
        WebHost::into_services(self)
    }
}

/// Builds the service graph of the target module.
///
/// A `SwaggerHostFactory` wins over a `SwaggerWebHostFactory`; without either the
/// module's startup is run on a default web host rooted at the module's directory.
pub fn get_service_provider(module: Option<&LoadedModule<'_>>) -> crate::Result<ServiceProvider> {
    let module = module.ok_or_else(|| {
        crate::Error::Configuration("A startup module is required".to_string())
    })?;

    if let Some(services) =
        try_get_custom_host::<Host>(module, HOST_FACTORY_TYPE, HOST_FACTORY_METHOD)?
    {
        return Ok(services);
    }

    if let Some(services) =
        try_get_custom_host::<WebHost>(module, WEB_HOST_FACTORY_TYPE, WEB_HOST_FACTORY_METHOD)?
    {
        return Ok(services);
    }

    log::info!(
        "No host factory found in {}, building default web host",
        module.name()
    );
    let web_host = WebHost::create_default_builder()
        .use_startup(module.name(), module.startup())
        .use_content_root(module.directory())
        .build()?;
    Ok(web_host.into_services())
}

fn try_get_custom_host<H: FactoryHost>(
    module: &LoadedModule<'_>,
    factory_type: &str,
    factory_method: &str,
) -> crate::Result<Option<ServiceProvider>> {
    let candidates: Vec<_> = module
        .types()
        .iter()
        .filter(|t| t.simple_name() == factory_type)
        .collect();

    let exported = match candidates.as_slice() {
        [] => return Ok(None),
        [single] => *single,
        _ => return Err(crate::Error::AmbiguousFactory(factory_type.to_string())),
    };

    let create = exported
        .method(factory_method)
        .and_then(|m| H::select(m.factory))
        .ok_or_else(|| crate::Error::FactorySignature {
            factory: factory_type.to_string(),
            method: factory_method.to_string(),
            return_type: H::TYPE_NAME,
        })?;

    log::info!("Using {} from {}", exported.name, module.name());
    let host = create()?;
    Ok(Some(H::into_services(host)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::HostingEnvironment;
    use crate::module::{ExportedType, ModuleDefinition};
    use crate::services::ServiceCollection;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Origin(&'static str);

    fn create_host() -> anyhow::Result<Host> {
        Host::builder()
            .configure_services(|services| {
                services.add(Arc::new(Origin("host")));
                Ok(())
            })
            .build()
    }

    fn create_web_host() -> anyhow::Result<WebHost> {
        Ok(WebHost::create_default_builder()
            .use_startup("factory", Some(web_startup))
            .build()?)
    }

    fn failing_host() -> anyhow::Result<Host> {
        anyhow::bail!("host factory failed")
    }

    fn web_startup(_: &HostingEnvironment, services: &mut ServiceCollection) -> anyhow::Result<()> {
        services.add(Arc::new(Origin("web host")));
        Ok(())
    }

    fn startup(environment: &HostingEnvironment, services: &mut ServiceCollection) -> anyhow::Result<()> {
        services.add(Arc::new(Origin("startup")));
        services.add(Arc::new(environment.clone()));
        Ok(())
    }

    fn origin(services: &ServiceProvider) -> &'static str {
        services.get::<Origin>().unwrap().0
    }

    fn loaded(definition: &ModuleDefinition) -> LoadedModule<'_> {
        LoadedModule::new(definition, "/srv/petstore/petstore.dll")
    }

    #[test]
    fn test_absent_module_is_configuration_error() {
        let err = get_service_provider(None).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn test_host_factory_is_preferred() {
        let definition = ModuleDefinition::new("petstore")
            .export(
                ExportedType::new("SwaggerWebHostFactory")
                    .with_method("create_web_host", Factory::WebHost(create_web_host)),
            )
            .export(
                ExportedType::new("petstore::docs::SwaggerHostFactory")
                    .with_method("create_host", Factory::Host(create_host)),
            )
            .with_startup(startup);

        let services = get_service_provider(Some(&loaded(&definition))).unwrap();
        assert_eq!(origin(&services), "host");
    }

    #[test]
    fn test_web_host_factory_is_second_choice() {
        let definition = ModuleDefinition::new("petstore")
            .export(
                ExportedType::new("SwaggerWebHostFactory")
                    .with_method("create_web_host", Factory::WebHost(create_web_host)),
            )
            .with_startup(startup);

        let services = get_service_provider(Some(&loaded(&definition))).unwrap();
        assert_eq!(origin(&services), "web host");
    }

    #[test]
    fn test_multiple_host_factories_are_ambiguous() {
        let definition = ModuleDefinition::new("petstore")
            .export(
                ExportedType::new("v1::SwaggerHostFactory")
                    .with_method("create_host", Factory::Host(create_host)),
            )
            .export(
                ExportedType::new("v2::SwaggerHostFactory")
                    .with_method("create_host", Factory::Host(create_host)),
            )
            .with_startup(startup);

        let err = get_service_provider(Some(&loaded(&definition))).unwrap_err();
        assert!(matches!(err, crate::Error::AmbiguousFactory(ref name) if name == "SwaggerHostFactory"));
    }

    #[test]
    fn test_wrong_return_type_is_signature_error() {
        let definition = ModuleDefinition::new("petstore")
            .export(
                ExportedType::new("SwaggerHostFactory")
                    .with_method("create_host", Factory::WebHost(create_web_host)),
            )
            .with_startup(startup);

        let err = get_service_provider(Some(&loaded(&definition))).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::FactorySignature { return_type: "Host", .. }
        ));
    }

    #[test]
    fn test_missing_method_is_signature_error() {
        let definition = ModuleDefinition::new("petstore")
            .export(
                ExportedType::new("SwaggerWebHostFactory")
                    .with_method("build", Factory::WebHost(create_web_host)),
            )
            .with_startup(startup);

        let err = get_service_provider(Some(&loaded(&definition))).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::FactorySignature { return_type: "WebHost", .. }
        ));
    }

    #[test]
    fn test_factory_failure_is_propagated() {
        let definition = ModuleDefinition::new("petstore").export(
            ExportedType::new("SwaggerHostFactory").with_method("create_host", Factory::Host(failing_host)),
        );

        let err = get_service_provider(Some(&loaded(&definition))).unwrap_err();
        assert_eq!(err.to_string(), "host factory failed");
    }

    #[test]
    fn test_falls_back_to_startup_in_module_directory() {
        let definition = ModuleDefinition::new("petstore")
            .export(ExportedType::new("HostFactory").with_method("create_host", Factory::Host(create_host)))
            .with_startup(startup);

        let services = get_service_provider(Some(&loaded(&definition))).unwrap();
        assert_eq!(origin(&services), "startup");

        let environment = services.get::<HostingEnvironment>().unwrap();
        assert_eq!(environment.application_name, "petstore");
        assert_eq!(environment.content_root, std::path::Path::new("/srv/petstore"));
    }

    #[test]
    fn test_fallback_without_startup_fails() {
        let definition = ModuleDefinition::new("petstore");
        let err = get_service_provider(Some(&loaded(&definition))).unwrap_err();
        assert!(matches!(err, crate::Error::Resolution(_)));
    }
}
