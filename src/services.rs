use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct Registration {
    type_name: &'static str,
    instance: Box<dyn Any>,
}

/// Mutable set of service registrations, turned into a [`ServiceProvider`] once built.
///
/// Services are keyed by their exact type, which may be a trait object:
///
/// ```
/// use std::sync::Arc;
/// use swagger_cli::provider::{DocumentSet, SwaggerProvider};
/// use swagger_cli::services::ServiceCollection;
///
/// let mut services = ServiceCollection::new();
/// services.add::<dyn SwaggerProvider>(Arc::new(DocumentSet::new()));
/// let provider = services.build();
/// assert!(provider.get::<dyn SwaggerProvider>().is_some());
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under `T`, replacing any earlier registration of `T`.
    pub fn add<T: ?Sized + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.registrations.insert(
            TypeId::of::<Arc<T>>(),
            Registration {
                type_name: type_name::<T>(),
                instance: Box::new(service),
            },
        );
        self
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<Arc<T>>())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider {
            registrations: self.registrations,
        }
    }
}

/// Read-only service graph of one target application.
pub struct ServiceProvider {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceProvider {
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.registrations
            .get(&TypeId::of::<Arc<T>>())
            .and_then(|r| r.instance.downcast_ref::<Arc<T>>())
            .cloned()
    }

    pub fn get_required<T: ?Sized + 'static>(&self) -> crate::Result<Arc<T>> {
        self.get::<T>().ok_or_else(|| {
            crate::Error::Resolution(format!(
                "No service for type '{}' has been registered",
                type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.registrations.values().map(|r| r.type_name).collect();
        names.sort_unstable();
        f.debug_struct("ServiceProvider")
            .field("services", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct French;

    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".to_string()
        }
    }

    #[test]
    fn test_resolves_trait_objects_and_concrete_types() {
        let mut services = ServiceCollection::new();
        services
            .add::<dyn Greeter>(Arc::new(English))
            .add(Arc::new(42u32));
        assert_eq!(services.len(), 2);

        let provider = services.build();
        assert_eq!(provider.get::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(*provider.get::<u32>().unwrap(), 42);
        assert!(provider.get::<English>().is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut services = ServiceCollection::new();
        services.add::<dyn Greeter>(Arc::new(English));
        services.add::<dyn Greeter>(Arc::new(French));
        assert_eq!(services.len(), 1);

        let provider = services.build();
        assert_eq!(provider.get::<dyn Greeter>().unwrap().greet(), "bonjour");
    }

    #[test]
    fn test_get_required_names_missing_type() {
        let provider = ServiceCollection::new().build();
        let err = provider.get_required::<dyn Greeter>().err().unwrap();
        assert!(matches!(err, crate::Error::Resolution(_)));
        assert!(err.to_string().contains("Greeter"));
    }

    #[test]
    fn test_debug_lists_service_names() {
        let mut services = ServiceCollection::new();
        services.add(Arc::new(String::from("x")));
        let debug = format!("{:?}", services.build());
        assert!(debug.contains("String"));
    }
}
