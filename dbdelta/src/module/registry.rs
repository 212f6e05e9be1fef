use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::Module;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

/// Supplies the modules known to a migration source.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; a provider may be queried from
/// several compositions at once.
pub trait ModuleProvider: Send + Sync {
    /// Lists every module, in any order.
    ///
    /// Exactly one returned module is expected to carry the default flag;
    /// the registry rejects the listing otherwise.
    fn load_modules(&self) -> MigrationResult<Vec<Module>>;
}

/// Shared, type-erased handle to a [ModuleProvider].
#[derive(Clone)]
pub struct ModuleSource {
    inner: Arc<dyn ModuleProvider>,
}

impl ModuleSource {
    pub fn new<T: ModuleProvider + 'static>(inner: T) -> Self {
        ModuleSource { inner: Arc::new(inner) }
    }
}

impl Deref for ModuleSource {
    type Target = Arc<dyn ModuleProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The validated set of modules known to the engine.
///
/// A registry is built once from a [ModuleSource] and is immutable after
/// that. Cloning is cheap; all clones share the same module table.
///
/// # Invariants
/// - exactly one module is flagged default
/// - module names are unique and well formed
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Arc<ModuleRegistryInner>,
}

struct ModuleRegistryInner {
    modules: BTreeMap<String, Module>,
    default_module: Module,
}

impl ModuleRegistry {
    /// Loads and validates the listing of `source`.
    ///
    /// Fails with [ErrorKind::ResourceError] when the listing does not hold
    /// exactly one default module, and with [ErrorKind::InvalidModule] when a
    /// name is malformed or repeated. Provider failures propagate unchanged.
    pub fn load(source: &ModuleSource) -> MigrationResult<Self> {
        let modules = source.load_modules()?;
        ModuleRegistry::from_modules(modules)
    }

    pub fn from_modules(modules: Vec<Module>) -> MigrationResult<Self> {
        if let Some(invalid) = modules.iter().find(|m| !m.has_valid_name()) {
            log::error!("Malformed module name '{}'", invalid.name());
            return Err(MigrationError::new(
                ErrorKind::InvalidModule,
                &format!("malformed module name '{}'", invalid.name()),
            ));
        }

        let duplicates: Vec<&str> = modules.iter().map(|m| m.name()).duplicates().collect();
        if !duplicates.is_empty() {
            log::error!("Duplicate module names: {:?}", duplicates);
            return Err(MigrationError::new(
                ErrorKind::InvalidModule,
                &format!("duplicate module names: {}", duplicates.join(", ")),
            ));
        }

        let defaults: Vec<&Module> = modules.iter().filter(|m| m.is_default()).collect();
        let default_module = match defaults.as_slice() {
            [single] => (*single).clone(),
            [] => {
                log::error!("No default module among {} module(s)", modules.len());
                return Err(MigrationError::new(
                    ErrorKind::ResourceError,
                    "no default module is defined",
                ));
            }
            many => {
                let names = many.iter().map(|m| m.name()).join(", ");
                log::error!("Multiple default modules: {}", names);
                return Err(MigrationError::new(
                    ErrorKind::ResourceError,
                    &format!("multiple default modules defined: {}", names),
                ));
            }
        };

        log::debug!(
            "Loaded {} module(s), default module is '{}'",
            modules.len(),
            default_module.name()
        );

        let modules = modules
            .into_iter()
            .map(|m| (m.name().to_string(), m))
            .collect();

        Ok(ModuleRegistry {
            inner: Arc::new(ModuleRegistryInner {
                modules,
                default_module,
            }),
        })
    }

    /// Exact, case-sensitive lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Module> {
        self.inner.modules.get(name)
    }

    /// Every module, ordered by name.
    pub fn list_all(&self) -> Vec<Module> {
        self.inner.modules.values().cloned().collect()
    }

    pub fn default_module(&self) -> &Module {
        &self.inner.default_module
    }

    pub fn len(&self) -> usize {
        self.inner.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModules(Vec<Module>);

    impl ModuleProvider for FixedModules {
        fn load_modules(&self) -> MigrationResult<Vec<Module>> {
            Ok(self.0.clone())
        }
    }

    struct FailingModules;

    impl ModuleProvider for FailingModules {
        fn load_modules(&self) -> MigrationResult<Vec<Module>> {
            Err(MigrationError::new(ErrorKind::ModuleDirectoryError, "unreadable"))
        }
    }

    fn registry(modules: Vec<Module>) -> MigrationResult<ModuleRegistry> {
        ModuleRegistry::load(&ModuleSource::new(FixedModules(modules)))
    }

    #[test]
    fn test_load_single_default() {
        let registry = registry(vec![
            Module::new("Payroll", false),
            Module::new("Accounting", true),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.default_module().name(), "Accounting");
        let names: Vec<String> = registry.list_all().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["Accounting", "Payroll"]);
    }

    #[test]
    fn test_find_by_name_is_exact() {
        let registry = registry(vec![Module::new("Accounting", true)]).unwrap();
        assert!(registry.find_by_name("Accounting").is_some());
        assert!(registry.find_by_name("accounting").is_none());
        assert!(registry.find_by_name("Payroll").is_none());
    }

    #[test]
    fn test_no_default_is_resource_error() {
        let err = registry(vec![Module::new("Accounting", false)]).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ResourceError);

        let err = registry(vec![]).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ResourceError);
    }

    #[test]
    fn test_two_defaults_is_resource_error() {
        let err = registry(vec![Module::new("A", true), Module::new("B", true)])
            .err()
            .unwrap();
        assert_eq!(err.code(), 1000);
        assert!(err.to_string().contains("A, B"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = registry(vec![Module::new("A", true), Module::new("A", false)])
            .err()
            .unwrap();
        assert_eq!(err.kind(), &ErrorKind::InvalidModule);
    }

    #[test]
    fn test_malformed_name_rejected() {
        let err = registry(vec![Module::new("bad/name", true)]).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::InvalidModule);
    }

    #[test]
    fn test_provider_failure_propagates() {
        let err = ModuleRegistry::load(&ModuleSource::new(FailingModules)).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ModuleDirectoryError);
    }
}
