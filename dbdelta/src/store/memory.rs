use crate::delta::{DeltaScriptCategory, ScriptCandidate, ScriptProvider};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::{Module, ModuleProvider};
use crate::version::{Version, VersionProvider};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory source of modules, versions and scripts.
///
/// # Purpose
/// Suited to tests and to callers that assemble scripts programmatically.
/// The store implements [ModuleProvider], [VersionProvider] and
/// [ScriptProvider], so a single instance can back a whole generator.
///
/// Clones share the same contents. Adding a version creates its module
/// and adding a script creates its version when they are missing.
///
/// # Usage
/// ```text
/// let store = InMemoryScriptStore::new();
/// store
///     .add_module("Accounting", true)
///     .add_script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, "1-add_column.sql", "ALTER TABLE ...");
/// ```
#[derive(Clone, Default)]
pub struct InMemoryScriptStore {
    inner: Arc<RwLock<InMemoryScriptStoreInner>>,
}

#[derive(Default)]
struct InMemoryScriptStoreInner {
    modules: BTreeMap<String, StoredModule>,
}

#[derive(Default)]
struct StoredModule {
    is_default: bool,
    versions: BTreeMap<String, BTreeMap<DeltaScriptCategory, Vec<ScriptCandidate>>>,
}

impl InMemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, or updates the default flag of an existing one.
    pub fn add_module(&self, name: &str, is_default: bool) -> &Self {
        let mut inner = self.inner.write();
        inner.modules.entry(name.to_string()).or_default().is_default = is_default;
        self
    }

    pub fn add_version(&self, module: &str, version: &str) -> &Self {
        let mut inner = self.inner.write();
        inner
            .modules
            .entry(module.to_string())
            .or_default()
            .versions
            .entry(version.to_string())
            .or_default();
        self
    }

    /// Adds a script whose sequence number is taken from `file_name`.
    pub fn add_script(
        &self,
        module: &str,
        version: &str,
        category: DeltaScriptCategory,
        file_name: &str,
        contents: &str,
    ) -> &Self {
        self.add_candidate(module, version, category, ScriptCandidate::from_file_name(file_name, contents))
    }

    pub fn add_candidate(
        &self,
        module: &str,
        version: &str,
        category: DeltaScriptCategory,
        candidate: ScriptCandidate,
    ) -> &Self {
        let mut inner = self.inner.write();
        inner
            .modules
            .entry(module.to_string())
            .or_default()
            .versions
            .entry(version.to_string())
            .or_default()
            .entry(category)
            .or_default()
            .push(candidate);
        self
    }
}

fn unknown_module(name: &str) -> MigrationError {
    log::error!("Module {} is not registered in the script store", name);
    MigrationError::new(ErrorKind::InvalidModule, &format!("unknown module '{}'", name))
}

impl ModuleProvider for InMemoryScriptStore {
    fn load_modules(&self) -> MigrationResult<Vec<Module>> {
        let inner = self.inner.read();
        Ok(inner
            .modules
            .iter()
            .map(|(name, stored)| Module::new(name, stored.is_default))
            .collect())
    }
}

impl VersionProvider for InMemoryScriptStore {
    fn list_versions(&self, module: &Module) -> MigrationResult<Vec<String>> {
        let inner = self.inner.read();
        let stored = inner
            .modules
            .get(module.name())
            .ok_or_else(|| unknown_module(module.name()))?;
        Ok(stored.versions.keys().cloned().collect())
    }
}

impl ScriptProvider for InMemoryScriptStore {
    fn fetch_scripts(
        &self,
        category: DeltaScriptCategory,
        module: &Module,
        version: &Version,
    ) -> MigrationResult<Vec<ScriptCandidate>> {
        let inner = self.inner.read();
        let stored = inner
            .modules
            .get(module.name())
            .ok_or_else(|| unknown_module(module.name()))?;
        let categories = stored.versions.get(version.name()).ok_or_else(|| {
            log::error!("Version {} of module {} is not in the script store", version, module.name());
            MigrationError::new(
                ErrorKind::VersionDirectoryError,
                &format!("unknown version '{}' in module '{}'", version, module.name()),
            )
        })?;
        Ok(categories.get(&category).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn store() -> InMemoryScriptStore {
        let store = InMemoryScriptStore::new();
        store
            .add_module("default", true)
            .add_version("Accounting", "1.0.0")
            .add_script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, "1-add_column.sql", "A")
            .add_script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, "2-add_index.sql", "B");
        store
    }

    #[test]
    fn test_modules_and_versions() {
        let store = store();
        let modules = store.load_modules().unwrap();
        assert_eq!(modules, vec![Module::new("Accounting", false), Module::new("default", true)]);

        let versions = store.list_versions(&Module::new("Accounting", false)).unwrap();
        assert_eq!(versions, vec!["1.0.0", "1.0.1"]);
        assert!(store.list_versions(&Module::new("default", true)).unwrap().is_empty());
    }

    #[test]
    fn test_add_module_updates_flag() {
        let store = store();
        store.add_module("Accounting", true).add_module("default", false);
        let defaults: Vec<Module> = store
            .load_modules()
            .unwrap()
            .into_iter()
            .filter(|m| m.is_default())
            .collect();
        assert_eq!(defaults, vec![Module::new("Accounting", true)]);
    }

    #[test]
    fn test_fetch_scripts() {
        let store = store();
        let module = Module::new("Accounting", false);
        let version = Version::new("1.0.1", smallvec![1, 0, 1]);

        let upgrade = store.fetch_scripts(DeltaScriptCategory::Upgrade, &module, &version).unwrap();
        assert_eq!(upgrade.len(), 2);
        assert_eq!(upgrade[0].sequence_number(), Some(1));

        let rollback = store.fetch_scripts(DeltaScriptCategory::Rollback, &module, &version).unwrap();
        assert!(rollback.is_empty());
    }

    #[test]
    fn test_unknown_lookups() {
        let store = store();
        let version = Version::new("9.9", smallvec![9, 9]);
        let err = store.list_versions(&Module::new("Payroll", false)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidModule);

        let err = store
            .fetch_scripts(DeltaScriptCategory::Upgrade, &Module::new("Accounting", false), &version)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::VersionDirectoryError);
    }
}
