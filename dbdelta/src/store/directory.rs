use crate::common::{
    BIDIRECTIONAL_DIRECTORY_NAME, DEFAULT_MODULE_NAME, DELTA_SCRIPT_EXTENSION, ROLLBACK_DIRECTORY_NAME,
    UPGRADE_DIRECTORY_NAME,
};
use crate::delta::{DeltaScriptCategory, ScriptCandidate, ScriptProvider};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::{Module, ModuleProvider};
use crate::version::{Version, VersionProvider};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How modules map onto the base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryLayout {
    /// `<base>/<module>/<version>/<category>/<script>`
    #[default]
    Modular,
    /// `<base>/<version>/<category>/<script>` with a single default module
    SingleModule,
}

/// Names used when reading a script tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayoutSettings {
    pub script_extension: String,
    pub upgrade_directory_name: String,
    pub rollback_directory_name: String,
    pub bidirectional_directory_name: String,
    pub default_module_name: String,
}

impl Default for DirectoryLayoutSettings {
    fn default() -> Self {
        DirectoryLayoutSettings {
            script_extension: DELTA_SCRIPT_EXTENSION.to_string(),
            upgrade_directory_name: UPGRADE_DIRECTORY_NAME.to_string(),
            rollback_directory_name: ROLLBACK_DIRECTORY_NAME.to_string(),
            bidirectional_directory_name: BIDIRECTIONAL_DIRECTORY_NAME.to_string(),
            default_module_name: DEFAULT_MODULE_NAME.to_string(),
        }
    }
}

impl DirectoryLayoutSettings {
    pub fn directory_name(&self, category: DeltaScriptCategory) -> &str {
        match category {
            DeltaScriptCategory::Upgrade => &self.upgrade_directory_name,
            DeltaScriptCategory::Rollback => &self.rollback_directory_name,
            DeltaScriptCategory::Bidirectional => &self.bidirectional_directory_name,
        }
    }
}

/// Reads modules, versions and scripts from a directory tree.
///
/// Version identifiers are the names of the version directories; script
/// names are the full file names, from which sequence numbers are parsed.
/// Only files carrying the configured extension are considered scripts.
#[derive(Clone)]
pub struct DirectoryScriptStore {
    inner: Arc<DirectoryScriptStoreInner>,
}

struct DirectoryScriptStoreInner {
    base_directory: PathBuf,
    layout: DirectoryLayout,
    settings: DirectoryLayoutSettings,
}

impl DirectoryScriptStore {
    /// Fails with [ErrorKind::ModuleDirectoryError] unless `base_directory`
    /// is an existing directory.
    pub fn new<P: AsRef<Path>>(
        base_directory: P,
        layout: DirectoryLayout,
        settings: DirectoryLayoutSettings,
    ) -> MigrationResult<Self> {
        let base_directory = base_directory.as_ref();
        if !base_directory.is_dir() {
            log::error!("No base directory exists for locating modules: {}", base_directory.display());
            return Err(MigrationError::new(
                ErrorKind::ModuleDirectoryError,
                &format!("no base directory exists for locating modules: {}", base_directory.display()),
            ));
        }

        Ok(DirectoryScriptStore {
            inner: Arc::new(DirectoryScriptStoreInner {
                base_directory: base_directory.to_path_buf(),
                layout,
                settings,
            }),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.inner.base_directory
    }

    pub fn layout(&self) -> DirectoryLayout {
        self.inner.layout
    }

    pub fn settings(&self) -> &DirectoryLayoutSettings {
        &self.inner.settings
    }

    fn module_directory(&self, module: &Module) -> MigrationResult<PathBuf> {
        match self.inner.layout {
            DirectoryLayout::SingleModule => {
                if module.name() == self.inner.settings.default_module_name {
                    Ok(self.inner.base_directory.clone())
                } else {
                    log::error!("Module {} does not exist in a single module layout", module.name());
                    Err(MigrationError::new(
                        ErrorKind::InvalidModule,
                        &format!("unknown module '{}'", module.name()),
                    ))
                }
            }
            DirectoryLayout::Modular => {
                let directory = self.inner.base_directory.join(module.name());
                if !directory.exists() {
                    log::error!("No directory found for module {}", module.name());
                    return Err(MigrationError::new(
                        ErrorKind::InvalidModule,
                        &format!("no directory found for module '{}'", module.name()),
                    ));
                }
                if !directory.is_dir() {
                    log::error!("Module path {} is not a directory", directory.display());
                    return Err(MigrationError::new(
                        ErrorKind::ModuleDirectoryError,
                        &format!("the given module '{}' is not a directory", module.name()),
                    ));
                }
                Ok(directory)
            }
        }
    }
}

impl ModuleProvider for DirectoryScriptStore {
    fn load_modules(&self) -> MigrationResult<Vec<Module>> {
        let default_name = &self.inner.settings.default_module_name;
        match self.inner.layout {
            DirectoryLayout::SingleModule => Ok(vec![Module::new(default_name, true)]),
            DirectoryLayout::Modular => {
                let modules: Vec<Module> = child_entries(&self.inner.base_directory, EntryKind::Directory)?
                    .into_iter()
                    .map(|(name, _)| {
                        let is_default = &name == default_name;
                        Module::new(&name, is_default)
                    })
                    .collect();
                if !modules.iter().any(Module::is_default) {
                    let expected = self.inner.base_directory.join(default_name);
                    log::error!("No default module directory found at {}", expected.display());
                    return Err(MigrationError::new(
                        ErrorKind::ResourceError,
                        &format!(
                            "a modular layout needs a default module directory named '{}', none found at {}",
                            default_name,
                            expected.display()
                        ),
                    ));
                }
                Ok(modules)
            }
        }
    }
}

impl VersionProvider for DirectoryScriptStore {
    fn list_versions(&self, module: &Module) -> MigrationResult<Vec<String>> {
        let directory = self.module_directory(module)?;
        Ok(child_entries(&directory, EntryKind::Directory)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }
}

impl ScriptProvider for DirectoryScriptStore {
    fn fetch_scripts(
        &self,
        category: DeltaScriptCategory,
        module: &Module,
        version: &Version,
    ) -> MigrationResult<Vec<ScriptCandidate>> {
        let version_directory = self.module_directory(module)?.join(version.name());
        if !version_directory.is_dir() {
            log::error!("No directory found for version {} of {}", version, module.name());
            return Err(MigrationError::new(
                ErrorKind::VersionDirectoryError,
                &format!("no directory found for version '{}' of module '{}'", version, module.name()),
            ));
        }

        let directory = version_directory.join(self.inner.settings.directory_name(category));
        if !directory.exists() {
            log::debug!("No directory found for category={} in version={}", category, version);
            return Ok(Vec::new());
        }
        if !directory.is_dir() {
            log::error!("Expected a directory at {}", directory.display());
            return Err(MigrationError::new(
                ErrorKind::ResourceError,
                &format!("invalid version directory provided: expected a directory at {}", directory.display()),
            ));
        }

        let extension = &self.inner.settings.script_extension;
        child_entries(&directory, EntryKind::File)?
            .into_iter()
            .filter(|(name, _)| name.ends_with(extension.as_str()))
            .map(|(name, path)| {
                let contents = fs::read_to_string(&path).map_err(|err| {
                    log::error!("Failed to read script {}: {}", path.display(), err);
                    MigrationError::new_with_cause(
                        ErrorKind::ResourceError,
                        &format!("cannot read script {}", path.display()),
                        err.into(),
                    )
                })?;
                Ok(ScriptCandidate::from_file_name(&name, &contents))
            })
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

/// Child entries of `directory` of the given kind, sorted by name.
fn child_entries(directory: &Path, kind: EntryKind) -> MigrationResult<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(directory).map_err(|err| {
        log::error!("Failed to list {}: {}", directory.display(), err);
        MigrationError::new_with_cause(
            ErrorKind::ResourceError,
            &format!("cannot list directory {}", directory.display()),
            err.into(),
        )
    })?;

    let mut children = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = match kind {
            EntryKind::Directory => path.is_dir(),
            EntryKind::File => path.is_file(),
        };
        if !matches {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => children.push((name.to_string(), path.clone())),
            None => log::warn!("Skipping entry with a non UTF-8 name: {}", path.display()),
        }
    }
    children.sort();
    Ok(children)
}
