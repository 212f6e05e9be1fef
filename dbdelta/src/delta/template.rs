use crate::common::{BIDIRECTIONAL_TEMPLATE_FILE, FILE_TEMPLATE_FILE, ROLLBACK_TEMPLATE_FILE, UPGRADE_TEMPLATE_FILE};
use crate::delta::DeltaScriptCategory;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Finds the text templates used to render migration artifacts.
///
/// A locator answers `None` when it has no template for the request; only
/// unreadable templates are errors.
pub trait TemplateLocatorProvider: Send + Sync {
    /// The per-script template for `category` scripts of `engine`.
    fn find_delta_script_template(
        &self,
        engine: &str,
        category: DeltaScriptCategory,
    ) -> MigrationResult<Option<String>>;

    /// The artifact header template.
    fn find_migration_script_file_template(&self) -> MigrationResult<Option<String>>;
}

/// Shared, type-erased handle to a [TemplateLocatorProvider].
#[derive(Clone)]
pub struct TemplateLocator {
    inner: Arc<dyn TemplateLocatorProvider>,
}

impl TemplateLocator {
    pub fn new<T: TemplateLocatorProvider + 'static>(inner: T) -> Self {
        TemplateLocator { inner: Arc::new(inner) }
    }
}

impl Deref for TemplateLocator {
    type Target = Arc<dyn TemplateLocatorProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub fn template_file_name(category: DeltaScriptCategory) -> &'static str {
    match category {
        DeltaScriptCategory::Upgrade => UPGRADE_TEMPLATE_FILE,
        DeltaScriptCategory::Rollback => ROLLBACK_TEMPLATE_FILE,
        DeltaScriptCategory::Bidirectional => BIDIRECTIONAL_TEMPLATE_FILE,
    }
}

/// Templates compiled into the crate for `mssql`, `mysql` and `postgres`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplateLocator;

impl BuiltinTemplateLocator {
    pub const ENGINES: [&'static str; 3] = ["mssql", "mysql", "postgres"];

    fn template(engine: &str, category: DeltaScriptCategory) -> Option<&'static str> {
        use DeltaScriptCategory::*;
        let template = match (engine, category) {
            ("mssql", Upgrade) => include_str!("../../templates/mssql/upgrade_template.txt"),
            ("mssql", Rollback) => include_str!("../../templates/mssql/rollback_template.txt"),
            ("mssql", Bidirectional) => include_str!("../../templates/mssql/bidirectional_template.txt"),
            ("mysql", Upgrade) => include_str!("../../templates/mysql/upgrade_template.txt"),
            ("mysql", Rollback) => include_str!("../../templates/mysql/rollback_template.txt"),
            ("mysql", Bidirectional) => include_str!("../../templates/mysql/bidirectional_template.txt"),
            ("postgres", Upgrade) => include_str!("../../templates/postgres/upgrade_template.txt"),
            ("postgres", Rollback) => include_str!("../../templates/postgres/rollback_template.txt"),
            ("postgres", Bidirectional) => include_str!("../../templates/postgres/bidirectional_template.txt"),
            _ => return None,
        };
        Some(template)
    }
}

impl TemplateLocatorProvider for BuiltinTemplateLocator {
    fn find_delta_script_template(
        &self,
        engine: &str,
        category: DeltaScriptCategory,
    ) -> MigrationResult<Option<String>> {
        Ok(BuiltinTemplateLocator::template(engine, category).map(str::to_string))
    }

    fn find_migration_script_file_template(&self) -> MigrationResult<Option<String>> {
        Ok(Some(include_str!("../../templates/file_template.txt").to_string()))
    }
}

/// Reads templates from `<dir>/<engine>/<category>_template.txt` and
/// `<dir>/file_template.txt`.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateLocator {
    directory: PathBuf,
}

impl DirectoryTemplateLocator {
    pub fn new<P: AsRef<Path>>(directory: P) -> MigrationResult<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            log::error!("No template directory found at {}", directory.display());
            return Err(MigrationError::new(
                ErrorKind::MissingResource,
                &format!("no directory found for the templates: {}", directory.display()),
            ));
        }
        Ok(DirectoryTemplateLocator {
            directory: directory.to_path_buf(),
        })
    }

    fn read(&self, path: PathBuf) -> MigrationResult<Option<String>> {
        match fs::read_to_string(&path) {
            Ok(contents) => {
                log::debug!("Using template {}", path.display());
                Ok(Some(contents))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                log::error!("Failed to read template {}: {}", path.display(), err);
                Err(MigrationError::new_with_cause(
                    ErrorKind::ResourceError,
                    &format!("unreadable template {}", path.display()),
                    err.into(),
                ))
            }
        }
    }
}

impl TemplateLocatorProvider for DirectoryTemplateLocator {
    fn find_delta_script_template(
        &self,
        engine: &str,
        category: DeltaScriptCategory,
    ) -> MigrationResult<Option<String>> {
        self.read(self.directory.join(engine).join(template_file_name(category)))
    }

    fn find_migration_script_file_template(&self) -> MigrationResult<Option<String>> {
        self.read(self.directory.join(FILE_TEMPLATE_FILE))
    }
}

/// Asks each locator in turn and returns the first template found.
#[derive(Clone, Default)]
pub struct PeckingOrderTemplateLocator {
    locators: Vec<TemplateLocator>,
}

impl PeckingOrderTemplateLocator {
    pub fn new(locators: Vec<TemplateLocator>) -> Self {
        PeckingOrderTemplateLocator { locators }
    }

    pub fn then(mut self, locator: TemplateLocator) -> Self {
        self.locators.push(locator);
        self
    }
}

impl TemplateLocatorProvider for PeckingOrderTemplateLocator {
    fn find_delta_script_template(
        &self,
        engine: &str,
        category: DeltaScriptCategory,
    ) -> MigrationResult<Option<String>> {
        for locator in &self.locators {
            if let Some(template) = locator.find_delta_script_template(engine, category)? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }

    fn find_migration_script_file_template(&self) -> MigrationResult<Option<String>> {
        for locator in &self.locators {
            if let Some(template) = locator.find_migration_script_file_template()? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }
}
