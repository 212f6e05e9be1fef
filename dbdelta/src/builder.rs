use crate::common::DBDELTA_VERSION;
use crate::config::MigrationConfig;
use crate::delta::{
    BuiltinTemplateLocator, DeltaScriptCatalog, DirectoryTemplateLocator, PeckingOrderTemplateLocator, ScriptSource,
    TemplateLocator,
};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::migration::{FileWriterFactory, MigrationGenerator, MigrationWriterFactory};
use crate::module::{ModuleRegistry, ModuleSource};
use crate::store::{DirectoryLayout, DirectoryScriptStore, InMemoryScriptStore};
use crate::version::{VersionResolver, VersionSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_VERSION_SCHEME: &str = "default-standard";

enum ScriptInput {
    Directory(PathBuf, DirectoryLayout),
    Memory(InMemoryScriptStore),
}

enum ArtifactOutput {
    Directory(PathBuf),
    Factory(Arc<dyn MigrationWriterFactory>),
}

/// Builder for a [MigrationGenerator].
///
/// Errors raised while configuring are captured and returned from
/// [build](Self::build).
///
/// # Examples
///
/// ```rust,ignore
/// let generator = MigrationEngineBuilder::new()
///     .config_file("db-migrations.yaml")
///     .version_scheme("default-standard")
///     .input_directory("scripts", DirectoryLayout::Modular)
///     .output_directory("out")
///     .build()?;
/// generator.compose_latest("mssql")?;
/// ```
///
/// Without an explicit configuration the bundled one is used.
#[derive(Default)]
pub struct MigrationEngineBuilder {
    error: Option<MigrationError>,
    config: Option<MigrationConfig>,
    version_scheme: Option<String>,
    input: Option<ScriptInput>,
    output: Option<ArtifactOutput>,
    script_author: Option<String>,
}

impl MigrationEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MigrationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        if self.error.is_none() {
            match MigrationConfig::from_file(path) {
                Ok(config) => self.config = Some(config),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Name of a `version-schemes` entry; `default-standard` if unset.
    pub fn version_scheme(mut self, name: &str) -> Self {
        self.version_scheme = Some(name.to_string());
        self
    }

    pub fn input_directory<P: AsRef<Path>>(mut self, path: P, layout: DirectoryLayout) -> Self {
        self.input = Some(ScriptInput::Directory(path.as_ref().to_path_buf(), layout));
        self
    }

    pub fn store(mut self, store: InMemoryScriptStore) -> Self {
        self.input = Some(ScriptInput::Memory(store));
        self
    }

    pub fn output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(ArtifactOutput::Directory(path.as_ref().to_path_buf()));
        self
    }

    pub fn writer_factory<T: MigrationWriterFactory + 'static>(mut self, factory: T) -> Self {
        self.output = Some(ArtifactOutput::Factory(Arc::new(factory)));
        self
    }

    pub fn script_author(mut self, author: &str) -> Self {
        self.script_author = Some(author.to_string());
        self
    }

    pub fn build(self) -> MigrationResult<MigrationGenerator> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let config = match self.config {
            Some(config) => config,
            None => MigrationConfig::bundled()?,
        };
        let scheme_name = self.version_scheme.as_deref().unwrap_or(DEFAULT_VERSION_SCHEME);
        let scheme = config.version_scheme(scheme_name)?;
        log::debug!("Using version scheme {} ({})", scheme_name, scheme.name());

        let (modules, versions, scripts) = match self.input {
            Some(ScriptInput::Directory(path, layout)) => {
                let store = DirectoryScriptStore::new(&path, layout, config.layout_settings())?;
                (
                    ModuleSource::new(store.clone()),
                    VersionSource::new(store.clone()),
                    ScriptSource::new(store),
                )
            }
            Some(ScriptInput::Memory(store)) => (
                ModuleSource::new(store.clone()),
                VersionSource::new(store.clone()),
                ScriptSource::new(store),
            ),
            None => {
                log::error!("No script input configured");
                return Err(MigrationError::new(ErrorKind::MissingResource, "no script input configured"));
            }
        };

        let writer_factory: Arc<dyn MigrationWriterFactory> = match self.output {
            Some(ArtifactOutput::Directory(path)) => Arc::new(FileWriterFactory::new(path, template_locator(&config)?)?),
            Some(ArtifactOutput::Factory(factory)) => factory,
            None => {
                log::error!("No artifact output configured");
                return Err(MigrationError::new(ErrorKind::MissingResource, "no artifact output configured"));
            }
        };

        let registry = ModuleRegistry::load(&modules)?;
        let resolver = VersionResolver::new(scheme, versions, config.resolver_settings());
        let catalog = DeltaScriptCatalog::new(scripts, config.catalog_settings());
        let mut settings = config.composition_settings();
        settings.script_author = self.script_author;

        log::info!("dbdelta {} ready with {} module(s)", DBDELTA_VERSION, registry.len());
        Ok(MigrationGenerator::new(registry, resolver, catalog, writer_factory, settings))
    }
}

/// The override directory of `config`, when set, ahead of the bundled
/// templates.
pub fn template_locator(config: &MigrationConfig) -> MigrationResult<TemplateLocator> {
    let mut locator = PeckingOrderTemplateLocator::default();
    if let Some(directory) = &config.general.template_override_directory {
        locator = locator.then(TemplateLocator::new(DirectoryTemplateLocator::new(directory)?));
    }
    Ok(TemplateLocator::new(locator.then(TemplateLocator::new(BuiltinTemplateLocator))))
}
