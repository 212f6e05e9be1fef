use crate::common::{
    CompositionContext, Context, CHANGE_LOG_TABLE_NAME, CREATION_TIMESTAMP, CREATION_TIMESTAMP_FORMAT,
    DATABASE_ENGINE, FILE_TYPE, MODULE_NAME, RELEASE_LABEL, SCRIPT_AUTHOR, SCRIPT_COUNT, STATEMENT_DELIMITER,
    STATEMENT_SEPARATOR,
};
use crate::delta::{DeltaScriptCatalog, DeltaScriptCategory};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::migration::{CompositionSettings, MigrationComposer, MigrationWriterFactory};
use crate::module::{Module, ModuleRegistry};
use crate::plan::{CompositionPlan, MigrationDirection, ScriptOrderingEngine};
use crate::version::{Version, VersionResolver};
use itertools::Itertools;
use std::sync::Arc;

/// What to generate in one [MigrationGenerator::generate] call.
///
/// - no version, no modules: the latest version of every module
/// - no version, named modules: the latest version of each named module
/// - a version, no modules: that version of the default module
/// - a version, named modules: that version of each named module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    engine: String,
    modules: Vec<String>,
    version: Option<String>,
}

impl GenerationRequest {
    pub fn new(engine: &str) -> Self {
        GenerationRequest {
            engine: engine.to_string(),
            modules: Vec::new(),
            version: None,
        }
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modules = modules.into_iter().map(|m| m.as_ref().to_string()).collect();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Splits a comma separated module list, dropping blank entries.
pub fn parse_module_list(modules: &str) -> Vec<String> {
    modules
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// The artifacts produced for one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMigration {
    pub module: Module,
    pub version: Version,
    pub directions: Vec<MigrationDirection>,
}

struct PreparedComposition {
    plan: CompositionPlan,
    context: CompositionContext,
}

/// Resolves, validates and composes migration artifacts.
///
/// Every target is resolved and planned in both directions before the
/// first writer is created, and no artifact is published before every
/// writer of the request has finished, so a failure anywhere in a request
/// emits nothing.
#[derive(Clone)]
pub struct MigrationGenerator {
    inner: Arc<MigrationGeneratorInner>,
}

struct MigrationGeneratorInner {
    registry: ModuleRegistry,
    resolver: VersionResolver,
    catalog: DeltaScriptCatalog,
    ordering: ScriptOrderingEngine,
    writer_factory: Arc<dyn MigrationWriterFactory>,
    settings: CompositionSettings,
}

impl MigrationGenerator {
    pub fn new(
        registry: ModuleRegistry,
        resolver: VersionResolver,
        catalog: DeltaScriptCatalog,
        writer_factory: Arc<dyn MigrationWriterFactory>,
        settings: CompositionSettings,
    ) -> Self {
        let ordering = ScriptOrderingEngine::new(settings.upgrade_placement, settings.rollback_placement);
        MigrationGenerator {
            inner: Arc::new(MigrationGeneratorInner {
                registry,
                resolver,
                catalog,
                ordering,
                writer_factory,
                settings,
            }),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.inner.registry
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.inner.resolver
    }

    pub fn catalog(&self) -> &DeltaScriptCatalog {
        &self.inner.catalog
    }

    pub fn settings(&self) -> &CompositionSettings {
        &self.inner.settings
    }

    /// Fetches, validates and orders the scripts of one artifact.
    pub fn plan(&self, module: &Module, version: &Version, direction: MigrationDirection) -> MigrationResult<CompositionPlan> {
        let catalog = &self.inner.catalog;
        let directional = catalog.get_scripts(direction.category(), module, version)?;
        let bidirectional = catalog.get_scripts(DeltaScriptCategory::Bidirectional, module, version)?;
        self.inner
            .ordering
            .plan(direction, module, version, directional, bidirectional)
    }

    /// Composes one artifact. Returns `false`, creating no writer, when the
    /// direction has no scripts.
    pub fn compose(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<bool> {
        let plan = self.plan(module, version, direction)?;
        if plan.is_empty() {
            log::info!("No {} scripts for {}/{}, skipping", direction, module.name(), version.name());
            return Ok(false);
        }
        let context = self.composition_context(engine, &plan);
        self.emit(engine, vec![PreparedComposition { plan, context }])?;
        Ok(true)
    }

    /// Composes the upgrade and, when present, the rollback artifact of a
    /// version. Returns the directions written.
    pub fn compose_module_version(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
    ) -> MigrationResult<Vec<MigrationDirection>> {
        let prepared = self.prepare(engine, module, version)?;
        let directions = prepared.iter().map(|p| p.plan.direction()).collect();
        self.emit(engine, prepared)?;
        Ok(directions)
    }

    /// Composes the latest version of the named module.
    ///
    /// An unknown module, or one without versions, is skipped with a
    /// warning and yields `None`.
    pub fn compose_latest_in_module(&self, engine: &str, module_name: &str) -> MigrationResult<Option<Version>> {
        let Some(module) = self.inner.registry.find_by_name(module_name).cloned() else {
            log::warn!("No module found for {}", module_name);
            return Ok(None);
        };
        let Some(version) = self.inner.resolver.latest(&module)? else {
            log::warn!("No version found for module {}", module.name());
            return Ok(None);
        };
        self.compose_module_version(engine, &module, &version)?;
        Ok(Some(version))
    }

    /// Composes the latest version of every module, in name order.
    pub fn compose_latest(&self, engine: &str) -> MigrationResult<Vec<GeneratedMigration>> {
        self.generate(&GenerationRequest::new(engine))
    }

    pub fn generate(&self, request: &GenerationRequest) -> MigrationResult<Vec<GeneratedMigration>> {
        let engine = request.engine();
        let targets = self.targets(request)?;

        let mut generated = Vec::with_capacity(targets.len());
        let mut prepared = Vec::new();
        for (module, version) in targets {
            let compositions = self.prepare(engine, &module, &version)?;
            generated.push(GeneratedMigration {
                module,
                version,
                directions: compositions.iter().map(|p| p.plan.direction()).collect(),
            });
            prepared.extend(compositions);
        }

        self.emit(engine, prepared)?;
        Ok(generated)
    }

    fn targets(&self, request: &GenerationRequest) -> MigrationResult<Vec<(Module, Version)>> {
        let registry = &self.inner.registry;
        let modules = if request.modules().is_empty() {
            match request.version() {
                None => registry.list_all(),
                Some(_) => vec![registry.default_module().clone()],
            }
        } else {
            request
                .modules()
                .iter()
                .unique()
                .map(|name| {
                    registry.find_by_name(name).cloned().ok_or_else(|| {
                        log::error!("No module found for {}", name);
                        MigrationError::new(ErrorKind::InvalidModule, &format!("no module found for '{}'", name))
                    })
                })
                .collect::<MigrationResult<Vec<Module>>>()?
        };

        let mut targets = Vec::with_capacity(modules.len());
        for module in modules {
            match request.version() {
                None => match self.inner.resolver.latest(&module)? {
                    Some(version) => targets.push((module, version)),
                    None => log::warn!("No version found for module {}, skipping", module.name()),
                },
                Some(version_string) => match self.inner.resolver.resolve(&module, version_string)? {
                    Some(version) => targets.push((module, version)),
                    None => {
                        log::error!("No version {} found in module {}", version_string, module.name());
                        return Err(MigrationError::new(
                            ErrorKind::InvalidVersion,
                            &format!("no version '{}' found in module '{}'", version_string, module.name()),
                        ));
                    }
                },
            }
        }
        Ok(targets)
    }

    /// Plans both directions of a version and checks that a non-empty
    /// rollback mirrors the upgrade script count.
    fn prepare(&self, engine: &str, module: &Module, version: &Version) -> MigrationResult<Vec<PreparedComposition>> {
        let upgrade = self.plan(module, version, MigrationDirection::Upgrade)?;
        let rollback = self.plan(module, version, MigrationDirection::Rollback)?;

        if !rollback.is_empty() && rollback.directional().len() != upgrade.directional().len() {
            log::error!(
                "Upgrade and rollback script counts differ in {}/{}: {} vs {}",
                module.name(),
                version.name(),
                upgrade.directional().len(),
                rollback.directional().len()
            );
            return Err(MigrationError::new(
                ErrorKind::VersionDirectoryError,
                &format!(
                    "the number of upgrade scripts ({}) and rollback scripts ({}) differ in {}/{}",
                    upgrade.directional().len(),
                    rollback.directional().len(),
                    module.name(),
                    version.name()
                ),
            ));
        }

        Ok([upgrade, rollback]
            .into_iter()
            .filter(|plan| {
                if plan.is_empty() {
                    log::info!(
                        "No {} scripts for {}/{}, skipping",
                        plan.direction(),
                        module.name(),
                        version.name()
                    );
                }
                !plan.is_empty()
            })
            .map(|plan| {
                let context = self.composition_context(engine, &plan);
                PreparedComposition { plan, context }
            })
            .collect())
    }

    /// Creates every writer before driving any of them, and publishes only
    /// once every artifact of the request has finished. On failure every
    /// artifact of the request is discarded.
    fn emit(&self, engine: &str, prepared: Vec<PreparedComposition>) -> MigrationResult<()> {
        let factory = self.inner.writer_factory.as_ref();
        let mut composers = Vec::with_capacity(prepared.len());
        for composition in prepared {
            let plan = &composition.plan;
            let composer = MigrationComposer::create(factory, engine, plan.module(), plan.version(), plan.direction())?;
            composers.push((composer.deferred(), composition));
        }

        if let Err(err) = Self::drive(engine, &mut composers) {
            log::error!("Discarding {} artifact(s) of the failed request", composers.len());
            composers.iter_mut().for_each(|(composer, _)| composer.discard());
            return Err(err);
        }
        Ok(())
    }

    fn drive(engine: &str, composers: &mut [(MigrationComposer, PreparedComposition)]) -> MigrationResult<()> {
        for (composer, composition) in composers.iter_mut() {
            log::info!(
                "Composing {} {} for {}/{}",
                engine,
                composition.plan.direction(),
                composition.plan.module().name(),
                composition.plan.version().name()
            );
            composer.compose(&composition.plan, composition.context.clone())?;
        }
        composers.iter_mut().try_for_each(|(composer, _)| composer.commit())
    }

    fn composition_context(&self, engine: &str, plan: &CompositionPlan) -> CompositionContext {
        let settings = &self.inner.settings;
        let engine_settings = settings.engine(engine);

        Context::new()
            .with(RELEASE_LABEL, self.inner.resolver.serialize(plan.version()))
            .with(
                CREATION_TIMESTAMP,
                chrono::Local::now().format(CREATION_TIMESTAMP_FORMAT),
            )
            .with(SCRIPT_AUTHOR, settings.author())
            .with(MODULE_NAME, plan.module().name())
            .with(FILE_TYPE, plan.direction().label())
            .with(SCRIPT_COUNT, plan.script_count())
            .with(CHANGE_LOG_TABLE_NAME, engine_settings.change_log_table_name)
            .with(STATEMENT_SEPARATOR, engine_settings.statement_separator)
            .with(STATEMENT_DELIMITER, engine_settings.statement_delimiter)
            .with(DATABASE_ENGINE, engine)
    }
}
