use crate::common::{CompositionContext, ScriptContext, ARTIFACT_EXTENSION, SCRIPT_CONTENTS};
use crate::delta::{DeltaScriptCategory, TemplateLocator};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::migration::{
    indent_placeholder_value, ArtifactSink, BufferSink, FileSink, MigrationScriptWriter, MigrationWriterFactory,
    PlaceholderRenderer, TemplateRenderer,
};
use crate::module::Module;
use crate::plan::MigrationDirection;
use crate::version::Version;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The three templates an artifact is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterTemplates {
    pub file: String,
    pub regular: String,
    pub bidirectional: String,
}

impl WriterTemplates {
    /// Looks up the templates for `engine` and `direction`, failing with
    /// [ErrorKind::MissingResource] when any is absent.
    pub fn locate(locator: &TemplateLocator, engine: &str, direction: MigrationDirection) -> MigrationResult<Self> {
        let file = locator
            .find_migration_script_file_template()?
            .ok_or_else(|| missing_template("migration script file template".to_string()))?;
        let regular = locator
            .find_delta_script_template(engine, direction.category())?
            .ok_or_else(|| missing_template(format!("{} template for engine '{}'", direction, engine)))?;
        let bidirectional = locator
            .find_delta_script_template(engine, DeltaScriptCategory::Bidirectional)?
            .ok_or_else(|| missing_template(format!("bidirectional template for engine '{}'", engine)))?;
        Ok(WriterTemplates {
            file,
            regular,
            bidirectional,
        })
    }
}

fn missing_template(what: String) -> MigrationError {
    log::error!("No {} found", what);
    MigrationError::new(ErrorKind::MissingResource, &format!("no {} found", what))
}

/// Renders an artifact from templates into an [ArtifactSink].
///
/// Output is buffered until [finish](MigrationScriptWriter::finish), which
/// stages it in the sink; [commit](MigrationScriptWriter::commit) publishes
/// it. An aborted composition leaves nothing behind.
pub struct TemplateMigrationWriter {
    templates: WriterTemplates,
    renderer: Arc<dyn TemplateRenderer>,
    sink: Box<dyn ArtifactSink>,
    context: CompositionContext,
    output: String,
}

impl TemplateMigrationWriter {
    pub fn new(templates: WriterTemplates, renderer: Arc<dyn TemplateRenderer>, sink: Box<dyn ArtifactSink>) -> Self {
        TemplateMigrationWriter {
            templates,
            renderer,
            sink,
            context: CompositionContext::new(),
            output: String::new(),
        }
    }

    fn render_script(&mut self, template: &str, script: &ScriptContext) -> MigrationResult<()> {
        let mut context = self.context.merged_with(script);
        if let Some(contents) = script.get(SCRIPT_CONTENTS) {
            context.insert(SCRIPT_CONTENTS, indent_placeholder_value(template, SCRIPT_CONTENTS, contents));
        }
        let rendered = self.renderer.render(template, &context)?;
        self.output.push_str(&rendered);
        Ok(())
    }
}

impl MigrationScriptWriter for TemplateMigrationWriter {
    fn setup(&mut self, context: &CompositionContext) -> MigrationResult<()> {
        self.context = context.clone();
        self.output = self.renderer.render(&self.templates.file, context)?;
        Ok(())
    }

    fn write_regular(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        let template = self.templates.regular.clone();
        self.render_script(&template, script)
    }

    fn write_bidirectional(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        let template = self.templates.bidirectional.clone();
        self.render_script(&template, script)
    }

    fn finish(&mut self) -> MigrationResult<()> {
        log::debug!("Staging artifact for {}", self.sink.describe());
        self.sink.stage(&self.output)
    }

    fn commit(&mut self) -> MigrationResult<()> {
        log::debug!("Committing artifact to {}", self.sink.describe());
        self.sink.publish()
    }

    fn discard(&mut self) {
        log::debug!("Discarding artifact for {}", self.sink.describe());
        self.sink.discard();
    }
}

/// Writes artifacts under an output directory as
/// `<out>[/<module>]/<version>/<direction>.sql`.
///
/// The default module writes straight into `<out>`.
#[derive(Clone)]
pub struct FileWriterFactory {
    output_directory: PathBuf,
    locator: TemplateLocator,
    renderer: Arc<dyn TemplateRenderer>,
}

impl FileWriterFactory {
    /// Fails with [ErrorKind::MissingResource] when `output_directory` is a
    /// file, or is absent and so is its parent.
    pub fn new<P: AsRef<Path>>(output_directory: P, locator: TemplateLocator) -> MigrationResult<Self> {
        let output_directory = output_directory.as_ref();
        if output_directory.exists() {
            if !output_directory.is_dir() {
                log::error!("Output path {} is not a directory", output_directory.display());
                return Err(MigrationError::new(
                    ErrorKind::MissingResource,
                    &format!("no directory found at: {}", output_directory.display()),
                ));
            }
        } else {
            let parent_exists = output_directory
                .parent()
                .map(|p| p.as_os_str().is_empty() || p.is_dir())
                .unwrap_or(false);
            if !parent_exists {
                log::error!("Parent of output directory {} does not exist", output_directory.display());
                return Err(MigrationError::new(
                    ErrorKind::MissingResource,
                    &format!(
                        "parent directory of output directory does not exist: {}",
                        output_directory.display()
                    ),
                ));
            }
        }

        Ok(FileWriterFactory {
            output_directory: output_directory.to_path_buf(),
            locator,
            renderer: Arc::new(PlaceholderRenderer),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn artifact_path(&self, module: &Module, version: &Version, direction: MigrationDirection) -> PathBuf {
        let base = if module.is_default() {
            self.output_directory.clone()
        } else {
            self.output_directory.join(module.name())
        };
        base.join(version.name())
            .join(format!("{}{}", direction.label(), ARTIFACT_EXTENSION))
    }
}

impl MigrationWriterFactory for FileWriterFactory {
    fn create_writer(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<Box<dyn MigrationScriptWriter>> {
        let templates = WriterTemplates::locate(&self.locator, engine, direction)?;
        let path = self.artifact_path(module, version, direction);
        log::debug!("Creating {} writer for {}", direction, path.display());
        Ok(Box::new(TemplateMigrationWriter::new(
            templates,
            self.renderer.clone(),
            Box::new(FileSink::new(path)),
        )))
    }
}

/// Identifies an artifact collected by a [BufferWriterFactory].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub module: String,
    pub version: String,
    pub direction: MigrationDirection,
}

impl ArtifactKey {
    pub fn new(module: &str, version: &str, direction: MigrationDirection) -> Self {
        ArtifactKey {
            module: module.to_string(),
            version: version.to_string(),
            direction,
        }
    }
}

/// Collects rendered artifacts in memory. Clones share the collection.
#[derive(Clone)]
pub struct BufferWriterFactory {
    locator: TemplateLocator,
    renderer: Arc<dyn TemplateRenderer>,
    sinks: Arc<Mutex<BTreeMap<ArtifactKey, BufferSink>>>,
}

impl BufferWriterFactory {
    pub fn new(locator: TemplateLocator) -> Self {
        BufferWriterFactory {
            locator,
            renderer: Arc::new(PlaceholderRenderer),
            sinks: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The committed artifact for the given target.
    pub fn artifact(&self, module: &str, version: &str, direction: MigrationDirection) -> Option<String> {
        self.sinks
            .lock()
            .get(&ArtifactKey::new(module, version, direction))
            .and_then(BufferSink::contents)
    }

    /// Every committed artifact, ordered by key.
    pub fn artifacts(&self) -> Vec<(ArtifactKey, String)> {
        self.sinks
            .lock()
            .iter()
            .filter_map(|(key, sink)| sink.contents().map(|c| (key.clone(), c)))
            .collect()
    }
}

impl MigrationWriterFactory for BufferWriterFactory {
    fn create_writer(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<Box<dyn MigrationScriptWriter>> {
        let templates = WriterTemplates::locate(&self.locator, engine, direction)?;
        let key = ArtifactKey::new(module.name(), version.name(), direction);
        let sink = BufferSink::new(&format!("{}/{}/{}", key.module, key.version, direction));
        self.sinks.lock().insert(key, sink.clone());
        Ok(Box::new(TemplateMigrationWriter::new(
            templates,
            self.renderer.clone(),
            Box::new(sink),
        )))
    }
}
