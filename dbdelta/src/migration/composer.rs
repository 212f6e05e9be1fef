use crate::common::{
    CompositionContext, Context, ScriptContext, SCRIPT_CONTENTS, SCRIPT_COUNT, SCRIPT_INDEX, SCRIPT_NAME,
    SCRIPT_SEQUENCE_NUMBER,
};
use crate::delta::DeltaScript;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::migration::{MigrationScriptWriter, MigrationWriterFactory};
use crate::module::Module;
use crate::plan::{CompositionPlan, MigrationDirection};
use crate::version::Version;
use std::fmt::{Display, Formatter};

/// Lifecycle of a [MigrationComposer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposerState {
    Uninitialized,
    Setup,
    RegularProcessing,
    RegularComplete,
    BidirectionalProcessing,
    BidirectionalComplete,
    Finished,
    /// The writer reported a failure; every further call is rejected.
    Failed,
}

impl Display for ComposerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComposerState::Uninitialized => "uninitialized",
            ComposerState::Setup => "set up",
            ComposerState::RegularProcessing => "processing regular scripts",
            ComposerState::RegularComplete => "done with regular scripts",
            ComposerState::BidirectionalProcessing => "processing bidirectional scripts",
            ComposerState::BidirectionalComplete => "done with bidirectional scripts",
            ComposerState::Finished => "finished",
            ComposerState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Counts reported once a composition completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositionSummary {
    pub regular_scripts: usize,
    pub bidirectional_scripts: usize,
}

/// Drives a [MigrationScriptWriter] through the composition protocol.
///
/// Each composer is bound to one (engine, module, version, direction) and
/// is single use. Calls made out of order fail with
/// [ErrorKind::WriterProtocolViolation] and leave the state untouched; a
/// failing writer call moves the composer to [ComposerState::Failed].
///
/// [finish](Self::finish) publishes the artifact unless the composer was
/// [deferred](Self::deferred), in which case it stays staged until
/// [commit](Self::commit) or [discard](Self::discard).
pub struct MigrationComposer {
    engine: String,
    module: Module,
    version: Version,
    direction: MigrationDirection,
    writer: Box<dyn MigrationScriptWriter>,
    state: ComposerState,
    context: Option<CompositionContext>,
    summary: CompositionSummary,
    deferred: bool,
    staged: bool,
}

impl MigrationComposer {
    pub fn new(
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
        writer: Box<dyn MigrationScriptWriter>,
    ) -> Self {
        MigrationComposer {
            engine: engine.to_string(),
            module: module.clone(),
            version: version.clone(),
            direction,
            writer,
            state: ComposerState::Uninitialized,
            context: None,
            summary: CompositionSummary::default(),
            deferred: false,
            staged: false,
        }
    }

    /// Holds the artifact back at [finish](Self::finish) until
    /// [commit](Self::commit).
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Asks `factory` for the writer bound to the given target.
    pub fn create(
        factory: &dyn MigrationWriterFactory,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<Self> {
        let writer = factory.create_writer(engine, module, version, direction)?;
        Ok(MigrationComposer::new(engine, module, version, direction, writer))
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn direction(&self) -> MigrationDirection {
        self.direction
    }

    /// The context supplied at setup.
    pub fn context(&self) -> Option<&CompositionContext> {
        self.context.as_ref()
    }

    pub fn setup(&mut self, context: CompositionContext) -> MigrationResult<()> {
        self.transition("setup", ComposerState::Uninitialized, ComposerState::Setup, |w| {
            w.setup(&context)
        })?;
        self.context = Some(context);
        Ok(())
    }

    pub fn begin_regular(&mut self) -> MigrationResult<()> {
        self.transition(
            "begin regular scripts",
            ComposerState::Setup,
            ComposerState::RegularProcessing,
            |w| w.begin_regular(),
        )
    }

    pub fn write_regular(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        self.transition(
            "write a regular script",
            ComposerState::RegularProcessing,
            ComposerState::RegularProcessing,
            |w| w.write_regular(script),
        )?;
        self.summary.regular_scripts += 1;
        Ok(())
    }

    pub fn finish_regular(&mut self) -> MigrationResult<()> {
        self.transition(
            "finish regular scripts",
            ComposerState::RegularProcessing,
            ComposerState::RegularComplete,
            |w| w.finish_regular(),
        )
    }

    pub fn begin_bidirectional(&mut self) -> MigrationResult<()> {
        self.transition(
            "begin bidirectional scripts",
            ComposerState::RegularComplete,
            ComposerState::BidirectionalProcessing,
            |w| w.begin_bidirectional(),
        )
    }

    pub fn write_bidirectional(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        self.transition(
            "write a bidirectional script",
            ComposerState::BidirectionalProcessing,
            ComposerState::BidirectionalProcessing,
            |w| w.write_bidirectional(script),
        )?;
        self.summary.bidirectional_scripts += 1;
        Ok(())
    }

    pub fn finish_bidirectional(&mut self) -> MigrationResult<()> {
        self.transition(
            "finish bidirectional scripts",
            ComposerState::BidirectionalProcessing,
            ComposerState::BidirectionalComplete,
            |w| w.finish_bidirectional(),
        )
    }

    pub fn finish(&mut self) -> MigrationResult<CompositionSummary> {
        let deferred = self.deferred;
        self.transition(
            "finish",
            ComposerState::BidirectionalComplete,
            ComposerState::Finished,
            |w| {
                w.finish()?;
                if deferred {
                    Ok(())
                } else {
                    w.commit()
                }
            },
        )?;
        self.staged = deferred;
        log::info!(
            "Composed {} {} for {}/{} with {} regular and {} bidirectional script(s)",
            self.engine,
            self.direction,
            self.module.name(),
            self.version.name(),
            self.summary.regular_scripts,
            self.summary.bidirectional_scripts
        );
        Ok(self.summary)
    }

    /// Publishes the artifact a deferred composer staged at finish.
    pub fn commit(&mut self) -> MigrationResult<()> {
        if !self.staged {
            return Err(self.violation("commit"));
        }
        self.transition("commit", ComposerState::Finished, ComposerState::Finished, |w| {
            w.commit()
        })?;
        self.staged = false;
        Ok(())
    }

    /// Drops the artifact, staged or published, and rejects every further
    /// call.
    pub fn discard(&mut self) {
        log::warn!(
            "Discarding {} {} for {}/{}",
            self.engine,
            self.direction,
            self.module.name(),
            self.version.name()
        );
        self.writer.discard();
        self.staged = false;
        self.state = ComposerState::Failed;
    }

    /// Runs the whole protocol for `plan`.
    pub fn compose(&mut self, plan: &CompositionPlan, context: CompositionContext) -> MigrationResult<CompositionSummary> {
        if plan.direction() != self.direction
            || plan.module() != &self.module
            || plan.version() != &self.version
        {
            log::error!(
                "Plan for {}/{} {} handed to composer bound to {}/{} {}",
                plan.module().name(),
                plan.version().name(),
                plan.direction(),
                self.module.name(),
                self.version.name(),
                self.direction
            );
            return Err(MigrationError::new(
                ErrorKind::WriterProtocolViolation,
                "composition plan does not match the composer target",
            ));
        }

        self.setup(context)?;

        self.begin_regular()?;
        let count = plan.directional().len();
        for (i, script) in plan.directional().iter().enumerate() {
            self.write_regular(&script_context(script, i + 1, count))?;
        }
        self.finish_regular()?;

        self.begin_bidirectional()?;
        let count = plan.bidirectional().len();
        for (i, script) in plan.bidirectional().iter().enumerate() {
            self.write_bidirectional(&script_context(script, i + 1, count))?;
        }
        self.finish_bidirectional()?;

        self.finish()
    }

    fn transition<F>(&mut self, operation: &str, expected: ComposerState, next: ComposerState, action: F) -> MigrationResult<()>
    where
        F: FnOnce(&mut dyn MigrationScriptWriter) -> MigrationResult<()>,
    {
        if self.state != expected {
            return Err(self.violation(operation));
        }

        match action(self.writer.as_mut()) {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(err) => {
                log::error!("Writer failed to {}: {}", operation, err);
                self.state = ComposerState::Failed;
                Err(err)
            }
        }
    }

    fn violation(&self, operation: &str) -> MigrationError {
        log::error!(
            "Cannot {} while the composer for {}/{} {} is {}",
            operation,
            self.module.name(),
            self.version.name(),
            self.direction,
            self.state
        );
        MigrationError::new(
            ErrorKind::WriterProtocolViolation,
            &format!("cannot {} while the composer is {}", operation, self.state),
        )
    }
}

/// The per-script context: name, contents, 1-based index, segment size and
/// sequence number.
pub fn script_context(script: &DeltaScript, index: usize, count: usize) -> ScriptContext {
    Context::new()
        .with(SCRIPT_NAME, script.name())
        .with(SCRIPT_CONTENTS, script.contents())
        .with(SCRIPT_INDEX, index)
        .with(SCRIPT_COUNT, count)
        .with(SCRIPT_SEQUENCE_NUMBER, script.sequence_number())
}
