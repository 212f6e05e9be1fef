use crate::common::{CompositionContext, ScriptContext};
use crate::errors::MigrationResult;
use crate::module::Module;
use crate::plan::MigrationDirection;
use crate::version::Version;

/// Receives the events of one artifact composition.
///
/// Calls always arrive in protocol order, enforced by
/// [MigrationComposer](crate::migration::MigrationComposer):
///
/// ```text
/// setup
///   begin_regular  write_regular*  finish_regular
///   begin_bidirectional  write_bidirectional*  finish_bidirectional
/// finish
/// ```
///
/// Writers that only care about scripts can rely on the default no-op
/// segment hooks.
///
/// `finish` may hold the artifact back until [commit](Self::commit), which
/// the generator calls once every artifact of a request has finished. A
/// request that fails instead calls [discard](Self::discard) on all of its
/// writers. Writers that publish in `finish` keep the default hooks.
pub trait MigrationScriptWriter: Send {
    fn setup(&mut self, context: &CompositionContext) -> MigrationResult<()>;

    fn begin_regular(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    fn write_regular(&mut self, script: &ScriptContext) -> MigrationResult<()>;

    fn finish_regular(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    fn begin_bidirectional(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    fn write_bidirectional(&mut self, script: &ScriptContext) -> MigrationResult<()>;

    fn finish_bidirectional(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    /// Completes the artifact. Nothing may be emitted before this call.
    fn finish(&mut self) -> MigrationResult<()>;

    /// Publishes the artifact completed by `finish`.
    fn commit(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    /// Drops whatever this writer staged or published.
    fn discard(&mut self) {}
}

/// Creates the writer for one artifact.
pub trait MigrationWriterFactory: Send + Sync {
    fn create_writer(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<Box<dyn MigrationScriptWriter>>;
}
