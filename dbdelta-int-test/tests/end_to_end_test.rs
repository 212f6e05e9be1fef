use dbdelta::common::{
    CompositionContext, Context, ScriptContext, CHANGE_LOG_TABLE_NAME, DATABASE_ENGINE, FILE_TYPE, MODULE_NAME,
    RELEASE_LABEL, SCRIPT_AUTHOR, SCRIPT_COUNT, STATEMENT_DELIMITER, STATEMENT_SEPARATOR,
};
use dbdelta::delta::{BuiltinTemplateLocator, CatalogSettings, DeltaScriptCatalog, DeltaScriptCategory, ScriptSource, TemplateLocator};
use dbdelta::errors::{ErrorKind, MigrationError, MigrationResult};
use dbdelta::migration::{
    script_context, ComposerState, FileWriterFactory, MigrationComposer, MigrationScriptWriter, MigrationWriterFactory,
};
use dbdelta::module::{Module, ModuleRegistry, ModuleSource};
use dbdelta::plan::MigrationDirection;
use dbdelta::store::{DirectoryLayout, DirectoryLayoutSettings, DirectoryScriptStore};
use dbdelta::version::{ResolverSettings, StandardScheme, Version, VersionResolver, VersionScheme, VersionSource};
use dbdelta::{GenerationRequest, MigrationEngineBuilder};
use dbdelta_int_test::test_util::{accounting_fixture, cleanup, create_test_context, run_test};
use std::fs;
use std::path::{Path, PathBuf};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_compose_latest_accounting_release() {
    run_test(
        create_test_context,
        |ctx| {
            accounting_fixture(ctx);
            let store = DirectoryScriptStore::new(ctx.input(), DirectoryLayout::Modular, DirectoryLayoutSettings::default())?;
            let registry = ModuleRegistry::load(&ModuleSource::new(store.clone()))?;
            let resolver = VersionResolver::new(
                VersionScheme::new(StandardScheme::default()),
                VersionSource::new(store.clone()),
                ResolverSettings::default(),
            );
            let catalog = DeltaScriptCatalog::new(ScriptSource::new(store), CatalogSettings::default());

            let module = registry.find_by_name("Accounting").cloned().unwrap();
            let version = resolver.latest(&module)?.unwrap();
            assert_eq!(version.name(), "1.0.1");

            let scripts = catalog.get_scripts(DeltaScriptCategory::Upgrade, &module, &version)?;
            let names: Vec<&str> = scripts.iter().map(|s| s.name()).collect();
            assert_eq!(names, vec!["1-add_column.sql", "2-add_index.sql"]);

            let factory = FileWriterFactory::new(ctx.output(), TemplateLocator::new(BuiltinTemplateLocator))?;
            let mut composer =
                MigrationComposer::create(&factory, "mssql", &module, &version, MigrationDirection::Upgrade)?;
            composer.setup(
                Context::new()
                    .with(RELEASE_LABEL, version.name())
                    .with(SCRIPT_AUTHOR, "int-test")
                    .with(MODULE_NAME, module.name())
                    .with(FILE_TYPE, "upgrade")
                    .with(SCRIPT_COUNT, scripts.len())
                    .with(CHANGE_LOG_TABLE_NAME, "change_log")
                    .with(STATEMENT_SEPARATOR, "")
                    .with(STATEMENT_DELIMITER, "GO")
                    .with(DATABASE_ENGINE, "mssql"),
            )?;
            composer.begin_regular()?;
            for (i, script) in scripts.iter().enumerate() {
                composer.write_regular(&script_context(script, i + 1, scripts.len()))?;
            }
            composer.finish_regular()?;
            composer.begin_bidirectional()?;
            composer.finish_bidirectional()?;

            assert!(ctx.artifact("Accounting/1.0.1/upgrade.sql").is_none());
            let summary = composer.finish()?;
            assert_eq!(summary.regular_scripts, 2);
            assert_eq!(composer.state(), ComposerState::Finished);

            let artifact = ctx.artifact("Accounting/1.0.1/upgrade.sql").unwrap();
            let first = artifact.find("ALTER TABLE ledger ADD amount DECIMAL;").unwrap();
            let second = artifact.find("CREATE INDEX ix_amount ON ledger (amount);").unwrap();
            assert!(first < second);
            assert!(artifact.contains("-- upgrade migration for module 'Accounting', release 1.0.1"));
            assert!(artifact.contains("-- [1/2] 1-add_column.sql"));
            assert!(artifact.contains("-- [2/2] 2-add_index.sql"));
            assert_eq!(artifact.matches("BEGIN TRANSACTION").count(), 2);
            assert!(ctx.artifact("Accounting/1.0.1/rollback.sql").is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_builder_writes_both_directions() {
    run_test(
        create_test_context,
        |ctx| {
            accounting_fixture(ctx);
            ctx.script("Accounting", "1.0.1", DeltaScriptCategory::Rollback, "1-drop_index.sql", "DROP INDEX ix_amount;")
                .script("Accounting", "1.0.1", DeltaScriptCategory::Rollback, "2-drop_column.sql", "ALTER TABLE ledger DROP amount;")
                .script("Accounting", "1.0.1", DeltaScriptCategory::Bidirectional, "1-grants.sql", "GRANT SELECT ON ledger TO reporting;");

            let generator = MigrationEngineBuilder::new()
                .input_directory(ctx.input(), DirectoryLayout::Modular)
                .output_directory(ctx.output())
                .script_author("int-test")
                .build()?;

            let version = generator.compose_latest_in_module("postgres", "Accounting")?;
            assert_eq!(version.map(|v| v.name().to_string()), Some("1.0.1".to_string()));

            let upgrade = ctx.artifact("Accounting/1.0.1/upgrade.sql").unwrap();
            assert!(upgrade.find("ADD amount").unwrap() < upgrade.find("GRANT SELECT").unwrap());
            assert!(upgrade.contains("-- Generated by    : int-test"));

            let rollback = ctx.artifact("Accounting/1.0.1/rollback.sql").unwrap();
            assert!(rollback.find("DROP INDEX").unwrap() < rollback.find("DROP amount").unwrap());
            assert!(rollback.find("DROP amount").unwrap() < rollback.find("GRANT SELECT").unwrap());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_default_module_writes_to_output_root() {
    run_test(
        create_test_context,
        |ctx| {
            accounting_fixture(ctx);
            ctx.script("default", "2.0", DeltaScriptCategory::Upgrade, "1-settings.sql", "CREATE TABLE settings (k INT);");

            let generator = MigrationEngineBuilder::new()
                .input_directory(ctx.input(), DirectoryLayout::Modular)
                .output_directory(ctx.output())
                .build()?;
            let generated = generator.generate(&GenerationRequest::new("mysql").with_version("2.0"))?;

            assert_eq!(generated.len(), 1);
            assert_eq!(generated[0].directions, vec![MigrationDirection::Upgrade]);
            assert!(ctx.artifact("2.0/upgrade.sql").unwrap().contains("CREATE TABLE settings"));
            assert!(ctx.artifact("default/2.0/upgrade.sql").is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_request_writes_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            accounting_fixture(ctx);
            ctx.script("Accounting", "1.0.1", DeltaScriptCategory::Rollback, "1-drop_index.sql", "DROP INDEX ix_amount;");

            let generator = MigrationEngineBuilder::new()
                .input_directory(ctx.input(), DirectoryLayout::Modular)
                .output_directory(ctx.output())
                .build()?;

            let err = generator
                .generate(&GenerationRequest::new("mssql").with_modules(["Accounting"]))
                .unwrap_err();
            assert_eq!(err.code(), 2001);
            assert!(ctx.artifact("Accounting/1.0.1/upgrade.sql").is_none());
            assert!(ctx.artifact("Accounting/1.0.1/rollback.sql").is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_single_module_layout() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.file("1.2/upgrade/1-a.sql", "SELECT 1;").file("notes/readme.txt", "not a version");

            let generator = MigrationEngineBuilder::new()
                .input_directory(ctx.input(), DirectoryLayout::SingleModule)
                .output_directory(ctx.output())
                .build()?;
            let generated = generator.compose_latest("mssql")?;

            assert_eq!(generated.len(), 1);
            assert!(generated[0].module.is_default());
            assert!(ctx.artifact("1.2/upgrade.sql").is_some());
            Ok(())
        },
        cleanup,
    )
}

#[derive(Clone, Copy)]
enum FailAt {
    Finish,
    Commit,
}

/// Writes files, but rollback writers fail at the given step.
struct FlakyRollbackFactory {
    files: FileWriterFactory,
    fail_at: FailAt,
}

struct FlakyWriter {
    inner: Box<dyn MigrationScriptWriter>,
    fail_at: FailAt,
}

fn disk_full() -> MigrationError {
    MigrationError::new(ErrorKind::ResourceError, "disk full")
}

impl MigrationScriptWriter for FlakyWriter {
    fn setup(&mut self, context: &CompositionContext) -> MigrationResult<()> {
        self.inner.setup(context)
    }

    fn write_regular(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        self.inner.write_regular(script)
    }

    fn write_bidirectional(&mut self, script: &ScriptContext) -> MigrationResult<()> {
        self.inner.write_bidirectional(script)
    }

    fn finish(&mut self) -> MigrationResult<()> {
        match self.fail_at {
            FailAt::Finish => Err(disk_full()),
            FailAt::Commit => self.inner.finish(),
        }
    }

    fn commit(&mut self) -> MigrationResult<()> {
        match self.fail_at {
            FailAt::Finish => self.inner.commit(),
            FailAt::Commit => Err(disk_full()),
        }
    }

    fn discard(&mut self) {
        self.inner.discard()
    }
}

impl MigrationWriterFactory for FlakyRollbackFactory {
    fn create_writer(
        &self,
        engine: &str,
        module: &Module,
        version: &Version,
        direction: MigrationDirection,
    ) -> MigrationResult<Box<dyn MigrationScriptWriter>> {
        let inner = self.files.create_writer(engine, module, version, direction)?;
        Ok(match direction {
            MigrationDirection::Upgrade => inner,
            MigrationDirection::Rollback => Box::new(FlakyWriter {
                inner,
                fail_at: self.fail_at,
            }),
        })
    }
}

fn files_under(directory: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(directory) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn test_failing_writer_leaves_no_output() {
    run_test(
        create_test_context,
        |ctx| {
            accounting_fixture(ctx);
            ctx.script("Accounting", "1.0.1", DeltaScriptCategory::Rollback, "1-drop_index.sql", "DROP INDEX ix_amount;")
                .script("Accounting", "1.0.1", DeltaScriptCategory::Rollback, "2-drop_column.sql", "ALTER TABLE ledger DROP amount;");

            for fail_at in [FailAt::Finish, FailAt::Commit] {
                let files = FileWriterFactory::new(ctx.output(), TemplateLocator::new(BuiltinTemplateLocator))?;
                let generator = MigrationEngineBuilder::new()
                    .input_directory(ctx.input(), DirectoryLayout::Modular)
                    .writer_factory(FlakyRollbackFactory { files, fail_at })
                    .build()?;

                let err = generator
                    .generate(&GenerationRequest::new("postgres").with_modules(["Accounting"]))
                    .unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::ResourceError);
                assert!(ctx.artifact("Accounting/1.0.1/upgrade.sql").is_none());
                assert!(ctx.artifact("Accounting/1.0.1/rollback.sql").is_none());
                assert!(files_under(ctx.output()).is_empty());
            }
            Ok(())
        },
        cleanup,
    )
}
