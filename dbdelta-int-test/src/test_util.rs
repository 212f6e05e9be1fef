use dbdelta::delta::DeltaScriptCategory;
use dbdelta::errors::MigrationResult;
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Runs `test` between `before` and `after`. `after` runs even when the
/// test fails so fixture directories never leak.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(&TestContext) -> MigrationResult<()> + std::panic::RefUnwindSafe,
    B: Fn() -> MigrationResult<TestContext>,
    A: Fn(TestContext) -> MigrationResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = std::panic::catch_unwind(|| test(&ctx));
    let after_result = after(ctx);

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(panic) => std::panic::resume_unwind(panic),
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A script tree and an output directory under a fresh temp directory.
pub struct TestContext {
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl TestContext {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Writes `<input>/<module>/<version>/<category>/<file_name>`.
    pub fn script(
        &self,
        module: &str,
        version: &str,
        category: DeltaScriptCategory,
        file_name: &str,
        contents: &str,
    ) -> &Self {
        let relative = format!("{}/{}/{}/{}", module, version, category.label(), file_name);
        self.file(&relative, contents)
    }

    pub fn file(&self, relative: &str, contents: &str) -> &Self {
        let path = self.input.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }

    pub fn dir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.input.join(relative)).unwrap();
        self
    }

    /// Contents of an artifact under the output directory.
    pub fn artifact(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.output.join(relative)).ok()
    }
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    let temp_dir = env::temp_dir();
    temp_dir.join(format!("dbdelta-{}", id)).to_string_lossy().to_string()
}

pub fn create_test_context() -> MigrationResult<TestContext> {
    let root = PathBuf::from(random_path());
    let input = root.join("scripts");
    let output = root.join("out");
    fs::create_dir_all(&input)?;
    fs::create_dir_all(&output)?;
    Ok(TestContext { root, input, output })
}

pub fn cleanup(ctx: TestContext) -> MigrationResult<()> {
    if ctx.root.exists() {
        fs::remove_dir_all(&ctx.root)?;
    }
    Ok(())
}

/// The two release scenario used across the suite: module `Accounting`
/// with versions 1.0.0 and 1.0.1, plus an empty `default` module.
pub fn accounting_fixture(ctx: &TestContext) {
    ctx.dir("default")
        .script("Accounting", "1.0.0", DeltaScriptCategory::Upgrade, "1-create_ledger.sql", "CREATE TABLE ledger (id INT);")
        .script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, "1-add_column.sql", "ALTER TABLE ledger ADD amount DECIMAL;")
        .script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, "2-add_index.sql", "CREATE INDEX ix_amount ON ledger (amount);");
}
