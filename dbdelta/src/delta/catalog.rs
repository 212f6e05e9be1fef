use crate::delta::{DeltaScript, DeltaScriptCategory, ScriptCandidate};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::Module;
use crate::version::Version;
use itertools::Itertools;
use std::ops::Deref;
use std::sync::Arc;

/// Supplies the raw scripts of one category of a module version.
///
/// An absent category is not an error: providers return an empty list and
/// leave the emptiness policy to the catalog.
pub trait ScriptProvider: Send + Sync {
    fn fetch_scripts(
        &self,
        category: DeltaScriptCategory,
        module: &Module,
        version: &Version,
    ) -> MigrationResult<Vec<ScriptCandidate>>;
}

/// Shared, type-erased handle to a [ScriptProvider].
#[derive(Clone)]
pub struct ScriptSource {
    inner: Arc<dyn ScriptProvider>,
}

impl ScriptSource {
    pub fn new<T: ScriptProvider + 'static>(inner: T) -> Self {
        ScriptSource { inner: Arc::new(inner) }
    }
}

impl Deref for ScriptSource {
    type Target = Arc<dyn ScriptProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    pub require_upgrade_scripts: bool,
    pub require_rollback_scripts: bool,
    /// Also demand sequence numbers `1..=n` with no gaps.
    pub strict_sequencing: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            require_upgrade_scripts: true,
            require_rollback_scripts: false,
            strict_sequencing: false,
        }
    }
}

impl CatalogSettings {
    /// Whether an empty `category` is an error. Bidirectional scripts are
    /// always optional.
    pub fn is_required(&self, category: DeltaScriptCategory) -> bool {
        match category {
            DeltaScriptCategory::Upgrade => self.require_upgrade_scripts,
            DeltaScriptCategory::Rollback => self.require_rollback_scripts,
            DeltaScriptCategory::Bidirectional => false,
        }
    }
}

/// Validating view over a [ScriptSource].
///
/// Checks run in a fixed order: structure, sequence uniqueness, optional
/// contiguity, then emptiness. The first failing check wins.
#[derive(Clone)]
pub struct DeltaScriptCatalog {
    source: ScriptSource,
    settings: CatalogSettings,
}

impl DeltaScriptCatalog {
    pub fn new(source: ScriptSource, settings: CatalogSettings) -> Self {
        DeltaScriptCatalog { source, settings }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Validated scripts of `category`, ascending by sequence number.
    pub fn get_scripts(
        &self,
        category: DeltaScriptCategory,
        module: &Module,
        version: &Version,
    ) -> MigrationResult<Vec<DeltaScript>> {
        self.get_scripts_with(category, module, version, self.settings.is_required(category))
    }

    /// Like [get_scripts](Self::get_scripts) with an explicit emptiness policy.
    pub fn get_scripts_with(
        &self,
        category: DeltaScriptCategory,
        module: &Module,
        version: &Version,
        required: bool,
    ) -> MigrationResult<Vec<DeltaScript>> {
        log::debug!(
            "Fetching {} scripts for {}/{}",
            category,
            module.name(),
            version.name()
        );
        let candidates = self.source.fetch_scripts(category, module, version)?;
        let location = format!("{}/{}/{}", module.name(), version.name(), category);

        let (scripts, invalid): (Vec<DeltaScript>, Vec<ScriptCandidate>) =
            candidates.into_iter().partition_map(|c| match c.into_script() {
                Ok(script) => itertools::Either::Left(script),
                Err(candidate) => itertools::Either::Right(candidate),
            });

        if !invalid.is_empty() {
            let names = invalid.iter().map(|c| c.name()).join(", ");
            log::error!("Invalid scripts in {}: {}", location, names);
            return Err(MigrationError::new(
                ErrorKind::InvalidScriptsDetected,
                &format!("invalid scripts in {}: {}", location, names),
            ));
        }

        let scripts: Vec<DeltaScript> = scripts.into_iter().sorted().collect();

        let repeated: Vec<u32> = scripts
            .iter()
            .map(|s| s.sequence_number())
            .duplicates()
            .collect();
        if !repeated.is_empty() {
            log::error!("Repeated sequence numbers in {}: {:?}", location, repeated);
            return Err(MigrationError::new(
                ErrorKind::InvalidScriptSequence,
                &format!(
                    "sequence numbers must be unique in {}, repeated: {}",
                    location,
                    repeated.iter().join(", ")
                ),
            ));
        }

        if self.settings.strict_sequencing {
            if let Some((expected, script)) = scripts
                .iter()
                .enumerate()
                .map(|(i, s)| (i as u32 + 1, s))
                .find(|(expected, s)| s.sequence_number() != *expected)
            {
                log::error!(
                    "Gap in sequence numbers of {}: expected {} but found {}",
                    location,
                    expected,
                    script.name()
                );
                return Err(MigrationError::new(
                    ErrorKind::InvalidScriptSequence,
                    &format!(
                        "expected sequence number {} in {} but got {}",
                        expected,
                        location,
                        script.sequence_number()
                    ),
                ));
            }
        }

        if scripts.is_empty() && required {
            log::error!("No {} scripts found in {}", category, location);
            return Err(MigrationError::new(
                ErrorKind::NoScriptsFound,
                &format!("no {} scripts found in {}", category, location),
            ));
        }

        log::debug!("Found {} script(s) in {}", scripts.len(), location);
        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryScriptStore;
    use smallvec::smallvec;

    struct FixedScripts(Vec<ScriptCandidate>);

    impl ScriptProvider for FixedScripts {
        fn fetch_scripts(
            &self,
            category: DeltaScriptCategory,
            _module: &Module,
            _version: &Version,
        ) -> MigrationResult<Vec<ScriptCandidate>> {
            if category == DeltaScriptCategory::Upgrade {
                Ok(self.0.clone())
            } else {
                Ok(vec![])
            }
        }
    }

    fn catalog(candidates: Vec<ScriptCandidate>, settings: CatalogSettings) -> DeltaScriptCatalog {
        DeltaScriptCatalog::new(ScriptSource::new(FixedScripts(candidates)), settings)
    }

    fn fetch(catalog: &DeltaScriptCatalog, category: DeltaScriptCategory) -> MigrationResult<Vec<DeltaScript>> {
        let module = Module::new("Accounting", true);
        let version = Version::new("1.0.1", smallvec![1, 0, 1]);
        catalog.get_scripts(category, &module, &version)
    }

    fn candidate(name: &str) -> ScriptCandidate {
        ScriptCandidate::from_file_name(name, "SELECT 1;")
    }

    #[test]
    fn test_scripts_sorted_by_sequence() {
        let catalog = catalog(
            vec![candidate("10-c.sql"), candidate("2-b.sql"), candidate("1-a.sql")],
            CatalogSettings::default(),
        );
        let scripts = fetch(&catalog, DeltaScriptCategory::Upgrade).unwrap();
        let sequence: Vec<u32> = scripts.iter().map(|s| s.sequence_number()).collect();
        assert_eq!(sequence, vec![1, 2, 10]);
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let names = ["10-j.sql", "2-b.sql", "7-g.sql", "1-a.sql", "3-c.sql"];
        let stored = |order: Vec<&str>| {
            let store = InMemoryScriptStore::new();
            store.add_module("Accounting", true);
            for name in order {
                store.add_script("Accounting", "1.0.1", DeltaScriptCategory::Upgrade, name, name);
            }
            DeltaScriptCatalog::new(ScriptSource::new(store), CatalogSettings::default())
        };
        let forward = stored(names.to_vec());
        let reversed = stored(names.iter().rev().copied().collect());

        let first = fetch(&forward, DeltaScriptCategory::Upgrade).unwrap();
        let second = fetch(&forward, DeltaScriptCategory::Upgrade).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, fetch(&reversed, DeltaScriptCategory::Upgrade).unwrap());
        assert_eq!(first, fetch(&reversed, DeltaScriptCategory::Upgrade).unwrap());

        let sequence: Vec<u32> = first.iter().map(|s| s.sequence_number()).collect();
        assert_eq!(sequence, vec![1, 2, 3, 7, 10]);
        let contents: Vec<&str> = first.iter().map(|s| s.contents()).collect();
        assert_eq!(contents, vec!["1-a.sql", "2-b.sql", "3-c.sql", "7-g.sql", "10-j.sql"]);
    }

    #[test]
    fn test_every_rejected_name_is_reported() {
        let catalog = catalog(
            vec![
                candidate("1-a.sql"),
                candidate("0-zero.sql"),
                candidate("4294967296-overflow.sql"),
                candidate("notes.sql"),
            ],
            CatalogSettings::default(),
        );
        let err = fetch(&catalog, DeltaScriptCategory::Upgrade).unwrap_err();
        assert_eq!(err.code(), 3001);
        let details = err.details().unwrap_or_default();
        assert!(details.contains("0-zero.sql"));
        assert!(details.contains("4294967296-overflow.sql"));
        assert!(details.contains("notes.sql"));
        assert!(!details.contains("1-a.sql"));
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let catalog = catalog(
            vec![candidate("1-a.sql"), candidate("2-b.sql"), candidate("2-c.sql")],
            CatalogSettings::default(),
        );
        let err = fetch(&catalog, DeltaScriptCategory::Upgrade).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidScriptSequence);
        assert_eq!(err.code(), 3002);
    }

    #[test]
    fn test_structural_check_runs_first() {
        let catalog = catalog(
            vec![candidate("notes.sql"), candidate("1-a.sql"), candidate("1-b.sql")],
            CatalogSettings::default(),
        );
        let err = fetch(&catalog, DeltaScriptCategory::Upgrade).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidScriptsDetected);
        assert!(err.to_string().contains("notes.sql"));
    }

    #[test]
    fn test_empty_required_category() {
        let catalog = catalog(vec![], CatalogSettings::default());
        let err = fetch(&catalog, DeltaScriptCategory::Upgrade).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoScriptsFound);
        assert_eq!(err.code(), 3000);
    }

    #[test]
    fn test_empty_optional_category() {
        let catalog = catalog(vec![candidate("1-a.sql")], CatalogSettings::default());
        assert!(fetch(&catalog, DeltaScriptCategory::Rollback).unwrap().is_empty());
        assert!(fetch(&catalog, DeltaScriptCategory::Bidirectional).unwrap().is_empty());

        let strict = catalog_with_required_rollback();
        let err = fetch(&strict, DeltaScriptCategory::Rollback).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoScriptsFound);
    }

    fn catalog_with_required_rollback() -> DeltaScriptCatalog {
        catalog(
            vec![candidate("1-a.sql")],
            CatalogSettings {
                require_rollback_scripts: true,
                ..CatalogSettings::default()
            },
        )
    }

    #[test]
    fn test_gaps_allowed_unless_strict() {
        let scripts = vec![candidate("1-a.sql"), candidate("3-c.sql")];
        let lenient = catalog(scripts.clone(), CatalogSettings::default());
        assert_eq!(fetch(&lenient, DeltaScriptCategory::Upgrade).unwrap().len(), 2);

        let strict = catalog(
            scripts,
            CatalogSettings {
                strict_sequencing: true,
                ..CatalogSettings::default()
            },
        );
        let err = fetch(&strict, DeltaScriptCategory::Upgrade).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidScriptSequence);
    }

    #[test]
    fn test_explicit_policy_overrides_settings() {
        let catalog = catalog(vec![], CatalogSettings::default());
        let module = Module::new("Accounting", true);
        let version = Version::new("1.0.1", smallvec![1, 0, 1]);
        let scripts = catalog
            .get_scripts_with(DeltaScriptCategory::Upgrade, &module, &version, false)
            .unwrap();
        assert!(scripts.is_empty());
    }
}
