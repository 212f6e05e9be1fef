use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::Module;
use crate::version::{Version, VersionScheme};
use dashmap::DashMap;
use itertools::Itertools;
use std::ops::Deref;
use std::sync::Arc;

/// Lists the raw version identifiers of a module.
///
/// Identifiers are returned as found (directory names, keys of a map) and
/// are interpreted by the active [VersionScheme].
pub trait VersionProvider: Send + Sync {
    fn list_versions(&self, module: &Module) -> MigrationResult<Vec<String>>;
}

/// Shared, type-erased handle to a [VersionProvider].
#[derive(Clone)]
pub struct VersionSource {
    inner: Arc<dyn VersionProvider>,
}

impl VersionSource {
    pub fn new<T: VersionProvider + 'static>(inner: T) -> Self {
        VersionSource { inner: Arc::new(inner) }
    }
}

impl Deref for VersionSource {
    type Target = Arc<dyn VersionProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// When false, a non-conformant identifier in a module's listing makes
    /// [VersionResolver::latest] fail instead of skipping the entry.
    pub ignore_invalid_versions: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            ignore_invalid_versions: true,
        }
    }
}

/// Maps a module's raw version listing onto ordered [Version] values.
///
/// Listings are read once per module and cached for the life of the
/// resolver; clones share the cache.
#[derive(Clone)]
pub struct VersionResolver {
    inner: Arc<VersionResolverInner>,
}

struct VersionResolverInner {
    scheme: VersionScheme,
    source: VersionSource,
    settings: ResolverSettings,
    cache: DashMap<String, Arc<ModuleVersions>>,
}

struct ModuleVersions {
    versions: Vec<Version>,
    rejected: Vec<String>,
}

impl VersionResolver {
    pub fn new(scheme: VersionScheme, source: VersionSource, settings: ResolverSettings) -> Self {
        VersionResolver {
            inner: Arc::new(VersionResolverInner {
                scheme,
                source,
                settings,
                cache: DashMap::new(),
            }),
        }
    }

    pub fn scheme(&self) -> &VersionScheme {
        &self.inner.scheme
    }

    pub fn deserialize(&self, version_string: &str) -> Option<Version> {
        self.inner.scheme.deserialize(version_string)
    }

    pub fn serialize(&self, version: &Version) -> String {
        self.inner.scheme.serialize(version)
    }

    /// The greatest conformant version of `module`, or `None` if it has none.
    ///
    /// Fails with [ErrorKind::VersionDirectoryError] when the listing holds a
    /// non-conformant identifier and invalid versions are not ignored.
    pub fn latest(&self, module: &Module) -> MigrationResult<Option<Version>> {
        log::debug!("Finding the latest version in {} ...", module.name());
        let listing = self.listing(module)?;

        if !listing.rejected.is_empty() && !self.inner.settings.ignore_invalid_versions {
            log::error!(
                "Non-conformant version identifiers in module {}: {:?}",
                module.name(),
                listing.rejected
            );
            return Err(MigrationError::new(
                ErrorKind::VersionDirectoryError,
                &format!(
                    "non-conformant version found in module '{}': {}",
                    module.name(),
                    listing.rejected.join(", ")
                ),
            ));
        }

        let latest = listing.versions.last().cloned();
        if latest.is_none() {
            log::debug!("Module {} has no versions", module.name());
        }
        Ok(latest)
    }

    /// Looks up the listed version named by `version_string`.
    ///
    /// Malformed or unlisted identifiers yield `None`.
    pub fn resolve(&self, module: &Module, version_string: &str) -> MigrationResult<Option<Version>> {
        log::debug!("Finding the '{}' version in {} ...", version_string, module.name());
        let Some(wanted) = self.deserialize(version_string) else {
            log::debug!("'{}' is not a valid version identifier", version_string);
            return Ok(None);
        };
        let listing = self.listing(module)?;
        Ok(listing.versions.iter().find(|v| **v == wanted).cloned())
    }

    /// Every conformant version of `module`, ascending.
    pub fn versions(&self, module: &Module) -> MigrationResult<Vec<Version>> {
        Ok(self.listing(module)?.versions.clone())
    }

    /// Identifiers of `module` that the scheme could not interpret.
    pub fn rejected(&self, module: &Module) -> MigrationResult<Vec<String>> {
        Ok(self.listing(module)?.rejected.clone())
    }

    fn listing(&self, module: &Module) -> MigrationResult<Arc<ModuleVersions>> {
        if let Some(cached) = self.inner.cache.get(module.name()) {
            return Ok(cached.clone());
        }

        let listing = Arc::new(self.load(module)?);
        self.inner
            .cache
            .insert(module.name().to_string(), listing.clone());
        Ok(listing)
    }

    fn load(&self, module: &Module) -> MigrationResult<ModuleVersions> {
        let raw = self.inner.source.list_versions(module)?;

        let duplicates: Vec<&String> = raw.iter().duplicates().collect();
        if !duplicates.is_empty() {
            log::error!("Duplicate version identifiers in module {}: {:?}", module.name(), duplicates);
            return Err(MigrationError::new(
                ErrorKind::VersionDirectoryError,
                &format!("duplicate version identifiers in module '{}'", module.name()),
            ));
        }

        let scheme = &self.inner.scheme;
        let (versions, rejected): (Vec<Version>, Vec<String>) =
            raw.into_iter().partition_map(|identifier| match scheme.deserialize(&identifier) {
                Some(version) => itertools::Either::Left(version),
                None => {
                    log::warn!(
                        "Ignoring non-conformant version '{}' in module {}",
                        identifier,
                        module.name()
                    );
                    itertools::Either::Right(identifier)
                }
            });

        let versions: Vec<Version> = versions
            .into_iter()
            .sorted_by(|a, b| scheme.compare(a, b))
            .collect();

        log::debug!(
            "Module {} has {} version(s), {} rejected",
            module.name(),
            versions.len(),
            rejected.len()
        );
        Ok(ModuleVersions { versions, rejected })
    }
}
