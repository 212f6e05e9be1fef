//! YAML configuration of the migration engine.

use crate::common::DEFAULT_MODULE_NAME;
use crate::delta::CatalogSettings;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::migration::{CompositionSettings, EngineSettings};
use crate::plan::BidirectionalPlacement;
use crate::store::DirectoryLayoutSettings;
use crate::version::{LexicalScheme, ResolverSettings, Semver1Scheme, StandardScheme, VersionScheme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const BUNDLED_CONFIG: &str = include_str!("../conf/default-config.yaml");

/// The configuration file model.
///
/// # Examples
///
/// ```rust,ignore
/// let config = MigrationConfig::from_file("db-migrations.yaml")?;
/// let engine = config.engine("mssql")?;
/// let scheme = config.version_scheme("default-standard")?;
/// ```
///
/// Version schemes are kept as raw YAML and only interpreted when looked
/// up, so an unused malformed scheme does not prevent loading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MigrationConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub version_schemes: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneralConfig {
    pub rollback_scripts_optional: bool,
    pub delta_script_extension: String,
    pub upgrade_directory_name: String,
    pub rollback_directory_name: String,
    pub bidirectional_directory_name: String,
    pub ignore_invalid_versions: bool,
    pub template_override_directory: Option<PathBuf>,
    pub bidirectional_script_to_upgrade_script_order: BidirectionalPlacement,
    pub bidirectional_script_to_rollback_script_order: BidirectionalPlacement,
    pub strict_sequencing: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        let layout = DirectoryLayoutSettings::default();
        GeneralConfig {
            rollback_scripts_optional: true,
            delta_script_extension: layout.script_extension,
            upgrade_directory_name: layout.upgrade_directory_name,
            rollback_directory_name: layout.rollback_directory_name,
            bidirectional_directory_name: layout.bidirectional_directory_name,
            ignore_invalid_versions: true,
            template_override_directory: None,
            bidirectional_script_to_upgrade_script_order: BidirectionalPlacement::Last,
            bidirectional_script_to_rollback_script_order: BidirectionalPlacement::Last,
            strict_sequencing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    pub engine: BTreeMap<String, EngineConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    pub change_log_table_name: String,
    pub db_statement_delimiter: String,
    pub db_statement_separator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        EngineConfig {
            change_log_table_name: settings.change_log_table_name,
            db_statement_delimiter: settings.statement_delimiter,
            db_statement_separator: settings.statement_separator,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        EngineSettings {
            change_log_table_name: config.change_log_table_name.clone(),
            statement_delimiter: config.db_statement_delimiter.clone(),
            statement_separator: config.db_statement_separator.clone(),
        }
    }
}

/// A `version-schemes` entry, selected by its `scheme` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum VersionSchemeConfig {
    Standard(StandardSchemeConfig),
    Semver1(Semver1SchemeConfig),
    Lexical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StandardSchemeConfig {
    pub prefix: String,
    pub prefix_separator: String,
    pub digit_separator: String,
    pub tag_separator: String,
    pub tag_sequence_separator: String,
}

impl Default for StandardSchemeConfig {
    fn default() -> Self {
        StandardSchemeConfig {
            prefix: String::new(),
            prefix_separator: String::new(),
            digit_separator: ".".to_string(),
            tag_separator: "-".to_string(),
            tag_sequence_separator: "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Semver1SchemeConfig {
    pub digit_separator: String,
    pub date_separator: String,
    pub date_format: String,
}

impl Default for Semver1SchemeConfig {
    fn default() -> Self {
        Semver1SchemeConfig {
            digit_separator: ".".to_string(),
            date_separator: "-".to_string(),
            date_format: "%Y%m%d%H%M".to_string(),
        }
    }
}

impl VersionSchemeConfig {
    pub fn build(&self) -> MigrationResult<VersionScheme> {
        match self {
            VersionSchemeConfig::Standard(c) => Ok(VersionScheme::new(StandardScheme::new(
                &c.prefix,
                &c.prefix_separator,
                &c.digit_separator,
                &c.tag_separator,
                &c.tag_sequence_separator,
            )?)),
            VersionSchemeConfig::Semver1(c) => Ok(VersionScheme::new(Semver1Scheme::new(
                &c.digit_separator,
                &c.date_separator,
                &c.date_format,
            )?)),
            VersionSchemeConfig::Lexical => Ok(VersionScheme::new(LexicalScheme)),
        }
    }
}

impl MigrationConfig {
    pub fn from_yaml_str(yaml: &str) -> MigrationResult<Self> {
        serde_yaml::from_str(yaml).map_err(|err| {
            log::error!("Failed to parse migration configuration: {}", err);
            MigrationError::from(err)
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MigrationResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            log::error!("Configuration file does not exist: {}", path.display());
            return Err(MigrationError::new(
                ErrorKind::ResourceError,
                &format!("configuration file does not exist: {}", path.display()),
            ));
        }
        log::debug!("Loading configuration from {}", path.display());
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// The configuration shipped with the crate.
    pub fn bundled() -> MigrationResult<Self> {
        Self::from_yaml_str(BUNDLED_CONFIG)
    }

    pub fn engine(&self, name: &str) -> MigrationResult<EngineSettings> {
        self.database.engine.get(name).map(EngineSettings::from).ok_or_else(|| {
            log::error!("No configuration for database engine '{}'", name);
            MigrationError::new(
                ErrorKind::MissingResource,
                &format!("no configuration for database engine '{}'", name),
            )
        })
    }

    pub fn version_scheme_config(&self, name: &str) -> MigrationResult<VersionSchemeConfig> {
        let value = self.version_schemes.get(name).ok_or_else(|| {
            log::error!("No configuration for version scheme '{}'", name);
            MigrationError::new(
                ErrorKind::MissingResource,
                &format!("no configuration for version scheme '{}'", name),
            )
        })?;
        serde_yaml::from_value(value.clone()).map_err(|err| {
            log::error!("Invalid version scheme '{}': {}", name, err);
            MigrationError::new_with_cause(
                ErrorKind::InvalidVersion,
                &format!("invalid version scheme '{}'", name),
                err.into(),
            )
        })
    }

    pub fn version_scheme(&self, name: &str) -> MigrationResult<VersionScheme> {
        self.version_scheme_config(name)?.build()
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            require_upgrade_scripts: true,
            require_rollback_scripts: !self.general.rollback_scripts_optional,
            strict_sequencing: self.general.strict_sequencing,
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            ignore_invalid_versions: self.general.ignore_invalid_versions,
        }
    }

    pub fn layout_settings(&self) -> DirectoryLayoutSettings {
        DirectoryLayoutSettings {
            script_extension: self.general.delta_script_extension.clone(),
            upgrade_directory_name: self.general.upgrade_directory_name.clone(),
            rollback_directory_name: self.general.rollback_directory_name.clone(),
            bidirectional_directory_name: self.general.bidirectional_directory_name.clone(),
            default_module_name: DEFAULT_MODULE_NAME.to_string(),
        }
    }

    pub fn composition_settings(&self) -> CompositionSettings {
        CompositionSettings {
            upgrade_placement: self.general.bidirectional_script_to_upgrade_script_order,
            rollback_placement: self.general.bidirectional_script_to_rollback_script_order,
            script_author: None,
            engines: self
                .database
                .engine
                .iter()
                .map(|(name, engine)| (name.clone(), EngineSettings::from(engine)))
                .collect(),
        }
    }
}
