//! # dbdelta - Database Delta Script Composer
//!
//! dbdelta turns versioned, directional SQL change scripts ("delta scripts"),
//! grouped by logical module, into ready to run upgrade and rollback
//! migration artifacts. It plans and composes scripts; applying them to a
//! live database is left to other tools.
//!
//! ## Key Features
//!
//! - **Modules**: Scripts are grouped by module, one of which is the default
//! - **Pluggable Versioning**: `standard`, `semver1` and `lexical` schemes
//! - **Strict Validation**: Malformed names and repeated sequence numbers are rejected
//! - **Staged Composition**: A writer protocol that never emits partial artifacts
//! - **Templates**: Built-in templates for `mssql`, `mysql` and `postgres`, overridable per directory
//! - **YAML Configuration**: Compatible with the established configuration layout
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dbdelta::builder::MigrationEngineBuilder;
//! use dbdelta::store::DirectoryLayout;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = MigrationEngineBuilder::new()
//!     .config_file("db-migrations.yaml")
//!     .input_directory("scripts", DirectoryLayout::Modular)
//!     .output_directory("out")
//!     .build()?;
//!
//! // Writes out/<module>/<version>/upgrade.sql (and rollback.sql)
//! generator.compose_latest_in_module("mssql", "Accounting")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`builder`] - Assembles a generator from configuration
//! - [`common`] - Constants and composition contexts
//! - [`config`] - YAML configuration model
//! - [`delta`] - Delta scripts, the script catalog and template locators
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Composer state machine, writers, sinks and the generator
//! - [`module`] - Modules and the module registry
//! - [`plan`] - Script ordering and composition plans
//! - [`store`] - In-memory and directory backed script sources
//! - [`version`] - Versions, version schemes and the version resolver

pub mod builder;
pub mod common;
pub mod config;
pub mod delta;
pub mod errors;
pub mod migration;
pub mod module;
pub mod plan;
pub mod store;
pub mod version;

pub use builder::MigrationEngineBuilder;
pub use config::MigrationConfig;
pub use errors::{ErrorKind, MigrationError, MigrationResult};
pub use migration::{GenerationRequest, MigrationGenerator};
