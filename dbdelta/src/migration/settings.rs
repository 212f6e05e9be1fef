use crate::common::UNKNOWN_AUTHOR;
use crate::plan::{BidirectionalPlacement, MigrationDirection};
use std::collections::BTreeMap;
use std::env;

/// Engine specific values exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub change_log_table_name: String,
    pub statement_delimiter: String,
    pub statement_separator: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            change_log_table_name: "change_log".to_string(),
            statement_delimiter: String::new(),
            statement_separator: String::new(),
        }
    }
}

/// Settings that shape composed artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositionSettings {
    pub upgrade_placement: BidirectionalPlacement,
    pub rollback_placement: BidirectionalPlacement,
    /// Author recorded in artifacts. Falls back to the invoking user.
    pub script_author: Option<String>,
    pub engines: BTreeMap<String, EngineSettings>,
}

impl CompositionSettings {
    pub fn with_engine(mut self, name: &str, engine: EngineSettings) -> Self {
        self.engines.insert(name.to_string(), engine);
        self
    }

    pub fn placement_for(&self, direction: MigrationDirection) -> BidirectionalPlacement {
        match direction {
            MigrationDirection::Upgrade => self.upgrade_placement,
            MigrationDirection::Rollback => self.rollback_placement,
        }
    }

    /// Settings of the named engine, or the defaults when none are
    /// configured.
    pub fn engine(&self, name: &str) -> EngineSettings {
        match self.engines.get(name) {
            Some(engine) => engine.clone(),
            None => {
                log::warn!("No settings configured for database engine '{}', using defaults", name);
                EngineSettings::default()
            }
        }
    }

    pub fn author(&self) -> String {
        self.script_author
            .clone()
            .or_else(|| env::var("USER").ok())
            .or_else(|| env::var("USERNAME").ok())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}
