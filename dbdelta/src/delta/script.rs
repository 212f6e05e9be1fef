use crate::common::{BIDIRECTIONAL_DIRECTORY_NAME, ROLLBACK_DIRECTORY_NAME, SCRIPT_FILE_NAME_PATTERN, UPGRADE_DIRECTORY_NAME};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

static SCRIPT_FILE_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(SCRIPT_FILE_NAME_PATTERN).ok());

/// The role a delta script plays in a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaScriptCategory {
    /// Applied when moving to the release
    Upgrade,
    /// Applied when moving away from the release
    Rollback,
    /// Applied in both directions
    Bidirectional,
}

impl DeltaScriptCategory {
    pub const ALL: [DeltaScriptCategory; 3] = [
        DeltaScriptCategory::Upgrade,
        DeltaScriptCategory::Rollback,
        DeltaScriptCategory::Bidirectional,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeltaScriptCategory::Upgrade => UPGRADE_DIRECTORY_NAME,
            DeltaScriptCategory::Rollback => ROLLBACK_DIRECTORY_NAME,
            DeltaScriptCategory::Bidirectional => BIDIRECTIONAL_DIRECTORY_NAME,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, DeltaScriptCategory::Bidirectional)
    }
}

impl Display for DeltaScriptCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Extracts the sequence number from a `<seq>-<rest>` script file name.
///
/// Returns `None` when the name does not match, the number is zero or it
/// overflows. Rejected names are reported by the catalog, not here.
pub fn parse_sequence_number(file_name: &str) -> Option<u32> {
    let pattern = SCRIPT_FILE_NAME.as_ref()?;
    let captures = pattern.captures(file_name)?;
    captures
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|sequence| *sequence > 0)
}

/// A script as supplied by a provider, before validation.
///
/// Providers that cannot derive a sequence number leave it unset; the
/// catalog rejects such candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCandidate {
    name: String,
    sequence_number: Option<u32>,
    contents: String,
}

impl ScriptCandidate {
    pub fn new(name: &str, sequence_number: Option<u32>, contents: &str) -> Self {
        ScriptCandidate {
            name: name.to_string(),
            sequence_number,
            contents: contents.to_string(),
        }
    }

    /// Derives the sequence number from `file_name`.
    pub fn from_file_name(file_name: &str, contents: &str) -> Self {
        ScriptCandidate::new(file_name, parse_sequence_number(file_name), contents)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence_number(&self) -> Option<u32> {
        self.sequence_number
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Converts into a [DeltaScript], or hands the candidate back if it
    /// lacks a positive sequence number or a non-blank name.
    pub fn into_script(self) -> Result<DeltaScript, ScriptCandidate> {
        match self.sequence_number {
            Some(sequence) if sequence > 0 && !self.name.trim().is_empty() => Ok(DeltaScript {
                name: self.name,
                sequence_number: sequence,
                contents: self.contents,
            }),
            _ => Err(self),
        }
    }
}

/// A validated delta script. Orders by sequence number, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeltaScript {
    name: String,
    sequence_number: u32,
    contents: String,
}

impl DeltaScript {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}

impl PartialOrd for DeltaScript {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeltaScript {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence_number
            .cmp(&other.sequence_number)
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(parse_sequence_number("1-add_column.sql"), Some(1));
        assert_eq!(parse_sequence_number("012-add_index.sql"), Some(12));
        assert_eq!(parse_sequence_number("0-zero.sql"), None);
        assert_eq!(parse_sequence_number("4294967296-overflow.sql"), None);
        assert_eq!(parse_sequence_number("add_column.sql"), None);
        assert_eq!(parse_sequence_number("1-"), None);
        assert_eq!(parse_sequence_number("a1-x.sql"), None);
    }

    #[test]
    fn test_candidate_into_script() {
        let script = ScriptCandidate::from_file_name("2-add_index.sql", "CREATE INDEX ...")
            .into_script()
            .unwrap();
        assert_eq!(script.sequence_number(), 2);
        assert_eq!(script.name(), "2-add_index.sql");
        assert_eq!(script.contents(), "CREATE INDEX ...");

        let rejected = ScriptCandidate::from_file_name("readme.sql", "").into_script();
        assert_eq!(rejected.unwrap_err().name(), "readme.sql");

        assert!(ScriptCandidate::new(" ", Some(1), "").into_script().is_err());
    }

    #[test]
    fn test_script_ordering() {
        let a = ScriptCandidate::new("b", Some(1), "").into_script().unwrap();
        let b = ScriptCandidate::new("a", Some(2), "").into_script().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(DeltaScriptCategory::Upgrade.to_string(), "upgrade");
        assert!(DeltaScriptCategory::Rollback.is_directional());
        assert!(!DeltaScriptCategory::Bidirectional.is_directional());
    }
}
