use crate::version::{Version, VersionKey, VersionSchemeProvider};

/// Orders versions by plain byte-wise string comparison.
///
/// Accepts any non-blank identifier without surrounding whitespace or
/// control characters. Useful for date-named release directories such as
/// `2024-01-31`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScheme;

impl VersionSchemeProvider for LexicalScheme {
    fn name(&self) -> &str {
        "lexical"
    }

    fn deserialize(&self, version_string: &str) -> Option<Version> {
        if version_string.trim().is_empty()
            || version_string.trim() != version_string
            || version_string.chars().any(char::is_control)
        {
            return None;
        }
        Some(Version::new(version_string, VersionKey::new()))
    }
}
