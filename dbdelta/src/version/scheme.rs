use crate::version::Version;
use std::cmp::Ordering;
use std::ops::Deref;
use std::sync::Arc;

/// A pluggable versioning strategy.
///
/// A scheme turns raw identifiers (directory names, request arguments) into
/// [Version] values and back. `deserialize` never fails loudly: identifiers
/// that do not conform yield `None` so callers can decide whether a
/// non-conformant entry is fatal.
///
/// Implementations must guarantee that `deserialize(serialize(v)) == Some(v)`
/// and that `compare` is a strict total order over everything they produce.
pub trait VersionSchemeProvider: Send + Sync {
    /// Short identifier of the scheme, used in logs.
    fn name(&self) -> &str;

    fn deserialize(&self, version_string: &str) -> Option<Version>;

    fn serialize(&self, version: &Version) -> String {
        version.name().to_string()
    }

    fn compare(&self, a: &Version, b: &Version) -> Ordering {
        a.cmp(b)
    }
}

/// Shared, type-erased handle to a [VersionSchemeProvider].
#[derive(Clone)]
pub struct VersionScheme {
    inner: Arc<dyn VersionSchemeProvider>,
}

impl VersionScheme {
    pub fn new<T: VersionSchemeProvider + 'static>(inner: T) -> Self {
        VersionScheme { inner: Arc::new(inner) }
    }
}

impl Deref for VersionScheme {
    type Target = Arc<dyn VersionSchemeProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Splits a leading run of ASCII digits off `input`.
///
/// Fails on an empty run, on a leading zero in a multi-digit run and on
/// overflow.
pub(crate) fn take_number(input: &str) -> Option<(u32, &str)> {
    let end = input
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let (digits, rest) = input.split_at(end);
    if digits.len() > 1 && digits.starts_with('0') {
        log::debug!("Rejecting number with leading zero '{}'", digits);
        return None;
    }
    digits.parse::<u32>().ok().map(|n| (n, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_number() {
        assert_eq!(take_number("12.3"), Some((12, ".3")));
        assert_eq!(take_number("0"), Some((0, "")));
        assert_eq!(take_number("07"), None);
        assert_eq!(take_number(".1"), None);
        assert_eq!(take_number(""), None);
        assert_eq!(take_number("99999999999"), None);
    }
}
