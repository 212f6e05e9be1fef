use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Numeric sort key computed by a version scheme.
pub type VersionKey = SmallVec<[i64; 9]>;

/// An opaque, totally ordered release identifier.
///
/// A version is produced by a [VersionScheme](crate::version::VersionScheme)
/// and keeps the exact identifier it was parsed from, so
/// `scheme.deserialize(v.name()) == Some(v)` always holds. Ordering compares
/// the scheme's sort key first and falls back to the identifier, so two
/// distinct identifiers never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    name: String,
    key: VersionKey,
}

impl Version {
    pub fn new(name: &str, key: VersionKey) -> Self {
        Version {
            name: name.to_string(),
            key,
        }
    }

    /// The canonical identifier of this version.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &[i64] {
        &self.key
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
