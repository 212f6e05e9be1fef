use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::version::{take_number, Version, VersionKey, VersionSchemeProvider};
use smallvec::smallvec;

/// Pre-release milestones, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl Milestone {
    pub const ALL: [Milestone; 3] = [Milestone::Alpha, Milestone::Beta, Milestone::ReleaseCandidate];

    pub fn label(&self) -> &'static str {
        match self {
            Milestone::Alpha => "alpha",
            Milestone::Beta => "beta",
            Milestone::ReleaseCandidate => "rc",
        }
    }

    pub fn weight(&self) -> i64 {
        match self {
            Milestone::Alpha => 1,
            Milestone::Beta => 2,
            Milestone::ReleaseCandidate => 3,
        }
    }
}

/// A milestone plus a sequence number of at least one, e.g. `beta-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreReleaseTag {
    milestone: Milestone,
    sequence: u32,
}

impl PreReleaseTag {
    pub fn new(milestone: Milestone, sequence: u32) -> MigrationResult<Self> {
        if sequence == 0 {
            return Err(MigrationError::new(
                ErrorKind::InvalidVersion,
                "pre-release tag sequence must be at least 1",
            ));
        }
        Ok(PreReleaseTag { milestone, sequence })
    }

    pub fn milestone(&self) -> Milestone {
        self.milestone
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

/// The parsed parts of a standard version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardVersionParts {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
    pub tag: Option<PreReleaseTag>,
}

impl StandardVersionParts {
    pub fn new(major: u32, minor: u32) -> Self {
        StandardVersionParts {
            major,
            minor,
            build: None,
            revision: None,
            tag: None,
        }
    }

    pub fn build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn tag(mut self, tag: PreReleaseTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sort key: `[major, minor, has_build, build, has_revision, revision,
    /// untagged, milestone weight, tag sequence]`.
    ///
    /// A missing component sorts below a present one, so `1.0 < 1.0.0`, and
    /// an untagged version sorts above every tagged version of the same
    /// number.
    fn sort_key(&self) -> VersionKey {
        let (untagged, weight, sequence) = match self.tag {
            Some(tag) => (0, tag.milestone.weight(), tag.sequence as i64),
            None => (1, 0, 0),
        };
        smallvec![
            self.major as i64,
            self.minor as i64,
            self.build.is_some() as i64,
            self.build.unwrap_or(0) as i64,
            self.revision.is_some() as i64,
            self.revision.unwrap_or(0) as i64,
            untagged,
            weight,
            sequence,
        ]
    }
}

/// The default versioning scheme.
///
/// Identifiers look like `[prefix prefix_separator] major . minor [. build
/// [. revision]] [- milestone - sequence]`, with every separator
/// configurable. Numbers are unsigned decimals without leading zeros.
///
/// ```rust
/// use dbdelta::version::{StandardScheme, VersionSchemeProvider};
///
/// let scheme = StandardScheme::default();
/// let rc = scheme.deserialize("2.0-rc-1").unwrap();
/// let release = scheme.deserialize("2.0").unwrap();
/// assert!(rc < release);
/// assert!(scheme.deserialize("2.01").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardScheme {
    prefix: String,
    prefix_separator: String,
    digit_separator: String,
    tag_separator: String,
    tag_sequence_separator: String,
}

impl Default for StandardScheme {
    fn default() -> Self {
        StandardScheme {
            prefix: String::new(),
            prefix_separator: String::new(),
            digit_separator: ".".to_string(),
            tag_separator: "-".to_string(),
            tag_sequence_separator: "-".to_string(),
        }
    }
}

impl StandardScheme {
    pub fn new(
        prefix: &str,
        prefix_separator: &str,
        digit_separator: &str,
        tag_separator: &str,
        tag_sequence_separator: &str,
    ) -> MigrationResult<Self> {
        if prefix.is_empty() && !prefix_separator.is_empty() {
            log::error!("Prefix separator '{}' configured without a prefix", prefix_separator);
            return Err(MigrationError::new(
                ErrorKind::InvalidVersion,
                "a prefix separator cannot exist without a prefix",
            ));
        }
        for (name, value) in [
            ("digit separator", digit_separator),
            ("tag separator", tag_separator),
            ("tag sequence separator", tag_sequence_separator),
        ] {
            if value.is_empty() {
                log::error!("Empty {} in standard version scheme", name);
                return Err(MigrationError::new(
                    ErrorKind::InvalidVersion,
                    &format!("the {} must not be empty", name),
                ));
            }
            if value.chars().any(|c| c.is_ascii_digit()) {
                return Err(MigrationError::new(
                    ErrorKind::InvalidVersion,
                    &format!("the {} must not contain digits", name),
                ));
            }
        }

        Ok(StandardScheme {
            prefix: prefix.to_string(),
            prefix_separator: prefix_separator.to_string(),
            digit_separator: digit_separator.to_string(),
            tag_separator: tag_separator.to_string(),
            tag_sequence_separator: tag_sequence_separator.to_string(),
        })
    }

    /// Builds a version directly from its parts.
    ///
    /// A revision requires a build number.
    pub fn version(&self, parts: StandardVersionParts) -> MigrationResult<Version> {
        if parts.revision.is_some() && parts.build.is_none() {
            return Err(MigrationError::new(
                ErrorKind::InvalidVersion,
                "a revision number requires a build number",
            ));
        }
        Ok(Version::new(&self.format(&parts), parts.sort_key()))
    }

    /// Parses `version_string` into its parts, or `None` if it does not
    /// conform to this scheme.
    pub fn parse(&self, version_string: &str) -> Option<StandardVersionParts> {
        if version_string.is_empty() {
            return None;
        }

        let mut rest = version_string;
        if !self.prefix.is_empty() {
            rest = rest
                .strip_prefix(self.prefix.as_str())
                .and_then(|r| r.strip_prefix(self.prefix_separator.as_str()))?;
        }

        let (major, r) = take_number(rest)?;
        let r = r.strip_prefix(self.digit_separator.as_str())?;
        let (minor, mut rest) = take_number(r)?;
        let mut parts = StandardVersionParts::new(major, minor);

        if let Some((build, r)) = self.next_component(rest) {
            parts.build = Some(build);
            rest = r;
            if let Some((revision, r)) = self.next_component(rest) {
                parts.revision = Some(revision);
                rest = r;
            }
        }

        if rest.is_empty() {
            return Some(parts);
        }

        let tag = rest.strip_prefix(self.tag_separator.as_str())?;
        parts.tag = Some(self.parse_tag(tag)?);
        Some(parts)
    }

    fn next_component<'a>(&self, input: &'a str) -> Option<(u32, &'a str)> {
        input
            .strip_prefix(self.digit_separator.as_str())
            .and_then(take_number)
    }

    fn parse_tag(&self, input: &str) -> Option<PreReleaseTag> {
        Milestone::ALL.iter().find_map(|milestone| {
            let digits = input
                .strip_prefix(milestone.label())?
                .strip_prefix(self.tag_sequence_separator.as_str())?;
            match take_number(digits) {
                Some((sequence, "")) if sequence > 0 => Some(PreReleaseTag {
                    milestone: *milestone,
                    sequence,
                }),
                _ => None,
            }
        })
    }

    fn format(&self, parts: &StandardVersionParts) -> String {
        let mut out = String::new();
        if !self.prefix.is_empty() {
            out.push_str(&self.prefix);
            out.push_str(&self.prefix_separator);
        }
        out.push_str(&parts.major.to_string());
        out.push_str(&self.digit_separator);
        out.push_str(&parts.minor.to_string());
        if let Some(build) = parts.build {
            out.push_str(&self.digit_separator);
            out.push_str(&build.to_string());
            if let Some(revision) = parts.revision {
                out.push_str(&self.digit_separator);
                out.push_str(&revision.to_string());
            }
        }
        if let Some(tag) = parts.tag {
            out.push_str(&self.tag_separator);
            out.push_str(tag.milestone.label());
            out.push_str(&self.tag_sequence_separator);
            out.push_str(&tag.sequence.to_string());
        }
        out
    }
}

impl VersionSchemeProvider for StandardScheme {
    fn name(&self) -> &str {
        "standard"
    }

    fn deserialize(&self, version_string: &str) -> Option<Version> {
        let parts = self.parse(version_string);
        if parts.is_none() {
            log::debug!("'{}' is not a standard version", version_string);
        }
        parts.map(|p| Version::new(version_string, p.sort_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        StandardScheme::default().deserialize(s).unwrap()
    }

    #[test]
    fn test_simple_versions() {
        let scheme = StandardScheme::default();
        let parts = scheme.parse("1.2.3.4332").unwrap();
        assert_eq!(parts, StandardVersionParts::new(1, 2).build(3).revision(4332));
        assert_eq!(scheme.parse("1.0").unwrap(), StandardVersionParts::new(1, 0));
    }

    #[test]
    fn test_tagged_version() {
        let parts = StandardScheme::default().parse("2.0-alpha-1").unwrap();
        let tag = parts.tag.unwrap();
        assert_eq!(tag.milestone(), Milestone::Alpha);
        assert_eq!(tag.sequence(), 1);
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.0") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.0.1.1"));
        assert!(v("1.0.9") < v("1.0.10"));
        assert!(v("1.9") < v("2.0"));
    }

    #[test]
    fn test_tag_ordering() {
        assert!(v("2.0-alpha-1") < v("2.0-alpha-2"));
        assert!(v("2.0-alpha-9") < v("2.0-beta-1"));
        assert!(v("2.0-beta-3") < v("2.0-rc-1"));
        assert!(v("2.0-rc-5") < v("2.0"));
        assert!(v("1.9") < v("2.0-alpha-1"));
    }

    #[test]
    fn test_invalid_versions() {
        let scheme = StandardScheme::default();
        for s in [
            "", "not-a-version", "1", "1.", "01.0", "1.01", "1.0.0.0.0", "1.0 ", " 1.0",
            "1.0-alpha", "1.0-alpha-0", "1.0-gamma-1", "1.0-alpha-01", "1.0alpha-1", "1.0-alpha-1x",
        ] {
            assert!(scheme.deserialize(s).is_none(), "expected '{}' to be rejected", s);
        }
    }

    #[test]
    fn test_prefixed_scheme() {
        let scheme = StandardScheme::new("r", ":", ".", "-", "_").unwrap();
        let parts = scheme.parse("r:1.2.3.4332-alpha_1092").unwrap();
        assert_eq!(parts.revision, Some(4332));
        assert_eq!(parts.tag.unwrap().sequence(), 1092);

        assert!(scheme.parse("x:1.2").is_none());
        assert!(scheme.parse("r-1.2").is_none());
        assert!(scheme.parse("r1.2").is_none());
        assert!(scheme.parse("r:1.2.3.4332_alpha_1092").is_none());
    }

    #[test]
    fn test_same_separator_everywhere() {
        let scheme = StandardScheme::new("v", ".", ".", ".", ".").unwrap();
        assert_eq!(scheme.parse("v.1.2").unwrap(), StandardVersionParts::new(1, 2));
        let parts = scheme.parse("v.1.2.alpha.2").unwrap();
        assert_eq!(parts.build, None);
        assert_eq!(parts.tag.unwrap().milestone(), Milestone::Alpha);
        let parts = scheme.parse("v.1.2.2.3.alpha.2").unwrap();
        assert_eq!(parts.revision, Some(3));
    }

    #[test]
    fn test_invalid_scheme_configuration() {
        let err = StandardScheme::new("", ":", ".", "-", "-").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidVersion);
        assert!(StandardScheme::new("", "", "", "-", "-").is_err());
        assert!(StandardScheme::new("", "", "1", "-", "-").is_err());
    }

    #[test]
    fn test_version_from_parts() {
        let scheme = StandardScheme::default();
        let version = scheme
            .version(StandardVersionParts::new(1, 4).build(0).tag(PreReleaseTag::new(Milestone::Beta, 2).unwrap()))
            .unwrap();
        assert_eq!(version.name(), "1.4.0-beta-2");
        assert_eq!(scheme.deserialize(version.name()), Some(version));

        let invalid = StandardVersionParts {
            revision: Some(1),
            ..StandardVersionParts::new(1, 0)
        };
        assert!(scheme.version(invalid).is_err());
        assert!(PreReleaseTag::new(Milestone::Alpha, 0).is_err());
    }

    #[test]
    fn test_round_trip_keeps_identity() {
        let scheme = StandardScheme::default();
        for s in ["1.0", "1.0.0", "3.14.15.92-rc-6"] {
            let version = scheme.deserialize(s).unwrap();
            assert_eq!(scheme.serialize(&version), s);
            assert_eq!(scheme.deserialize(&scheme.serialize(&version)), Some(version));
        }
    }
}
