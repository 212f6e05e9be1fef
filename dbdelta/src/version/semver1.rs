use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::version::{Version, VersionSchemeProvider};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use smallvec::smallvec;

/// Date-stamped three part versions, e.g. `1.22.890-201303131447`.
///
/// The date is parsed with a chrono `strftime` pattern. Versions order by
/// major, minor and patch, then by date. Identifiers whose date does not
/// format back to the exact input are rejected so a version's name always
/// matches the directory it came from.
#[derive(Debug, Clone)]
pub struct Semver1Scheme {
    digit_separator: String,
    date_separator: String,
    date_format: String,
    pattern: Regex,
}

impl Semver1Scheme {
    pub fn new(digit_separator: &str, date_separator: &str, date_format: &str) -> MigrationResult<Self> {
        if digit_separator.is_empty() {
            log::error!("Semver1 scheme configured without a digit separator");
            return Err(MigrationError::new(ErrorKind::InvalidVersion, "no digit separator provided"));
        }
        if date_separator.is_empty() {
            log::error!("Semver1 scheme configured without a date separator");
            return Err(MigrationError::new(ErrorKind::InvalidVersion, "no date separator provided"));
        }
        if date_format.is_empty() {
            return Err(MigrationError::new(ErrorKind::InvalidVersion, "no date format provided"));
        }

        let sep = regex::escape(digit_separator);
        let pattern = Regex::new(&format!(
            r"^(\d+){sep}(\d+){sep}(\d+){}(.+)$",
            regex::escape(date_separator)
        ))?;

        Ok(Semver1Scheme {
            digit_separator: digit_separator.to_string(),
            date_separator: date_separator.to_string(),
            date_format: date_format.to_string(),
            pattern,
        })
    }

    fn parse_date(&self, input: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(input, &self.date_format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(input, &self.date_format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn format(&self, major: u32, minor: u32, patch: u32, date: &NaiveDateTime) -> String {
        format!(
            "{major}{sep}{minor}{sep}{patch}{}{}",
            self.date_separator,
            date.format(&self.date_format),
            sep = self.digit_separator
        )
    }
}

impl VersionSchemeProvider for Semver1Scheme {
    fn name(&self) -> &str {
        "semver1"
    }

    fn deserialize(&self, version_string: &str) -> Option<Version> {
        let captures = self.pattern.captures(version_string)?;
        let major: u32 = captures.get(1)?.as_str().parse().ok()?;
        let minor: u32 = captures.get(2)?.as_str().parse().ok()?;
        let patch: u32 = captures.get(3)?.as_str().parse().ok()?;
        let date_string = captures.get(4)?.as_str();

        let Some(date) = self.parse_date(date_string) else {
            log::warn!("Invalid date string in version: {}", version_string);
            return None;
        };

        if self.format(major, minor, patch, &date) != version_string {
            log::debug!("'{}' is not in canonical semver1 form", version_string);
            return None;
        }

        let timestamp = date.and_utc();
        Some(Version::new(
            version_string,
            smallvec![
                major as i64,
                minor as i64,
                patch as i64,
                timestamp.timestamp(),
                timestamp.timestamp_subsec_nanos() as i64,
            ],
        ))
    }
}
