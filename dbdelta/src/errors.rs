use backtrace::Backtrace;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for migration operations.
///
/// Every kind carries a stable numeric code and a fixed human readable
/// message. Codes are grouped by the thousands digit:
///
/// | group | codes |
/// |-------|-------|
/// | resources | 1000 - 1999 |
/// | versions | 2000 - 2999 |
/// | scripts | 3000 - 3999 |
/// | modules | 4000 - 4999 |
/// | other | 9000 - 9999 |
///
/// # Examples
///
/// ```rust
/// use dbdelta::errors::{ErrorKind, MigrationError, MigrationResult};
///
/// fn example() -> MigrationResult<()> {
///     Err(MigrationError::new(ErrorKind::InvalidModule, "no module named 'Payroll'"))
/// }
///
/// assert_eq!(example().unwrap_err().code(), 4000);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    // Resource errors
    /// A resource could not be read or is malformed
    ResourceError,
    /// A required resource (template, configuration, directory) is absent
    MissingResource,

    // Version errors
    /// A version string does not conform to the active scheme
    InvalidVersion,
    /// The version listing of a module is inconsistent
    VersionDirectoryError,

    // Script errors
    /// A required script category is empty
    NoScriptsFound,
    /// One or more scripts failed structural validation
    InvalidScriptsDetected,
    /// Two or more scripts share a sequence number
    InvalidScriptSequence,

    // Module errors
    /// Unknown or malformed module identifier
    InvalidModule,
    /// The module listing itself is unreadable or inconsistent
    ModuleDirectoryError,

    // Other
    /// A migration writer was driven out of protocol order
    WriterProtocolViolation,
    /// Fallback for failures that fit no other group
    Other,
}

/// Coarse grouping of [ErrorKind] values by code range.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorGroup {
    Resource,
    Version,
    Script,
    Module,
    Other,
}

impl ErrorKind {
    /// All error kinds, in code order.
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::ResourceError,
        ErrorKind::MissingResource,
        ErrorKind::InvalidVersion,
        ErrorKind::VersionDirectoryError,
        ErrorKind::NoScriptsFound,
        ErrorKind::InvalidScriptsDetected,
        ErrorKind::InvalidScriptSequence,
        ErrorKind::InvalidModule,
        ErrorKind::ModuleDirectoryError,
        ErrorKind::WriterProtocolViolation,
        ErrorKind::Other,
    ];

    pub fn code(&self) -> u16 {
        match self {
            ErrorKind::ResourceError => 1000,
            ErrorKind::MissingResource => 1001,
            ErrorKind::InvalidVersion => 2000,
            ErrorKind::VersionDirectoryError => 2001,
            ErrorKind::NoScriptsFound => 3000,
            ErrorKind::InvalidScriptsDetected => 3001,
            ErrorKind::InvalidScriptSequence => 3002,
            ErrorKind::InvalidModule => 4000,
            ErrorKind::ModuleDirectoryError => 4001,
            ErrorKind::WriterProtocolViolation => 9001,
            ErrorKind::Other => 9999,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::ResourceError => "Resource error",
            ErrorKind::MissingResource => "No resource found",
            ErrorKind::InvalidVersion => "Invalid version",
            ErrorKind::VersionDirectoryError => "Invalid version directory",
            ErrorKind::NoScriptsFound => "No scripts available/found",
            ErrorKind::InvalidScriptsDetected => "Unsupported or invalid scripts detected",
            ErrorKind::InvalidScriptSequence => "Invalid script sequence numbers detected",
            ErrorKind::InvalidModule => "Invalid module",
            ErrorKind::ModuleDirectoryError => "Invalid module directory",
            ErrorKind::WriterProtocolViolation => "Migration writer protocol violated",
            ErrorKind::Other => "Other error",
        }
    }

    pub fn group(&self) -> ErrorGroup {
        match self.code() / 1000 {
            1 => ErrorGroup::Resource,
            2 => ErrorGroup::Version,
            3 => ErrorGroup::Script,
            4 => ErrorGroup::Module,
            _ => ErrorGroup::Other,
        }
    }

    /// Looks up the kind registered under `code`.
    pub fn from_code(code: u16) -> Option<ErrorKind> {
        ErrorKind::ALL.iter().copied().find(|kind| kind.code() == code)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Error type for every fallible migration operation.
///
/// A `MigrationError` pairs an [ErrorKind] (code and fixed message) with
/// optional free-form details and an optional cause. The backtrace is
/// captured unresolved and only symbolized when the error is debug printed.
///
/// ```rust
/// use dbdelta::errors::{ErrorKind, MigrationError};
///
/// let err = MigrationError::new(ErrorKind::InvalidScriptSequence, "sequence 2 used by a.sql, b.sql");
/// assert_eq!(err.to_string(), "Invalid script sequence numbers detected: sequence 2 used by a.sql, b.sql");
/// ```
#[derive(Clone)]
pub struct MigrationError {
    error_kind: ErrorKind,
    details: Option<String>,
    cause: Option<Box<MigrationError>>,
    backtrace: Arc<Mutex<Backtrace>>,
}

impl MigrationError {
    /// Creates an error of `error_kind` carrying `details`.
    pub fn new(error_kind: ErrorKind, details: &str) -> Self {
        MigrationError {
            error_kind,
            details: Some(details.to_string()),
            cause: None,
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates an error that carries only the fixed message of its kind.
    pub fn of(error_kind: ErrorKind) -> Self {
        MigrationError {
            error_kind,
            details: None,
            cause: None,
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates an error chained to the `cause` that triggered it.
    pub fn new_with_cause(error_kind: ErrorKind, details: &str, cause: MigrationError) -> Self {
        MigrationError {
            error_kind,
            details: Some(details.to_string()),
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn code(&self) -> u16 {
        self.error_kind.code()
    }

    pub fn message(&self) -> &'static str {
        self.error_kind.message()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn cause(&self) -> Option<&MigrationError> {
        self.cause.as_deref()
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) if !details.is_empty() => {
                write!(f, "{}: {}", self.error_kind.message(), details)
            }
            _ => write!(f, "{}", self.error_kind.message()),
        }
    }
}

impl Debug for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}\nCaused by: {:?}", self.code(), self, cause),
            None => {
                let mut backtrace = self.backtrace.lock();
                backtrace.resolve();
                write!(f, "[{}] {}\n{:?}", self.code(), self, backtrace)
            }
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, MigrationError>`.
pub type MigrationResult<T> = Result<T, MigrationError>;

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::MissingResource,
            _ => ErrorKind::ResourceError,
        };
        MigrationError::new(error_kind, &format!("IO error: {}", err))
    }
}

impl From<serde_yaml::Error> for MigrationError {
    fn from(err: serde_yaml::Error) -> Self {
        MigrationError::new(
            ErrorKind::ResourceError,
            &format!("Malformed configuration: {}", err),
        )
    }
}

impl From<regex::Error> for MigrationError {
    fn from(err: regex::Error) -> Self {
        MigrationError::new(ErrorKind::Other, &format!("Pattern error: {}", err))
    }
}

impl From<std::fmt::Error> for MigrationError {
    fn from(err: std::fmt::Error) -> Self {
        MigrationError::new(ErrorKind::Other, &format!("Formatting error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_error_new_creates_error() {
        let error = MigrationError::new(ErrorKind::InvalidModule, "no such module");
        assert_eq!(error.kind(), &ErrorKind::InvalidModule);
        assert_eq!(error.details(), Some("no such module"));
        assert!(error.cause().is_none());
    }

    #[test]
    fn migration_error_of_has_no_details() {
        let error = MigrationError::of(ErrorKind::NoScriptsFound);
        assert!(error.details().is_none());
        assert_eq!(error.to_string(), "No scripts available/found");
    }

    #[test]
    fn migration_error_display_appends_details() {
        let error = MigrationError::new(ErrorKind::MissingResource, "file_template.txt");
        assert_eq!(error.to_string(), "No resource found: file_template.txt");
    }

    #[test]
    fn migration_error_display_skips_empty_details() {
        let error = MigrationError::new(ErrorKind::Other, "");
        assert_eq!(error.to_string(), "Other error");
    }

    #[test]
    fn migration_error_debug_formats_with_cause() {
        let cause = MigrationError::new(ErrorKind::ResourceError, "disk gone");
        let error = MigrationError::new_with_cause(ErrorKind::VersionDirectoryError, "listing failed", cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("[2001] Invalid version directory: listing failed"));
        assert!(formatted.contains("Caused by:"));
        assert!(formatted.contains("disk gone"));
    }

    #[test]
    fn migration_error_source_returns_cause() {
        let cause = MigrationError::of(ErrorKind::ResourceError);
        let error = MigrationError::new_with_cause(ErrorKind::Other, "wrapped", cause);
        assert!(error.source().is_some());
        assert!(MigrationError::of(ErrorKind::Other).source().is_none());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ErrorKind::ResourceError.code(), 1000);
        assert_eq!(ErrorKind::MissingResource.code(), 1001);
        assert_eq!(ErrorKind::InvalidVersion.code(), 2000);
        assert_eq!(ErrorKind::VersionDirectoryError.code(), 2001);
        assert_eq!(ErrorKind::NoScriptsFound.code(), 3000);
        assert_eq!(ErrorKind::InvalidScriptsDetected.code(), 3001);
        assert_eq!(ErrorKind::InvalidScriptSequence.code(), 3002);
        assert_eq!(ErrorKind::InvalidModule.code(), 4000);
        assert_eq!(ErrorKind::ModuleDirectoryError.code(), 4001);
        assert_eq!(ErrorKind::WriterProtocolViolation.code(), 9001);
        assert_eq!(ErrorKind::Other.code(), 9999);
    }

    #[test]
    fn error_codes_are_unique_and_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(1234), None);
    }

    #[test]
    fn error_groups_follow_code_ranges() {
        assert_eq!(ErrorKind::MissingResource.group(), ErrorGroup::Resource);
        assert_eq!(ErrorKind::InvalidVersion.group(), ErrorGroup::Version);
        assert_eq!(ErrorKind::InvalidScriptSequence.group(), ErrorGroup::Script);
        assert_eq!(ErrorKind::ModuleDirectoryError.group(), ErrorGroup::Module);
        assert_eq!(ErrorKind::WriterProtocolViolation.group(), ErrorGroup::Other);
    }

    #[test]
    fn io_not_found_maps_to_missing_resource() {
        let err: MigrationError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), &ErrorKind::MissingResource);

        let err: MigrationError = std::io::Error::other("broken").into();
        assert_eq!(err.kind(), &ErrorKind::ResourceError);
    }

    #[test]
    fn malformed_yaml_maps_to_resource_error() {
        let result: Result<Vec<String>, serde_yaml::Error> = serde_yaml::from_str("[unterminated");
        let err: MigrationError = result.unwrap_err().into();
        assert_eq!(err.kind(), &ErrorKind::ResourceError);
    }
}
