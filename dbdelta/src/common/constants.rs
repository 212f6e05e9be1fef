// module constants
pub const DEFAULT_MODULE_NAME: &str = "default";

// catalog constants
pub const UPGRADE_DIRECTORY_NAME: &str = "upgrade";
pub const ROLLBACK_DIRECTORY_NAME: &str = "rollback";
pub const BIDIRECTIONAL_DIRECTORY_NAME: &str = "bidirectional";
pub const DELTA_SCRIPT_EXTENSION: &str = ".sql";
pub const SCRIPT_FILE_NAME_PATTERN: &str = r"^(\d+)-(.+)$";

// template constants
pub const UPGRADE_TEMPLATE_FILE: &str = "upgrade_template.txt";
pub const ROLLBACK_TEMPLATE_FILE: &str = "rollback_template.txt";
pub const BIDIRECTIONAL_TEMPLATE_FILE: &str = "bidirectional_template.txt";
pub const FILE_TEMPLATE_FILE: &str = "file_template.txt";
pub const ARTIFACT_EXTENSION: &str = ".sql";

// composition context keys
pub const RELEASE_LABEL: &str = "releaseLabel";
pub const CREATION_TIMESTAMP: &str = "creationTimestamp";
pub const SCRIPT_AUTHOR: &str = "scriptAuthor";
pub const MODULE_NAME: &str = "moduleName";
pub const FILE_TYPE: &str = "fileType";
pub const SCRIPT_COUNT: &str = "scriptCount";
pub const CHANGE_LOG_TABLE_NAME: &str = "changeLogTableName";
pub const STATEMENT_SEPARATOR: &str = "statementSeparator";
pub const STATEMENT_DELIMITER: &str = "statementDelimiter";
pub const DATABASE_ENGINE: &str = "databaseEngine";

// script context keys
pub const SCRIPT_NAME: &str = "scriptName";
pub const SCRIPT_CONTENTS: &str = "scriptContents";
pub const SCRIPT_INDEX: &str = "index";
pub const SCRIPT_SEQUENCE_NUMBER: &str = "scriptSequenceNumber";

pub const CREATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const UNKNOWN_AUTHOR: &str = "unknown";

pub const DBDELTA_VERSION: &str = env!("CARGO_PKG_VERSION");
