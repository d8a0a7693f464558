// Error types for speech-data
// Store failures, the entity error taxonomy, and its transport-neutral classification

use thiserror::Error;

use crate::training::SubmitError;

/// Vendor code raised when a unique key (an active name) already exists
pub const DUPLICATE_KEY: &str = "52000";

/// Vendor code raised when a referenced label is missing or inactive
pub const INACTIVE_LABEL: &str = "53000";

/// Vendor code for any other integrity violation (foreign keys, checks)
pub const INTEGRITY_VIOLATION: &str = "23000";

/// Failure reported by the data store gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    /// Vendor diagnostic code, when the store classified the failure
    pub code: Option<String>,
    pub message: String,
    /// Ids the store singled out as the cause, such as the inactive labels of a 53000
    pub ids: Vec<i64>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            ids: Vec::new(),
        }
    }

    pub fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: message.into(),
            ids: Vec::new(),
        }
    }

    pub fn with_ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = ids;
        self
    }

    /// Whether the store tagged this failure with the given vendor code
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(DUPLICATE_KEY),
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                | rusqlite::ffi::SQLITE_CONSTRAINT_CHECK
                | rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => Some(INTEGRITY_VIOLATION),
                _ => None,
            },
            _ => None,
        };

        Self {
            code: code.map(str::to_string),
            message: err.to_string(),
            ids: Vec::new(),
        }
    }
}

/// How the routing layer should classify a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    ServerFault,
}

/// Every entity operation fails with exactly one of these
#[derive(Debug, Error)]
pub enum SpeechDataError {
    #[error("{0}")]
    Validation(String),

    #[error("a {entity} with given name - '{name}', already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("labels {} are not active", join_ids(.labels))]
    InactiveLabels {
        labels: Vec<i64>,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Fetch {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("{message}")]
    Creation {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("{message}")]
    Mapping {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Cannot trigger training pipeline")]
    TrainingTrigger {
        #[source]
        source: SubmitError,
    },
}

impl SpeechDataError {
    pub fn fetch(message: impl Into<String>, source: StoreError) -> Self {
        Self::Fetch {
            message: message.into(),
            source,
        }
    }

    pub fn creation(message: impl Into<String>, source: StoreError) -> Self {
        Self::Creation {
            message: message.into(),
            source,
        }
    }

    pub fn mapping(message: impl Into<String>, source: StoreError) -> Self {
        Self::Mapping {
            message: message.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::TrainingTrigger { .. } => ErrorKind::ServerFault,
            Self::DuplicateName { .. }
            | Self::InactiveLabels { .. }
            | Self::Fetch { .. }
            | Self::Creation { .. }
            | Self::Mapping { .. } => ErrorKind::Conflict,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpeechDataError>;

/// Comma-join a list of ids the way the store procedures expect them
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_maps_to_duplicate_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: StoreError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();

        assert!(err.has_code(DUPLICATE_KEY));
        assert!(!err.has_code(INACTIVE_LABEL));
    }

    #[test]
    fn test_syntax_error_has_no_code() {
        let conn = Connection::open_in_memory().unwrap();
        let err: StoreError = conn.execute("NOT SQL", []).unwrap_err().into();
        assert_eq!(err.code, None);
    }

    #[test]
    fn test_error_kinds() {
        let store = StoreError::new("boom");

        assert_eq!(SpeechDataError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(SpeechDataError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            SpeechDataError::fetch("x", store).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            SpeechDataError::TrainingTrigger {
                source: SubmitError::Connect("refused".into())
            }
            .kind(),
            ErrorKind::ServerFault
        );
    }

    #[test]
    fn test_messages_name_operands() {
        let dup = SpeechDataError::DuplicateName {
            entity: "label",
            name: "Yes".into(),
        };
        assert_eq!(dup.to_string(), "a label with given name - 'Yes', already exists");

        let inactive = SpeechDataError::InactiveLabels {
            labels: vec![3, 7],
            source: StoreError::with_code(INACTIVE_LABEL, "Labels 7 are not active"),
        };
        assert_eq!(inactive.to_string(), "labels 3,7 are not active");
    }
}
