//! Error model for the rewrite engine.
//!
//! Interior components propagate [`EngineError`] with `?`. The public entry
//! points convert it into an [`AppendOutcome`], which is what callers and the
//! UI see. Nothing below the boundary panics on user data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Windows reports a file opened by another program as a sharing or lock
/// violation rather than `PermissionDenied`.
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workbook {path:?} does not exist or is not a regular file")]
    FileMissing { path: PathBuf },

    #[error("workbook {path:?} is locked by another process")]
    FileLocked {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    #[error("workbook {path:?} could not be parsed: {detail}")]
    Corrupted { path: PathBuf, detail: String },

    #[error("i/o failure on {path:?} during {operation}")]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("rich text must contain at least one non-empty run")]
    EmptyRichText,

    #[error("writer rejected {what}: {detail}")]
    Writer { what: String, detail: String },
}

impl EngineError {
    /// Classifies an `io::Error` raised while touching `path`.
    pub fn from_io(path: &Path, operation: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return EngineError::FileMissing {
                path: path.to_path_buf(),
            };
        }
        if is_lock_error(&source) {
            return EngineError::FileLocked {
                path: path.to_path_buf(),
                source: Some(source),
            };
        }
        EngineError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }

    pub fn writer(what: impl Into<String>, detail: impl fmt::Display) -> Self {
        EngineError::Writer {
            what: what.into(),
            detail: detail.to_string(),
        }
    }
}

pub fn is_lock_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    cfg!(windows)
        && matches!(
            error.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
        )
}

/// The typed result of one append call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AppendOutcome {
    Ok,
    FileLocked,
    FileMissing,
    SchemaMismatch(Vec<String>),
    IoError(String),
    CorruptedInput(String),
}

impl AppendOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, AppendOutcome::Ok)
    }

    /// The UI may prompt the user and call again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AppendOutcome::FileLocked)
    }

    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            AppendOutcome::FileMissing | AppendOutcome::SchemaMismatch(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppendOutcome::Ok => "ok",
            AppendOutcome::FileLocked => "file_locked",
            AppendOutcome::FileMissing => "file_missing",
            AppendOutcome::SchemaMismatch(_) => "schema_mismatch",
            AppendOutcome::IoError(_) => "io_error",
            AppendOutcome::CorruptedInput(_) => "corrupted_input",
        }
    }
}

impl fmt::Display for AppendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppendOutcome::Ok => write!(f, "row appended"),
            AppendOutcome::FileLocked => write!(
                f,
                "the workbook is open in another program; close it and try again"
            ),
            AppendOutcome::FileMissing => write!(f, "the workbook could not be found"),
            AppendOutcome::SchemaMismatch(missing) => {
                write!(f, "the header row is missing columns: {}", missing.join(", "))
            }
            AppendOutcome::IoError(detail) => write!(f, "could not write the workbook: {detail}"),
            AppendOutcome::CorruptedInput(detail) => {
                write!(f, "the workbook could not be read: {detail}")
            }
        }
    }
}

impl From<EngineError> for AppendOutcome {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::FileMissing { .. } => AppendOutcome::FileMissing,
            EngineError::FileLocked { .. } => AppendOutcome::FileLocked,
            EngineError::Corrupted { detail, .. } => AppendOutcome::CorruptedInput(detail),
            other @ EngineError::EmptyRichText => AppendOutcome::CorruptedInput(other.to_string()),
            other @ EngineError::Io { .. } => AppendOutcome::IoError(format_chain(&other)),
            other @ EngineError::Writer { .. } => AppendOutcome::IoError(other.to_string()),
        }
    }
}

fn format_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn permission_denied_is_locked() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let classified = EngineError::from_io(Path::new("a.xlsx"), "open", err);
        assert_matches!(classified, EngineError::FileLocked { .. });
        assert_eq!(AppendOutcome::from(classified), AppendOutcome::FileLocked);
    }

    #[cfg(windows)]
    #[test]
    fn sharing_violation_is_locked() {
        let err = io::Error::from_raw_os_error(ERROR_SHARING_VIOLATION);
        assert!(is_lock_error(&err));
    }

    #[cfg(unix)]
    #[test]
    fn raw_os_codes_are_not_locks_on_unix() {
        let err = io::Error::from_raw_os_error(ERROR_SHARING_VIOLATION);
        assert!(!is_lock_error(&err));
    }

    #[test]
    fn not_found_is_missing() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let outcome: AppendOutcome = EngineError::from_io(Path::new("a.xlsx"), "read", err).into();
        assert_eq!(outcome, AppendOutcome::FileMissing);
        assert!(outcome.is_user_correctable());
        assert!(!outcome.is_retriable());
    }

    #[test]
    fn other_io_keeps_detail() {
        let err = io::Error::other("disk full");
        let outcome: AppendOutcome = EngineError::from_io(Path::new("a.xlsx"), "write", err).into();
        assert_matches!(outcome, AppendOutcome::IoError(detail) if detail.contains("disk full"));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json =
            serde_json::to_string(&AppendOutcome::SchemaMismatch(vec!["Dag".into()])).unwrap();
        assert_eq!(json, r#"{"outcome":"schema_mismatch","detail":["Dag"]}"#);
    }
}
