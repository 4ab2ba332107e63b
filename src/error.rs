use std::fmt;
use std::time::Duration;

/// Result type used by collaborators (session factories, capabilities, confirmers).
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned by task actions.
pub type ActionResult<T> = std::result::Result<T, ErrorRecord>;

/// Underlying failure raised below the action layer.
///
/// Actions never return this directly; it always ends up as the `cause` of an [`ErrorRecord`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input validation failure (e.g. empty task name, control characters in a path).
    #[error("invalid input: {context}")]
    InvalidInput { context: String },

    /// The caller is not allowed to perform an action (WinRM policy, task ACLs, etc).
    #[error("permission denied for {action}: {detail}")]
    PermissionDenied {
        action: &'static str,
        detail: String,
    },

    /// Timed out while performing an external operation.
    #[error("timeout for {action}: {timeout:?}")]
    Timeout {
        action: &'static str,
        timeout: Duration,
    },

    /// A backend is unavailable in the current environment (missing PowerShell, feature
    /// disabled, etc).
    #[error("backend unavailable ({backend}): {detail}")]
    BackendUnavailable {
        backend: &'static str,
        detail: String,
    },

    /// A raw Win32 error code.
    #[error("{context} (win32 error {code})")]
    Win32 { code: i32, context: String },

    /// A CIM/cmdlet failure as reported by the remote provider.
    #[error("{message}")]
    Cim {
        message: String,
        hresult: Option<i32>,
        native_code: Option<i32>,
        error_id: Option<String>,
    },

    /// Confirmation was required but no prompt could be shown.
    #[error("confirmation required for {action} on {target}, but no interactive confirmer is available")]
    ConfirmationUnavailable { action: String, target: String },

    /// Generic I/O or runtime error with context.
    #[error("io error: {context}")]
    IoError { context: String },

    /// Failed to parse an external payload.
    ///
    /// `sample` is truncated to avoid unbounded output.
    #[error("parse error: {context}; sample={sample}")]
    ParseError { context: String, sample: String },

    /// A subprocess failed (non-zero exit or other failure mode).
    ///
    /// `stderr` is truncated to avoid unbounded output.
    #[error("process error: {command} (exit={exit_code:?}): {stderr}")]
    ProcessError {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

const FACILITY_WIN32: u32 = 7;

impl Error {
    pub(crate) fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    #[cfg(feature = "backend-powershell")]
    pub(crate) fn parse_error(context: impl Into<String>, sample: impl AsRef<str>) -> Self {
        Self::ParseError {
            context: context.into(),
            sample: truncate_for_error(sample.as_ref(), 512).into_owned(),
        }
    }

    #[cfg(feature = "backend-powershell")]
    pub(crate) fn process_error(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl AsRef<str>,
    ) -> Self {
        Self::ProcessError {
            command: command.into(),
            exit_code,
            stderr: truncate_for_error(stderr.as_ref(), 8 * 1024).into_owned(),
        }
    }

    /// The Win32 error code carried by this failure, if any.
    ///
    /// CIM failures report either a native Win32 code or an HRESULT; HRESULTs from the Win32
    /// facility (`0x8007xxxx`) are unwrapped to their code.
    pub fn win32_code(&self) -> Option<i32> {
        match self {
            Self::Win32 { code, .. } => Some(*code),
            Self::Cim {
                native_code,
                hresult,
                ..
            } => native_code
                .filter(|c| *c != 0)
                .or_else(|| hresult.and_then(win32_from_hresult)),
            _ => None,
        }
    }
}

/// Unwrap an `HRESULT_FROM_WIN32` value back to its Win32 code.
pub(crate) fn win32_from_hresult(hresult: i32) -> Option<i32> {
    let bits = hresult as u32;
    if bits & 0x8000_0000 == 0 {
        return None;
    }
    if (bits >> 16) & 0x1fff != FACILITY_WIN32 {
        return None;
    }
    Some((bits & 0xffff) as i32)
}

#[cfg(feature = "backend-powershell")]
fn truncate_for_error(input: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if input.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(input);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(input[..end].to_string())
}

/// Classification of an [`ErrorRecord`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Malformed input, rejected before any session is opened.
    ValidationFailure,
    /// The execution context (CIM session) could not be established.
    SessionEstablishment,
    /// A confirmation prompt was required but could not be answered.
    ConfirmationFailure,
    /// The scheduled-task capability rejected the request.
    OperationFailure,
}

impl ErrorCategory {
    /// Stable token for matching in logs and alerts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ValidationFailure => "InvalidArgument",
            ErrorCategory::SessionEstablishment => "ConnectionError",
            ErrorCategory::ConfirmationFailure => "OperationStopped",
            ErrorCategory::OperationFailure => "InvalidOperation",
        }
    }

    fn default_id(&self) -> &'static str {
        match self {
            ErrorCategory::ValidationFailure => "ScheduledTaskInvalidArgument",
            ErrorCategory::SessionEstablishment => "ScheduledTaskSessionFailed",
            ErrorCategory::ConfirmationFailure => "ScheduledTaskConfirmationFailed",
            ErrorCategory::OperationFailure => "ScheduledTaskOperationFailed",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ErrorCategory::ValidationFailure => "the request was rejected as invalid",
            ErrorCategory::SessionEstablishment => "the session could not be established",
            ErrorCategory::ConfirmationFailure => "the action could not be confirmed",
            ErrorCategory::OperationFailure => "the scheduled task operation failed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned by every task action.
///
/// Records are immutable once built: `id` and `message` are never empty, and the original cause
/// stays reachable through [`std::error::Error::source`] and [`ErrorRecord::cause`].
#[derive(Debug)]
pub struct ErrorRecord {
    id: String,
    category: ErrorCategory,
    target: String,
    message: String,
    cause: Error,
}

impl ErrorRecord {
    /// Build a record whose message is the cause's `Display`.
    pub fn new(
        id: impl Into<String>,
        category: ErrorCategory,
        target: impl Into<String>,
        cause: Error,
    ) -> Self {
        let message = cause.to_string();
        Self::with_message(id, category, target, message, cause)
    }

    /// Build a record with an explicit message.
    pub fn with_message(
        id: impl Into<String>,
        category: ErrorCategory,
        target: impl Into<String>,
        message: impl Into<String>,
        cause: Error,
    ) -> Self {
        let mut id = id.into().trim().to_string();
        if id.is_empty() {
            id = category.default_id().to_string();
        }
        let mut message = message.into();
        if message.trim().is_empty() {
            message = category.describe().to_string();
        }
        Self {
            id,
            category,
            target: target.into(),
            message,
            cause,
        }
    }

    /// Stable identifier, e.g. `ScheduledTaskStopFailed`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// The task, host or cluster the failure is about.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &Error {
        &self.cause
    }

    /// Consume the record and return the original cause.
    pub fn into_cause(self) -> Error {
        self.cause
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

impl std::error::Error for ErrorRecord {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::error::Error as _;

    #[test]
    fn record_keeps_cause_inspectable() {
        let rec = ErrorRecord::new(
            "ScheduledTaskStopFailed",
            ErrorCategory::OperationFailure,
            "Backup",
            Error::Win32 {
                code: 5,
                context: "stop".to_string(),
            },
        );

        assert_eq!(rec.id(), "ScheduledTaskStopFailed");
        assert_eq!(rec.target(), "Backup");
        assert_eq!(rec.to_string(), "ScheduledTaskStopFailed: stop (win32 error 5)");

        let Error::Win32 { code, .. } = rec.cause() else {
            panic!("unexpected cause: {:?}", rec.cause());
        };
        assert_eq!(*code, 5);
        assert!(rec.source().is_some());
    }

    #[test]
    fn record_never_has_empty_id_or_message() {
        let rec = ErrorRecord::with_message(
            "  ",
            ErrorCategory::SessionEstablishment,
            "srv01",
            "",
            Error::Cim {
                message: String::new(),
                hresult: None,
                native_code: None,
                error_id: None,
            },
        );

        assert_eq!(rec.id(), "ScheduledTaskSessionFailed");
        assert!(!rec.message().is_empty());
    }

    #[test]
    fn win32_code_unwraps_win32_facility_hresult() {
        let err = Error::Cim {
            message: "Access is denied.".to_string(),
            hresult: Some(0x8007_0005_u32 as i32),
            native_code: None,
            error_id: None,
        };
        assert_eq!(err.win32_code(), Some(5));

        let err = Error::Cim {
            message: "WS-Management".to_string(),
            hresult: Some(0x8033_8012_u32 as i32),
            native_code: None,
            error_id: None,
        };
        assert_eq!(err.win32_code(), None);
    }

    #[test]
    fn win32_code_prefers_native_code() {
        let err = Error::Cim {
            message: "x".to_string(),
            hresult: Some(0x8007_0005_u32 as i32),
            native_code: Some(1326),
            error_id: None,
        };
        assert_eq!(err.win32_code(), Some(1326));
    }
}
