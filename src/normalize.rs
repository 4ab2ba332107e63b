use crate::error::{Error, ErrorCategory, ErrorRecord};
use crate::trace::TraceSink;
use crate::win32::translate_win32_error;

use std::fmt::Debug;
use std::sync::Arc;

/// Turns an underlying failure into the [`ErrorRecord`] an action returns.
///
/// Actions return whatever this produces unchanged, so a replacement normalizer fully controls
/// the failure a caller sees.
pub trait ErrorNormalizer: Send + Sync + Debug {
    fn normalize(
        &self,
        cause: Error,
        id: &str,
        category: ErrorCategory,
        target: &str,
    ) -> ErrorRecord;
}

/// Default normalizer.
///
/// When the cause carries a Win32 code, the record message gets the translated system text
/// appended; the cause itself is kept as-is.
#[derive(Clone, Debug)]
pub struct StandardNormalizer {
    trace: Arc<dyn TraceSink>,
}

impl StandardNormalizer {
    pub fn new(trace: Arc<dyn TraceSink>) -> Self {
        Self { trace }
    }
}

impl ErrorNormalizer for StandardNormalizer {
    fn normalize(
        &self,
        cause: Error,
        id: &str,
        category: ErrorCategory,
        target: &str,
    ) -> ErrorRecord {
        let message = match cause.win32_code() {
            Some(code) => {
                let text = translate_win32_error(code, self.trace.as_ref());
                let base = cause.to_string();
                if base.contains(&text) {
                    base
                } else {
                    format!("{base}: {text}")
                }
            }
            None => cause.to_string(),
        };

        #[cfg(feature = "tracing")]
        tracing::warn!(%id, category = %category, failed_on = %target, %message, "scheduled task action failed");

        ErrorRecord::with_message(id, category, target, message, cause)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::trace::TracingSink;

    fn normalizer() -> StandardNormalizer {
        StandardNormalizer::new(Arc::new(TracingSink))
    }

    #[test]
    fn appends_win32_text_when_cause_has_code() {
        let rec = normalizer().normalize(
            Error::Win32 {
                code: 2,
                context: "open task".to_string(),
            },
            "ScheduledTaskStopFailed",
            ErrorCategory::OperationFailure,
            "Backup",
        );

        assert_eq!(rec.id(), "ScheduledTaskStopFailed");
        assert_eq!(rec.category(), ErrorCategory::OperationFailure);
        assert_eq!(rec.target(), "Backup");
        assert_eq!(
            rec.message(),
            "open task (win32 error 2): The system cannot find the file specified."
        );
    }

    #[test]
    fn does_not_repeat_text_already_in_cim_message() {
        let rec = normalizer().normalize(
            Error::Cim {
                message: "Access is denied.".to_string(),
                hresult: Some(0x8007_0005_u32 as i32),
                native_code: None,
                error_id: Some("HRESULT 0x80070005".to_string()),
            },
            "ScheduledTaskStopFailed",
            ErrorCategory::OperationFailure,
            "Backup",
        );

        assert_eq!(rec.message(), "Access is denied.");
        let Error::Cim { hresult, .. } = rec.cause() else {
            panic!("unexpected cause: {:?}", rec.cause());
        };
        assert_eq!(*hresult, Some(0x8007_0005_u32 as i32));
    }

    #[test]
    fn plain_cause_uses_display() {
        let rec = normalizer().normalize(
            Error::invalid_input("task name must not be empty"),
            "ScheduledTaskStopInvalidArgument",
            ErrorCategory::ValidationFailure,
            "",
        );

        assert_eq!(rec.message(), "invalid input: task name must not be empty");
        assert_eq!(rec.category().as_str(), "InvalidArgument");
    }
}
