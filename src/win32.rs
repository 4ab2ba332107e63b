use crate::error::win32_from_hresult;
use crate::trace::TraceSink;

const KNOWN: &[(i32, &str)] = &[
    (0, "The operation completed successfully."),
    (1, "Incorrect function."),
    (2, "The system cannot find the file specified."),
    (3, "The system cannot find the path specified."),
    (4, "The system cannot open the file."),
    (5, "Access is denied."),
    (6, "The handle is invalid."),
    (8, "Not enough memory resources are available to process this command."),
    (13, "The data is invalid."),
    (
        32,
        "The process cannot access the file because it is being used by another process.",
    ),
    (53, "The network path was not found."),
    (87, "The parameter is incorrect."),
    (122, "The data area passed to a system call is too small."),
    (
        1058,
        "The service cannot be started, either because it is disabled or because it has no enabled devices associated with it.",
    ),
    (1060, "The specified service does not exist as an installed service."),
    (1326, "The user name or password is incorrect."),
    (1722, "The RPC server is unavailable."),
    (1723, "The RPC server is too busy to complete this operation."),
    (1907, "The user's password must be changed before signing in."),
    (1909, "The referenced account is currently locked out and may not be logged on to."),
];

/// Translate a Win32 error code into its system message.
///
/// Any `i32` is accepted. Win32-facility HRESULTs (`0x8007xxxx`) are unwrapped first. Codes
/// without a known message fall back to the OS text on Windows, then to
/// `Unknown error (0xXXXXXXXX)`; the result is never empty.
///
/// Two verbose events go to `sink` per call: the code being translated and the resolved text.
pub fn translate_win32_error(code: i32, sink: &dyn TraceSink) -> String {
    sink.verbose(&format!("Translating Win32 error code {code}"));

    let text = lookup(code)
        .or_else(|| win32_from_hresult(code).and_then(lookup))
        .map(str::to_string)
        .or_else(|| os_message(code))
        .unwrap_or_else(|| format!("Unknown error (0x{:08X})", code as u32));

    sink.verbose(&format!("Win32 error code {code} translates to: {text}"));
    text
}

fn lookup(code: i32) -> Option<&'static str> {
    KNOWN
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, text)| *text)
}

#[cfg(windows)]
fn os_message(code: i32) -> Option<String> {
    os_text(code, &std::io::Error::from_raw_os_error(code).to_string())
}

#[cfg(not(windows))]
fn os_message(_code: i32) -> Option<String> {
    None
}

/// Strip the `(os error N)` suffix std appends and reject its placeholders for codes the system
/// has no message for.
#[cfg_attr(not(windows), allow(dead_code))]
fn os_text(code: i32, raw: &str) -> Option<String> {
    let suffix = format!(" (os error {code})");
    let text = raw.strip_suffix(&suffix).unwrap_or(raw).trim();
    if text.is_empty() || text.starts_with("Unknown error") || text.starts_with("OS Error") {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl TraceSink for Recorder {
        fn verbose(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn known_codes_map_to_canonical_text() {
        let sink = Recorder::default();
        assert_eq!(
            translate_win32_error(0, &sink),
            "The operation completed successfully."
        );
        assert_eq!(
            translate_win32_error(2, &sink),
            "The system cannot find the file specified."
        );
        assert_eq!(
            translate_win32_error(3, &sink),
            "The system cannot find the path specified."
        );
        assert_eq!(translate_win32_error(5, &sink), "Access is denied.");
        assert_eq!(translate_win32_error(6, &sink), "The handle is invalid.");
    }

    #[test]
    fn unknown_codes_are_never_empty() {
        let sink = Recorder::default();
        for code in [-1, -42, 10_001, 99_999, i32::MIN, i32::MAX, 0x7fff_0000] {
            let text = translate_win32_error(code, &sink);
            assert!(!text.trim().is_empty(), "empty text for {code}");
        }
    }

    #[test]
    fn win32_facility_hresult_is_unwrapped() {
        let sink = Recorder::default();
        let code = 0x8007_0005_u32 as i32;
        assert_eq!(translate_win32_error(code, &sink), "Access is denied.");
    }

    #[cfg(not(windows))]
    #[test]
    fn unknown_code_falls_back_to_hex() {
        let sink = Recorder::default();
        assert_eq!(
            translate_win32_error(-1, &sink),
            "Unknown error (0xFFFFFFFF)"
        );
    }

    #[test]
    fn os_placeholder_text_is_rejected() {
        assert_eq!(
            os_text(
                99_999,
                "OS Error 99999 (FormatMessageW() returned error 317) (os error 99999)"
            ),
            None
        );
        assert_eq!(os_text(-1, "Unknown error -1 (os error -1)"), None);
        assert_eq!(
            os_text(1460, "This operation returned because the timeout period expired. (os error 1460)"),
            Some("This operation returned because the timeout period expired.".to_string())
        );
    }

    #[test]
    fn emits_two_trace_events_per_call() {
        let sink = Recorder::default();
        translate_win32_error(5, &sink);

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], "Translating Win32 error code 5");
        assert_eq!(events[1], "Win32 error code 5 translates to: Access is denied.");
    }
}
