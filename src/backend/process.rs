use crate::options::PowerShellOptions;
use crate::{Error, Result};

use async_process::{Child, ChildStderr, ChildStdin, ChildStdout};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_lite::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use futures_util::FutureExt;
use serde::Deserialize;

use std::process::Stdio;
use std::time::Duration;

const STDERR_MAX_BYTES: usize = 8 * 1024;
const STDOUT_SAMPLE_BYTES: usize = 2 * 1024;

/// Switches the console to UTF-8, then evaluates one base64 frame per stdin line in a single
/// scope until stdin closes. The CIM session opened by the first frame is removed on the way out.
///
/// Frames arrive over stdin so secrets never show up in the process arguments.
pub(crate) const BOOTSTRAP: &str = concat!(
    "[Console]::InputEncoding = [Console]::OutputEncoding = New-Object System.Text.UTF8Encoding $false; ",
    "try { while ($null -ne ($frame = [Console]::In.ReadLine())) { ",
    "Invoke-Expression ([Text.Encoding]::UTF8.GetString([Convert]::FromBase64String($frame))) } } ",
    "finally { if ($session) { Remove-CimSession -CimSession $session -ErrorAction SilentlyContinue } }"
);

/// Status line written by every rendered frame.
#[derive(Debug, Deserialize)]
pub(crate) struct Outcome {
    pub(crate) ok: bool,
    #[serde(default)]
    pub(crate) stage: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) hresult: Option<i32>,
    #[serde(default)]
    pub(crate) native_code: Option<i32>,
    #[serde(default)]
    pub(crate) error_id: Option<String>,
    #[serde(default)]
    pub(crate) category: Option<String>,
}

pub(crate) fn arguments() -> [&'static str; 6] {
    [
        "-NoLogo",
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
    ]
}

/// One PowerShell process serving every frame of a session.
///
/// The child is not killed on drop: closing stdin lets the bootstrap remove its CIM session and
/// exit on its own.
pub(crate) struct PwshProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr: Option<ChildStderr>,
    stderr_buf: Vec<u8>,
    executable: String,
    timeout: Duration,
}

impl PwshProcess {
    pub(crate) fn spawn(opts: &PowerShellOptions) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!(executable = %opts.executable, timeout = ?opts.process_timeout, "powershell spawn");

        let mut child = async_process::Command::new(&opts.executable)
            .args(arguments())
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Error::BackendUnavailable {
                        backend: "powershell",
                        detail: format!("{} not found", opts.executable),
                    };
                }
                Error::IoError {
                    context: format!("spawn powershell failed: {e}"),
                }
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(Error::IoError {
                context: "powershell pipes not captured".to_string(),
            });
        };
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            stderr,
            stderr_buf: Vec::new(),
            executable: opts.executable.clone(),
            timeout: opts.process_timeout,
        })
    }

    /// Send `script` as one frame and wait for its status line.
    ///
    /// The process timeout covers the write and the wait. On timeout the process is killed.
    pub(crate) async fn exchange(&mut self, action: &'static str, script: &str) -> Result<Outcome> {
        let Self {
            child,
            stdin,
            stdout,
            stderr,
            stderr_buf,
            executable,
            timeout,
        } = self;
        let timeout = *timeout;

        #[cfg(feature = "tracing")]
        tracing::debug!(%action, ?timeout, script_bytes = script.len(), "powershell frame");

        let Some(input) = stdin.as_mut() else {
            return Err(Error::IoError {
                context: "powershell stdin already closed".to_string(),
            });
        };
        let mut frame = STANDARD.encode(script);
        frame.push('\n');

        let mut deadline = crate::runtime::sleep(timeout).fuse();

        let written = futures_util::select! {
            _ = deadline => {
                let _ = child.kill();
                let _ = child.status().await;
                return Err(Error::Timeout { action, timeout });
            }
            res = write_frame(input, &frame).fuse() => res,
        };
        if written.is_err() {
            *stdin = None;
            return Err(exited(child, stderr, stderr_buf, executable, "").await);
        }

        stderr_buf.clear();
        let mut sample = String::new();
        let mut line = String::new();
        let mut chunk = [0u8; 1024];

        loop {
            line.clear();

            let n = if let Some(s) = stderr.as_mut() {
                futures_util::select! {
                    _ = deadline => {
                        let _ = child.kill();
                        let _ = child.status().await;
                        return Err(Error::Timeout { action, timeout });
                    }
                    n = s.read(&mut chunk).fuse() => {
                        match n {
                            Ok(n) if n > 0 => push_limited(stderr_buf, &chunk[..n], STDERR_MAX_BYTES),
                            _ => *stderr = None,
                        }
                        continue;
                    }
                    n = stdout.read_line(&mut line).fuse() => {
                        n.map_err(|e| Error::IoError { context: format!("read powershell stdout: {e}") })?
                    }
                }
            } else {
                futures_util::select! {
                    _ = deadline => {
                        let _ = child.kill();
                        let _ = child.status().await;
                        return Err(Error::Timeout { action, timeout });
                    }
                    n = stdout.read_line(&mut line).fuse() => {
                        n.map_err(|e| Error::IoError { context: format!("read powershell stdout: {e}") })?
                    }
                }
            };

            if n == 0 {
                *stdin = None;
                return Err(exited(child, stderr, stderr_buf, executable, &sample).await);
            }

            let trimmed = line.trim();
            if is_status_line(trimmed) {
                #[cfg(feature = "tracing")]
                tracing::debug!(%action, stderr_bytes = stderr_buf.len(), "powershell frame done");

                return serde_json::from_str::<Outcome>(trimmed)
                    .map_err(|e| Error::parse_error(format!("powershell status line: {e}"), trimmed));
            }
            if sample.len() < STDOUT_SAMPLE_BYTES {
                sample.push_str(trimmed);
                sample.push('\n');
            }
        }
    }
}

async fn write_frame(stdin: &mut ChildStdin, frame: &str) -> std::io::Result<()> {
    stdin.write_all(frame.as_bytes()).await?;
    stdin.flush().await
}

/// The process closed stdout before answering: report how it ended.
async fn exited(
    child: &mut Child,
    stderr: &mut Option<ChildStderr>,
    stderr_buf: &mut Vec<u8>,
    executable: &str,
    stdout_sample: &str,
) -> Error {
    if let Some(s) = stderr.as_mut() {
        let mut chunk = [0u8; 1024];
        while let Ok(n) = s.read(&mut chunk).await {
            if n == 0 {
                break;
            }
            push_limited(stderr_buf, &chunk[..n], STDERR_MAX_BYTES);
        }
    }
    *stderr = None;

    match child.status().await {
        Ok(status) if status.success() => {
            Error::parse_error("powershell exited without a status line", stdout_sample)
        }
        Ok(status) => Error::process_error(
            executable,
            status.code(),
            String::from_utf8_lossy(stderr_buf),
        ),
        Err(e) => Error::IoError {
            context: format!("wait powershell: {e}"),
        },
    }
}

fn push_limited(buf: &mut Vec<u8>, data: &[u8], max: usize) {
    let room = max.saturating_sub(buf.len());
    buf.extend_from_slice(&data[..data.len().min(room)]);
}

fn is_status_line(line: &str) -> bool {
    line.starts_with('{') && line.ends_with('}')
}

/// Map a failed outcome to an `Error`.
pub(crate) fn outcome_error(action: &'static str, outcome: Outcome) -> Error {
    let message = outcome
        .message
        .unwrap_or_default()
        .trim()
        .to_string();

    let denied = outcome
        .category
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("PermissionDenied"))
        || outcome
            .error_id
            .as_deref()
            .is_some_and(|id| id.contains("AccessDenied"));
    if denied && outcome.stage.as_deref() == Some("session") {
        return Error::PermissionDenied {
            action,
            detail: message,
        };
    }

    Error::Cim {
        message,
        hresult: outcome.hresult,
        native_code: outcome.native_code,
        error_id: outcome.error_id,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn status_lines_are_single_json_objects() {
        assert!(is_status_line("{\"ok\":true}"));
        assert!(!is_status_line("WARNING: something"));
        assert!(!is_status_line(""));
    }

    #[test]
    fn outcome_parses_cmdlet_failure() {
        let line = r#"{"ok":false,"stage":"invoke","message":"The system cannot find the file specified.","hresult":-2147024894,"native_code":null,"error_id":"HRESULT 0x80070002,Stop-ScheduledTask","category":"ObjectNotFound"}"#;
        let outcome: Outcome = serde_json::from_str(line).expect("parse");
        assert!(!outcome.ok);

        let err = outcome_error("Stop-ScheduledTask", outcome);
        let Error::Cim { hresult, .. } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(*hresult, Some(-2147024894));
        assert_eq!(err.win32_code(), Some(2));
    }

    #[test]
    fn access_denied_during_session_maps_to_permission_denied() {
        let outcome = Outcome {
            ok: false,
            stage: Some("session".to_string()),
            message: Some("Access is denied.".to_string()),
            hresult: Some(-2147024891),
            native_code: None,
            error_id: Some("HRESULT 0x80070005,New-CimSession".to_string()),
            category: Some("PermissionDenied".to_string()),
        };

        let err = outcome_error("New-CimSession", outcome);
        let Error::PermissionDenied { action, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(action, "New-CimSession");
    }

    #[test]
    fn arguments_never_carry_the_script() {
        let args = arguments();
        assert_eq!(args.last(), Some(&"-Command"));
        assert!(!BOOTSTRAP.contains("ConvertTo-SecureString"));
    }

    #[test]
    fn bootstrap_switches_console_to_utf8_before_reading() {
        let utf8 = BOOTSTRAP
            .find("[Console]::InputEncoding = [Console]::OutputEncoding = New-Object System.Text.UTF8Encoding $false")
            .expect("encoding setup");
        let read = BOOTSTRAP.find("[Console]::In.ReadLine()").expect("frame loop");
        assert!(utf8 < read);
        assert!(BOOTSTRAP.contains("[Text.Encoding]::UTF8.GetString"));
    }

    #[test]
    fn push_limited_stops_at_max() {
        let mut buf = b"abc".to_vec();
        push_limited(&mut buf, b"defgh", 5);
        assert_eq!(buf, b"abcde");
        push_limited(&mut buf, b"x", 5);
        assert_eq!(buf, b"abcde");
    }

    #[cfg(all(unix, feature = "rt-async-io"))]
    mod runner {
        #![allow(clippy::expect_used)]
        #![allow(clippy::panic)]
        #![allow(clippy::unwrap_used)]

        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        /// Write an executable `sh` script standing in for PowerShell.
        fn fake_shell(dir: &Path, body: &str) -> PowerShellOptions {
            let path = dir.join("fake-pwsh");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
            PowerShellOptions {
                executable: path.to_string_lossy().into_owned(),
                process_timeout: Duration::from_secs(5),
            }
        }

        #[test]
        fn missing_executable_is_backend_unavailable() {
            let opts = PowerShellOptions {
                executable: "/nonexistent/taskbus-pwsh".to_string(),
                ..PowerShellOptions::default()
            };
            let Err(err) = PwshProcess::spawn(&opts) else {
                panic!("spawn must fail");
            };
            let Error::BackendUnavailable { backend, .. } = err else {
                panic!("unexpected error: {err:?}");
            };
            assert_eq!(backend, "powershell");
        }

        #[test]
        fn slow_process_times_out() {
            let dir = tempfile::tempdir().expect("tempdir");
            let mut opts = fake_shell(dir.path(), "read line\nsleep 5");
            opts.process_timeout = Duration::from_millis(200);

            let mut proc = PwshProcess::spawn(&opts).expect("spawn");
            let err = smol::block_on(proc.exchange("Stop-ScheduledTask", "Stop-ScheduledTask"))
                .expect_err("must time out");
            let Error::Timeout { action, timeout } = err else {
                panic!("unexpected error: {err:?}");
            };
            assert_eq!(action, "Stop-ScheduledTask");
            assert_eq!(timeout, Duration::from_millis(200));
        }

        #[test]
        fn clean_exit_without_status_line_is_a_parse_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            let opts = fake_shell(dir.path(), "read line\necho not-json\nexit 0");

            let mut proc = PwshProcess::spawn(&opts).expect("spawn");
            let err = smol::block_on(proc.exchange("Stop-ScheduledTask", "x")).expect_err("must fail");
            let Error::ParseError { sample, .. } = err else {
                panic!("unexpected error: {err:?}");
            };
            assert!(sample.contains("not-json"));
        }

        #[test]
        fn failed_exit_without_status_line_is_a_process_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            let opts = fake_shell(dir.path(), "read line\necho boom >&2\nexit 3");

            let mut proc = PwshProcess::spawn(&opts).expect("spawn");
            let err = smol::block_on(proc.exchange("Stop-ScheduledTask", "x")).expect_err("must fail");
            let Error::ProcessError {
                exit_code, stderr, ..
            } = err
            else {
                panic!("unexpected error: {err:?}");
            };
            assert_eq!(exit_code, Some(3));
            assert!(stderr.contains("boom"));
        }

        #[test]
        fn frames_arrive_over_stdin_one_per_line() {
            let dir = tempfile::tempdir().expect("tempdir");
            let frames = dir.path().join("frames");
            let opts = fake_shell(
                dir.path(),
                &format!(
                    "while IFS= read -r line; do\n  printf '%s\\n' \"$line\" >> '{}'\n  echo 'WARNING: noise'\n  echo '{{\"ok\":true}}'\ndone",
                    frames.display()
                ),
            );

            let mut proc = PwshProcess::spawn(&opts).expect("spawn");
            let script = "Stop-ScheduledTask -TaskName 'Sauvegarde-été'\n$x = 1";
            smol::block_on(async {
                let first = proc.exchange("Stop-ScheduledTask", script).await.expect("first");
                assert!(first.ok);
                let second = proc.exchange("Start-ScheduledTask", "Start").await.expect("second");
                assert!(second.ok);
            });
            drop(proc);

            let recorded = std::fs::read_to_string(&frames).expect("frames");
            let lines: Vec<&str> = recorded.lines().collect();
            assert_eq!(lines.len(), 2);
            let decoded = STANDARD.decode(lines[0]).expect("base64");
            assert_eq!(String::from_utf8(decoded).expect("utf8"), script);
        }
    }
}
