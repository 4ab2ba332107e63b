use crate::capability::TaskCall;
use crate::session::{Authentication, SessionOptions};
use crate::types::target::Target;

use std::fmt::Write as _;

const HEADER: &str = r#"$ErrorActionPreference = 'Stop'
$ProgressPreference = 'SilentlyContinue'
"#;

const REPORT: &str = r#"    [Console]::Out.WriteLine((@{ ok = $true } | ConvertTo-Json -Compress))
} catch {
    $e = $_.Exception
    $r = [ordered]@{
        ok = $false
        stage = $stage
        message = $e.Message
        hresult = $e.HResult
        native_code = $null
        error_id = $_.FullyQualifiedErrorId
        category = "$($_.CategoryInfo.Category)"
    }
    if ($e -is [System.ComponentModel.Win32Exception]) {
        $r.native_code = $e.NativeErrorCode
    } elseif ($e.PSObject.Properties['ErrorData'] -and $e.ErrorData) {
        $code = $e.ErrorData.CimInstanceProperties['error_Code']
        if ($code -and $code.Value) { $r.native_code = [int]$code.Value }
    }
    [Console]::Out.WriteLine(($r | ConvertTo-Json -Compress))
}
"#;

/// First frame of a session: opens the CIM session for remote targets and leaves `$session` and
/// `$cim` defined for every later frame.
pub(crate) fn render_open(target: &Target, opts: &SessionOptions) -> String {
    let mut out = String::from(HEADER);
    out.push_str("$session = $null\n$cim = @{}\n$stage = 'session'\ntry {\n");

    if let Some(host) = target.host() {
        let _ = writeln!(
            out,
            "    $sessionArgs = @{{ ComputerName = {}; OperationTimeoutSec = {}; ErrorAction = 'Stop' }}",
            quote(host),
            opts.operation_timeout.as_secs().max(1)
        );
        if opts.authentication != Authentication::Default {
            let _ = writeln!(
                out,
                "    $sessionArgs.Authentication = '{}'",
                opts.authentication.as_cim_str()
            );
        }
        if let Some(cred) = target.credential() {
            let _ = writeln!(
                out,
                "    $secret = ConvertTo-SecureString -String {} -AsPlainText -Force",
                quote(cred.secret())
            );
            let _ = writeln!(
                out,
                "    $sessionArgs.Credential = New-Object System.Management.Automation.PSCredential({}, $secret)",
                quote(cred.user())
            );
        }
        out.push_str("    $session = New-CimSession @sessionArgs\n");
        out.push_str("    $cim = @{ CimSession = $session }\n");
    }

    out.push_str(REPORT);
    out
}

/// One cmdlet call against the session opened by [`render_open`].
pub(crate) fn render_call(call: &TaskCall) -> String {
    let mut out = String::from(HEADER);
    out.push_str("$stage = 'invoke'\ntry {\n    ");
    out.push_str(&command(call));
    out.push('\n');
    out.push_str(REPORT);
    out
}

fn command(call: &TaskCall) -> String {
    match call {
        TaskCall::Start { name, path } => simple("Start-ScheduledTask", name, path, ""),
        TaskCall::Stop { name, path } => simple("Stop-ScheduledTask", name, path, ""),
        TaskCall::Enable { name, path } => simple("Enable-ScheduledTask", name, path, ""),
        TaskCall::Disable { name, path } => simple("Disable-ScheduledTask", name, path, ""),
        TaskCall::Unregister { name, path } => {
            simple("Unregister-ScheduledTask", name, path, " -Confirm:$false")
        }
        TaskCall::Register {
            name,
            path,
            xml,
            user,
            overwrite,
        } => {
            let mut cmd = format!(
                "Register-ScheduledTask -TaskName {} -TaskPath {} -Xml {}",
                quote(name),
                quote(path),
                quote(xml)
            );
            if let Some(user) = user {
                let _ = write!(cmd, " -User {}", quote(user));
            }
            if *overwrite {
                cmd.push_str(" -Force");
            }
            cmd.push_str(" @cim | Out-Null");
            cmd
        }
        TaskCall::RegisterClustered {
            name,
            cluster,
            xml,
            task_type,
            resource,
        } => {
            let mut cmd = format!(
                "Register-ClusteredScheduledTask -TaskName {} -Cluster {} -TaskType {} -Xml {}",
                quote(name),
                quote(cluster),
                task_type.as_cim_str(),
                quote(xml)
            );
            if let Some(resource) = resource {
                let _ = write!(cmd, " -Resource {}", quote(resource));
            }
            cmd.push_str(" @cim | Out-Null");
            cmd
        }
        TaskCall::UnregisterClustered { name, cluster } => format!(
            "Unregister-ClusteredScheduledTask -TaskName {} -Cluster {} @cim",
            quote(name),
            quote(cluster)
        ),
    }
}

fn simple(cmdlet: &str, name: &str, path: &str, extra: &str) -> String {
    format!(
        "{cmdlet} -TaskName {} -TaskPath {}{extra} @cim | Out-Null",
        quote(name),
        quote(path)
    )
}

/// PowerShell single-quoted literal. Every single-quote variant PowerShell recognizes is doubled.
pub(crate) fn quote(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('\'');
    for c in input.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}
