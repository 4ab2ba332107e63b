use crate::confirm::ImpactLevel;
use crate::session::SessionOptions;

use std::time::Duration;

/// Configuration options for `TaskBus`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TaskBusOptions {
    /// Options applied to every CIM session.
    pub session: SessionOptions,

    /// Actions at or above this impact prompt for confirmation under `ConfirmMode::Default`.
    ///
    /// Default: `ImpactLevel::High`.
    pub confirm_threshold: ImpactLevel,

    /// PowerShell process settings (feature=`backend-powershell`).
    pub powershell: PowerShellOptions,
}

impl Default for TaskBusOptions {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            confirm_threshold: ImpactLevel::High,
            powershell: PowerShellOptions::default(),
        }
    }
}

/// How the PowerShell backend launches its process.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct PowerShellOptions {
    /// Executable name or path.
    ///
    /// Default: `powershell.exe` on Windows, `pwsh` elsewhere.
    pub executable: String,

    /// Upper bound for one round trip to the PowerShell process: session setup or one cmdlet call.
    pub process_timeout: Duration,
}

impl Default for PowerShellOptions {
    fn default() -> Self {
        let executable = if cfg!(windows) {
            "powershell.exe"
        } else {
            "pwsh"
        };
        Self {
            executable: executable.to_string(),
            process_timeout: Duration::from_secs(60),
        }
    }
}
