//! PowerShell/CIM backend (feature=`backend-powershell`).
//!
//! A session is one PowerShell process. Its first frame opens the CIM session for remote targets;
//! every cmdlet call of the action runs as a later frame in that same process, against that same
//! CIM session. Dropping the handle closes the process's stdin, which removes the CIM session.

use crate::capability::{TaskCall, TaskCapability};
use crate::options::PowerShellOptions;
use crate::session::{SessionFactory, SessionHandle, SessionRequest};
use crate::{Error, Result};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use futures_util::lock::Mutex;

mod process;
mod script;

use process::PwshProcess;

/// Live context a [`PwshSessionFactory`] attaches to its handles.
struct PwshSession {
    process: Mutex<PwshProcess>,
}

/// Session factory backed by `New-CimSession`.
///
/// Remote sessions are opened eagerly, so connectivity and authentication failures surface here
/// and never from the capability.
#[derive(Clone, Debug, Default)]
pub struct PwshSessionFactory {
    opts: PowerShellOptions,
}

impl PwshSessionFactory {
    pub fn new(opts: PowerShellOptions) -> Self {
        Self { opts }
    }

    async fn establish(&self, request: SessionRequest) -> Result<SessionHandle> {
        #[cfg(feature = "tracing")]
        tracing::debug!(host = %request.target, error_policy = ?request.error_policy, "powershell session open");

        let mut process = PwshProcess::spawn(&self.opts)?;
        let frame = script::render_open(&request.target, &request.options);
        let outcome = process.exchange("New-CimSession", &frame).await?;
        if !outcome.ok {
            let err = process::outcome_error("New-CimSession", outcome);
            #[cfg(feature = "tracing")]
            tracing::debug!(host = %request.target, error = %err, "powershell session open failed");
            return Err(err);
        }

        Ok(SessionHandle::open(request).with_context(PwshSession {
            process: Mutex::new(process),
        }))
    }
}

impl SessionFactory for PwshSessionFactory {
    fn new_session(&self, request: SessionRequest) -> BoxFuture<'_, Result<SessionHandle>> {
        self.establish(request).boxed()
    }
}

/// Scheduled-task capability backed by the `ScheduledTasks` PowerShell module.
///
/// Only accepts handles opened by [`PwshSessionFactory`].
#[derive(Clone, Debug, Default)]
pub struct PwshCapability;

impl PwshCapability {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, session: &SessionHandle, call: TaskCall) -> Result<()> {
        let action = call.verb();
        let Some(context) = session.context::<PwshSession>() else {
            return Err(Error::BackendUnavailable {
                backend: "powershell",
                detail: "session was not opened by PwshSessionFactory".to_string(),
            });
        };

        let frame = script::render_call(&call);
        let outcome = context.process.lock().await.exchange(action, &frame).await?;
        if outcome.ok {
            return Ok(());
        }
        Err(process::outcome_error(action, outcome))
    }
}

impl TaskCapability for PwshCapability {
    fn invoke<'a>(
        &'a self,
        session: &'a SessionHandle,
        call: TaskCall,
    ) -> BoxFuture<'a, Result<()>> {
        self.run(session, call).boxed()
    }
}
