//! taskbus is a Rust SDK for Windows Scheduled Tasks: start, stop, enable, disable, register and
//! unregister task definitions on the local machine, on remote hosts, and on failover clusters.
//!
//! Every action goes through the same path: validate the request, ask for confirmation when the
//! action is destructive, open exactly one CIM session, invoke the scheduled-task capability, and
//! turn any failure into an [`ErrorRecord`] with a stable identifier.
//!
//! ## Quick start
//! ```no_run
//! use taskbus::{StopTaskRequest, TaskBus};
//!
//! async fn stop_backup() -> Result<(), taskbus::ErrorRecord> {
//!     let bus = TaskBus::builder().build().map_err(|e| {
//!         taskbus::ErrorRecord::new("TaskBusInitFailed", taskbus::ErrorCategory::SessionEstablishment, "localhost", e)
//!     })?;
//!     bus.tasks()
//!         .stop(StopTaskRequest::new("NightlyBackup").host("srv01"))
//!         .await
//! }
//! ```
//!
//! ## Task name and path rules
//! - Task names must be non-empty and must not contain `\` or control characters.
//! - Task paths default to the root folder `\`. A supplied path is used verbatim and must start
//!   with `\`.
//!
//! ## Collaborators
//! The session factory, the scheduled-task capability, the error normalizer, the confirmation
//! prompt and the trace sink are all traits passed to [`TaskBusBuilder`]. The default
//! implementations (feature=`backend-powershell`) drive the `ScheduledTasks` PowerShell module
//! over CIM.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::dbg_macro)]

#[cfg(all(feature = "rt-async-io", feature = "rt-tokio"))]
compile_error!("features `rt-async-io` and `rt-tokio` are mutually exclusive; enable exactly one.");

#[cfg(not(any(feature = "rt-async-io", feature = "rt-tokio")))]
compile_error!(
    "missing runtime feature: enable one of `rt-async-io` or `rt-tokio` (default enables `rt-async-io`)."
);

mod actions;
#[cfg(feature = "backend-powershell")]
mod backend;
#[cfg(feature = "blocking")]
mod blocking_api;
mod capability;
mod confirm;
mod error;
mod normalize;
mod options;
mod runtime;
mod session;
mod trace;
mod types;
mod util;
mod win32;

pub use crate::actions::{ClusteredTasks, Tasks};
#[cfg(feature = "backend-powershell")]
pub use crate::backend::{PwshCapability, PwshSessionFactory};
pub use crate::capability::{ClusteredTaskType, TaskCall, TaskCapability};
pub use crate::confirm::{ConfirmMode, ConfirmPrompt, Confirmer, Gate, ImpactLevel, NonInteractive};
pub use crate::error::{ActionResult, Error, ErrorCategory, ErrorRecord, Result};
pub use crate::normalize::{ErrorNormalizer, StandardNormalizer};
pub use crate::options::{PowerShellOptions, TaskBusOptions};
pub use crate::session::{
    Authentication, ErrorPolicy, SessionFactory, SessionHandle, SessionOptions, SessionRequest,
};
pub use crate::trace::{TraceSink, TracingSink};
pub use crate::types::request::{
    RegisterClusteredTaskRequest, RegisterTaskRequest, StopTaskRequest, TaskRequest,
    UnregisterClusteredTaskRequest,
};
pub use crate::types::target::{ClusterTarget, Credential, Target};
pub use crate::win32::translate_win32_error;

pub use futures_util::future::BoxFuture;

#[cfg(feature = "blocking")]
pub use crate::blocking_api::{BlockingClusteredTasks, BlockingTaskBus, BlockingTasks};

use std::fmt;
use std::sync::Arc;

/// Primary entrypoint for managing scheduled tasks.
#[derive(Clone, Debug)]
pub struct TaskBus {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    opts: TaskBusOptions,
    sessions: Arc<dyn SessionFactory>,
    capability: Arc<dyn TaskCapability>,
    normalizer: Arc<dyn ErrorNormalizer>,
    confirmer: Arc<dyn Confirmer>,
    trace: Arc<dyn TraceSink>,
}

impl TaskBus {
    /// Start wiring a `TaskBus`.
    pub fn builder() -> TaskBusBuilder {
        TaskBusBuilder::default()
    }

    /// Build a `TaskBus` backed by PowerShell/CIM with custom options
    /// (feature=`backend-powershell`).
    #[cfg(feature = "backend-powershell")]
    pub fn with_options(opts: TaskBusOptions) -> Self {
        let sessions = Arc::new(PwshSessionFactory::new(opts.powershell.clone()));
        let capability = Arc::new(PwshCapability::new());
        Self::from_parts(opts, sessions, capability, None, None, None)
    }

    fn from_parts(
        opts: TaskBusOptions,
        sessions: Arc<dyn SessionFactory>,
        capability: Arc<dyn TaskCapability>,
        normalizer: Option<Arc<dyn ErrorNormalizer>>,
        confirmer: Option<Arc<dyn Confirmer>>,
        trace: Option<Arc<dyn TraceSink>>,
    ) -> Self {
        let trace: Arc<dyn TraceSink> = match trace {
            Some(t) => t,
            None => Arc::new(TracingSink),
        };
        let normalizer: Arc<dyn ErrorNormalizer> = match normalizer {
            Some(n) => n,
            None => Arc::new(StandardNormalizer::new(trace.clone())),
        };
        let confirmer: Arc<dyn Confirmer> = match confirmer {
            Some(c) => c,
            None => Arc::new(NonInteractive),
        };
        Self {
            inner: Arc::new(Inner {
                opts,
                sessions,
                capability,
                normalizer,
                confirmer,
                trace,
            }),
        }
    }

    /// Access task actions on local or remote hosts.
    pub fn tasks(&self) -> Tasks {
        Tasks::new(self.inner.clone())
    }

    /// Access clustered task actions.
    pub fn clustered(&self) -> ClusteredTasks {
        ClusteredTasks::new(self.inner.clone())
    }

    /// Options this bus was built with.
    pub fn options(&self) -> &TaskBusOptions {
        &self.inner.opts
    }
}

/// Builder for [`TaskBus`]; every collaborator is optional.
#[derive(Default)]
pub struct TaskBusBuilder {
    opts: TaskBusOptions,
    sessions: Option<Arc<dyn SessionFactory>>,
    capability: Option<Arc<dyn TaskCapability>>,
    normalizer: Option<Arc<dyn ErrorNormalizer>>,
    confirmer: Option<Arc<dyn Confirmer>>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl fmt::Debug for TaskBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBusBuilder")
            .field("opts", &self.opts)
            .field("has_session_factory", &self.sessions.is_some())
            .field("has_capability", &self.capability.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskBusBuilder {
    pub fn options(mut self, opts: TaskBusOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.sessions = Some(factory);
        self
    }

    pub fn capability(mut self, capability: Arc<dyn TaskCapability>) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn ErrorNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    pub fn trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Finish wiring.
    ///
    /// Without feature `backend-powershell`, a session factory and a capability must be supplied
    /// or this returns `Error::BackendUnavailable`.
    pub fn build(self) -> Result<TaskBus> {
        let Self {
            opts,
            sessions,
            capability,
            normalizer,
            confirmer,
            trace,
        } = self;

        #[cfg(feature = "backend-powershell")]
        let sessions: Arc<dyn SessionFactory> = match sessions {
            Some(s) => s,
            None => Arc::new(PwshSessionFactory::new(opts.powershell.clone())),
        };
        #[cfg(feature = "backend-powershell")]
        let capability: Arc<dyn TaskCapability> = match capability {
            Some(c) => c,
            None => Arc::new(PwshCapability::new()),
        };

        #[cfg(not(feature = "backend-powershell"))]
        let (sessions, capability) = match (sessions, capability) {
            (Some(s), Some(c)) => (s, c),
            _ => {
                return Err(Error::BackendUnavailable {
                    backend: "powershell",
                    detail: "feature backend-powershell is disabled; supply a session factory and a capability".to_string(),
                });
            }
        };

        Ok(TaskBus::from_parts(
            opts, sessions, capability, normalizer, confirmer, trace,
        ))
    }
}
