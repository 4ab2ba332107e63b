use crate::Result;
use crate::session::SessionHandle;

use futures_util::future::BoxFuture;
use std::fmt::Debug;

/// How a clustered task is placed on cluster nodes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClusteredTaskType {
    /// Runs on the node that owns the given cluster resource.
    ResourceSpecific,
    /// Runs on one arbitrary node.
    #[default]
    AnyNode,
    /// Runs on every node.
    ClusterWide,
}

impl ClusteredTaskType {
    pub fn as_cim_str(&self) -> &'static str {
        match self {
            ClusteredTaskType::ResourceSpecific => "ResourceSpecific",
            ClusteredTaskType::AnyNode => "AnyNode",
            ClusteredTaskType::ClusterWide => "ClusterWide",
        }
    }
}

/// One call into the scheduled-task capability.
///
/// Paths are already resolved (the root folder is `\`).
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TaskCall {
    Start {
        name: String,
        path: String,
    },
    Stop {
        name: String,
        path: String,
    },
    Enable {
        name: String,
        path: String,
    },
    Disable {
        name: String,
        path: String,
    },
    Unregister {
        name: String,
        path: String,
    },
    Register {
        name: String,
        path: String,
        xml: String,
        user: Option<String>,
        overwrite: bool,
    },
    RegisterClustered {
        name: String,
        cluster: String,
        xml: String,
        task_type: ClusteredTaskType,
        resource: Option<String>,
    },
    UnregisterClustered {
        name: String,
        cluster: String,
    },
}

impl TaskCall {
    /// Cmdlet that performs this call.
    pub fn verb(&self) -> &'static str {
        match self {
            TaskCall::Start { .. } => "Start-ScheduledTask",
            TaskCall::Stop { .. } => "Stop-ScheduledTask",
            TaskCall::Enable { .. } => "Enable-ScheduledTask",
            TaskCall::Disable { .. } => "Disable-ScheduledTask",
            TaskCall::Unregister { .. } => "Unregister-ScheduledTask",
            TaskCall::Register { .. } => "Register-ScheduledTask",
            TaskCall::RegisterClustered { .. } => "Register-ClusteredScheduledTask",
            TaskCall::UnregisterClustered { .. } => "Unregister-ClusteredScheduledTask",
        }
    }

    pub fn task_name(&self) -> &str {
        match self {
            TaskCall::Start { name, .. }
            | TaskCall::Stop { name, .. }
            | TaskCall::Enable { name, .. }
            | TaskCall::Disable { name, .. }
            | TaskCall::Unregister { name, .. }
            | TaskCall::Register { name, .. }
            | TaskCall::RegisterClustered { name, .. }
            | TaskCall::UnregisterClustered { name, .. } => name,
        }
    }

    /// Task folder; `None` for clustered calls.
    pub fn task_path(&self) -> Option<&str> {
        match self {
            TaskCall::Start { path, .. }
            | TaskCall::Stop { path, .. }
            | TaskCall::Enable { path, .. }
            | TaskCall::Disable { path, .. }
            | TaskCall::Unregister { path, .. }
            | TaskCall::Register { path, .. } => Some(path),
            TaskCall::RegisterClustered { .. } | TaskCall::UnregisterClustered { .. } => None,
        }
    }
}

/// The scheduled-task operations themselves.
///
/// Implementations return `Ok(())` on success and any [`crate::Error`] on failure; the action
/// layer normalizes it.
pub trait TaskCapability: Send + Sync + Debug {
    fn invoke<'a>(&'a self, session: &'a SessionHandle, call: TaskCall)
    -> BoxFuture<'a, Result<()>>;
}
