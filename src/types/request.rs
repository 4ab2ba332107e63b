use crate::capability::ClusteredTaskType;
use crate::confirm::ConfirmMode;
use crate::types::target::{ClusterTarget, Credential, Target};

/// Request for a single-task action (start, stop, enable, disable, unregister).
///
/// `path` stays `None` until the action resolves it to the root folder `\`.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct TaskRequest {
    pub name: String,
    pub path: Option<String>,
    pub target: Target,
    pub confirm: ConfirmMode,
}

/// The canonical destructive request.
pub type StopTaskRequest = TaskRequest;

impl TaskRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Task folder, e.g. `\Microsoft\Windows\Defrag\`. Used verbatim.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.target.set_host(host.into());
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.target.set_credential(credential);
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn confirm(mut self, mode: ConfirmMode) -> Self {
        self.confirm = mode;
        self
    }

    /// Preview only: the action is declined and nothing runs.
    pub fn what_if(self) -> Self {
        self.confirm(ConfirmMode::WhatIf)
    }

    /// Skip the confirmation prompt.
    pub fn force(self) -> Self {
        self.confirm(ConfirmMode::Force)
    }
}

/// Request to register (create or replace) a task from its XML definition.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct RegisterTaskRequest {
    pub task: TaskRequest,
    pub xml: String,
    /// Account the task runs as; `None` keeps the principal from the XML.
    pub user: Option<String>,
    /// Replace an existing definition with the same name.
    pub overwrite: bool,
}

impl RegisterTaskRequest {
    pub fn new(task: TaskRequest, xml: impl Into<String>) -> Self {
        Self {
            task,
            xml: xml.into(),
            ..Default::default()
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Request to register a clustered scheduled task.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RegisterClusteredTaskRequest {
    pub name: String,
    pub cluster: ClusterTarget,
    pub xml: String,
    pub task_type: ClusteredTaskType,
    /// Cluster resource the task follows (`ResourceSpecific` only).
    pub resource: Option<String>,
}

impl RegisterClusteredTaskRequest {
    pub fn new(
        name: impl Into<String>,
        cluster: ClusterTarget,
        xml: impl Into<String>,
        task_type: ClusteredTaskType,
    ) -> Self {
        Self {
            name: name.into(),
            cluster,
            xml: xml.into(),
            task_type,
            resource: None,
        }
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Request to unregister a clustered scheduled task.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct UnregisterClusteredTaskRequest {
    pub name: String,
    pub cluster: ClusterTarget,
}

impl UnregisterClusteredTaskRequest {
    pub fn new(name: impl Into<String>, cluster: ClusterTarget) -> Self {
        Self {
            name: name.into(),
            cluster,
        }
    }
}
