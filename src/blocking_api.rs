use crate::runtime::block_on_action;
use crate::{
    ActionResult, ClusteredTasks, RegisterClusteredTaskRequest, RegisterTaskRequest, TaskBus,
    TaskRequest, Tasks, UnregisterClusteredTaskRequest,
};

/// Blocking wrapper for `TaskBus` (feature=`blocking`).
///
/// Each call drives the async action to completion on the selected runtime (`rt-async-io` or
/// `rt-tokio`).
#[derive(Clone, Debug)]
pub struct BlockingTaskBus {
    inner: TaskBus,
}

impl BlockingTaskBus {
    pub fn new(inner: TaskBus) -> Self {
        Self { inner }
    }

    /// Access task actions (blocking wrappers).
    pub fn tasks(&self) -> BlockingTasks {
        BlockingTasks {
            inner: self.inner.tasks(),
        }
    }

    /// Access clustered task actions (blocking wrappers).
    pub fn clustered(&self) -> BlockingClusteredTasks {
        BlockingClusteredTasks {
            inner: self.inner.clustered(),
        }
    }
}

impl From<TaskBus> for BlockingTaskBus {
    fn from(inner: TaskBus) -> Self {
        Self::new(inner)
    }
}

/// Blocking wrapper for `Tasks`.
#[derive(Clone, Debug)]
pub struct BlockingTasks {
    inner: Tasks,
}

impl BlockingTasks {
    pub fn start(&self, req: TaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.start(req))
    }

    pub fn stop(&self, req: TaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.stop(req))
    }

    pub fn enable(&self, req: TaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.enable(req))
    }

    pub fn disable(&self, req: TaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.disable(req))
    }

    pub fn unregister(&self, req: TaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.unregister(req))
    }

    pub fn register(&self, req: RegisterTaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.register(req))
    }
}

/// Blocking wrapper for `ClusteredTasks`.
#[derive(Clone, Debug)]
pub struct BlockingClusteredTasks {
    inner: ClusteredTasks,
}

impl BlockingClusteredTasks {
    pub fn register(&self, req: RegisterClusteredTaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.register(req))
    }

    pub fn unregister(&self, req: UnregisterClusteredTaskRequest) -> ActionResult<()> {
        block_on_action(self.inner.unregister(req))
    }
}
