use crate::capability::TaskCall;
use crate::confirm::{self, ConfirmMode, ConfirmPrompt, Gate, ImpactLevel};
use crate::types::request::{
    RegisterClusteredTaskRequest, RegisterTaskRequest, TaskRequest, UnregisterClusteredTaskRequest,
};
use crate::types::target::Target;
use crate::{ActionResult, Error, ErrorCategory, ErrorRecord, session, util};

use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ActionKind {
    Start,
    Stop,
    Enable,
    Disable,
    Unregister,
    Register,
    RegisterClustered,
    UnregisterClustered,
}

impl ActionKind {
    fn token(&self) -> &'static str {
        match self {
            ActionKind::Start => "ScheduledTaskStart",
            ActionKind::Stop => "ScheduledTaskStop",
            ActionKind::Enable => "ScheduledTaskEnable",
            ActionKind::Disable => "ScheduledTaskDisable",
            ActionKind::Unregister => "ScheduledTaskUnregister",
            ActionKind::Register => "ScheduledTaskRegister",
            ActionKind::RegisterClustered => "ClusteredScheduledTaskRegister",
            ActionKind::UnregisterClustered => "ClusteredScheduledTaskUnregister",
        }
    }

    fn error_id(&self, category: ErrorCategory) -> String {
        let suffix = match category {
            ErrorCategory::ValidationFailure => "InvalidArgument",
            ErrorCategory::SessionEstablishment => "SessionFailed",
            ErrorCategory::ConfirmationFailure => "ConfirmationFailed",
            _ => "Failed",
        };
        format!("{}{suffix}", self.token())
    }

    /// `None` means the action is not gated by confirmation.
    ///
    /// Clustered actions are ungated.
    fn impact(&self) -> Option<ImpactLevel> {
        match self {
            ActionKind::Stop | ActionKind::Disable | ActionKind::Unregister => {
                Some(ImpactLevel::Medium)
            }
            ActionKind::Start | ActionKind::Enable | ActionKind::Register => Some(ImpactLevel::Low),
            ActionKind::RegisterClustered | ActionKind::UnregisterClustered => None,
        }
    }
}

/// A validated action, ready for confirmation and invocation.
#[derive(Debug)]
struct Plan {
    kind: ActionKind,
    target: Target,
    call: TaskCall,
    confirm: ConfirmMode,
    impact: Option<ImpactLevel>,
    /// Name the error records point at.
    task: String,
}

#[derive(Clone, Debug)]
/// Scheduled task actions on the local machine or a remote host.
pub struct Tasks {
    inner: Arc<crate::Inner>,
}

impl Tasks {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    /// Start a task now.
    pub async fn start(&self, req: TaskRequest) -> ActionResult<()> {
        self.simple(ActionKind::Start, req).await
    }

    /// Stop all running instances of a task.
    ///
    /// Gated by confirmation at `ImpactLevel::Medium`. A declined or `WhatIf` request returns
    /// `Ok(())` without opening a session.
    pub async fn stop(&self, req: TaskRequest) -> ActionResult<()> {
        self.simple(ActionKind::Stop, req).await
    }

    pub async fn enable(&self, req: TaskRequest) -> ActionResult<()> {
        self.simple(ActionKind::Enable, req).await
    }

    pub async fn disable(&self, req: TaskRequest) -> ActionResult<()> {
        self.simple(ActionKind::Disable, req).await
    }

    /// Delete a task definition. Gated like `stop`.
    pub async fn unregister(&self, req: TaskRequest) -> ActionResult<()> {
        self.simple(ActionKind::Unregister, req).await
    }

    /// Register a task from its XML definition.
    ///
    /// With `overwrite`, an existing definition is replaced and the action is treated as
    /// high impact.
    pub async fn register(&self, req: RegisterTaskRequest) -> ActionResult<()> {
        let kind = ActionKind::Register;
        let RegisterTaskRequest {
            task,
            xml,
            user,
            overwrite,
        } = req;

        let path = validate_task(&self.inner, kind, &task)?;
        let checked = if xml.trim().is_empty() {
            Err(Error::invalid_input("task XML must not be empty"))
        } else if let Some(user) = &user {
            util::validate_no_control("task user", user)
        } else {
            Ok(())
        };
        checked.map_err(|e| invalid(&self.inner, kind, &task.name, e))?;

        let impact = if overwrite {
            ImpactLevel::High
        } else {
            ImpactLevel::Low
        };

        run(
            &self.inner,
            Plan {
                kind,
                task: task.name.clone(),
                call: TaskCall::Register {
                    name: task.name,
                    path,
                    xml,
                    user,
                    overwrite,
                },
                target: task.target,
                confirm: task.confirm,
                impact: Some(impact),
            },
        )
        .await
    }

    async fn simple(&self, kind: ActionKind, req: TaskRequest) -> ActionResult<()> {
        let path = validate_task(&self.inner, kind, &req)?;
        let name = req.name;
        let call = match kind {
            ActionKind::Start => TaskCall::Start {
                name: name.clone(),
                path,
            },
            ActionKind::Stop => TaskCall::Stop {
                name: name.clone(),
                path,
            },
            ActionKind::Enable => TaskCall::Enable {
                name: name.clone(),
                path,
            },
            ActionKind::Disable => TaskCall::Disable {
                name: name.clone(),
                path,
            },
            _ => TaskCall::Unregister {
                name: name.clone(),
                path,
            },
        };

        run(
            &self.inner,
            Plan {
                kind,
                target: req.target,
                call,
                confirm: req.confirm,
                impact: kind.impact(),
                task: name,
            },
        )
        .await
    }
}

#[derive(Clone, Debug)]
/// Clustered scheduled task actions.
///
/// Sessions are opened against the cluster name. These actions are not gated by confirmation.
pub struct ClusteredTasks {
    inner: Arc<crate::Inner>,
}

impl ClusteredTasks {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    pub async fn register(&self, req: RegisterClusteredTaskRequest) -> ActionResult<()> {
        let kind = ActionKind::RegisterClustered;
        let checked = util::validate_task_name(&req.name)
            .and_then(|_| util::validate_host("cluster", req.cluster.cluster()))
            .and_then(|_| {
                if req.xml.trim().is_empty() {
                    return Err(Error::invalid_input("task XML must not be empty"));
                }
                Ok(())
            })
            .and_then(|_| match (&req.resource, req.task_type) {
                (None, crate::ClusteredTaskType::ResourceSpecific) => Err(Error::invalid_input(
                    "resource is required for ResourceSpecific clustered tasks",
                )),
                (Some(resource), _) => util::validate_no_control("resource", resource),
                (None, _) => Ok(()),
            });
        checked.map_err(|e| invalid(&self.inner, kind, &req.name, e))?;

        run(
            &self.inner,
            Plan {
                kind,
                target: req.cluster.session_target(),
                task: req.name.clone(),
                call: TaskCall::RegisterClustered {
                    name: req.name,
                    cluster: req.cluster.cluster().to_string(),
                    xml: req.xml,
                    task_type: req.task_type,
                    resource: req.resource,
                },
                confirm: ConfirmMode::Default,
                impact: kind.impact(),
            },
        )
        .await
    }

    /// Remove a clustered task. Exactly one session is opened against the cluster before the
    /// unregister call, whether or not the call succeeds.
    pub async fn unregister(&self, req: UnregisterClusteredTaskRequest) -> ActionResult<()> {
        let kind = ActionKind::UnregisterClustered;
        util::validate_task_name(&req.name)
            .and_then(|_| util::validate_host("cluster", req.cluster.cluster()))
            .map_err(|e| invalid(&self.inner, kind, &req.name, e))?;

        run(
            &self.inner,
            Plan {
                kind,
                target: req.cluster.session_target(),
                task: req.name.clone(),
                call: TaskCall::UnregisterClustered {
                    name: req.name,
                    cluster: req.cluster.cluster().to_string(),
                },
                confirm: ConfirmMode::Default,
                impact: kind.impact(),
            },
        )
        .await
    }
}

fn validate_task(
    inner: &crate::Inner,
    kind: ActionKind,
    req: &TaskRequest,
) -> ActionResult<String> {
    let checked = util::validate_task_name(&req.name)
        .and_then(|_| match req.target.host() {
            Some(host) => util::validate_host("host", host),
            None => Ok(()),
        })
        .and_then(|_| util::resolve_task_path(req.path.as_deref()));
    checked.map_err(|e| invalid(inner, kind, &req.name, e))
}

fn invalid(inner: &crate::Inner, kind: ActionKind, task: &str, cause: Error) -> ErrorRecord {
    let category = ErrorCategory::ValidationFailure;
    inner
        .normalizer
        .normalize(cause, &kind.error_id(category), category, task)
}

async fn run(inner: &crate::Inner, plan: Plan) -> ActionResult<()> {
    let Plan {
        kind,
        target,
        call,
        confirm: mode,
        impact,
        task,
    } = plan;
    let verb = call.verb();
    let qualified = format!("{}{}", call.task_path().unwrap_or(""), task);

    if let Some(impact) = impact {
        let prompt = ConfirmPrompt {
            action: verb.to_string(),
            target: format!("{qualified} on {target}"),
            impact,
        };
        match confirm::gate(
            mode,
            inner.opts.confirm_threshold,
            &prompt,
            inner.confirmer.as_ref(),
            inner.trace.as_ref(),
        ) {
            Gate::Proceed => {}
            Gate::Declined => return Ok(()),
            Gate::Failed(cause) => {
                let category = ErrorCategory::ConfirmationFailure;
                return Err(inner.normalizer.normalize(
                    cause,
                    &kind.error_id(category),
                    category,
                    &task,
                ));
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::info!(action = verb, task = %qualified, host = %target, "scheduled task request");

    inner
        .trace
        .verbose(&format!("Starting {verb} for task '{qualified}'"));

    if target.is_local() && target.credential().is_some() {
        inner
            .trace
            .verbose("Credential supplied for a local target is ignored");
    }

    let host = target.display_name().to_string();
    let session = match inner
        .sessions
        .new_session(session::request_for(target, &inner.opts))
        .await
    {
        Ok(s) => s,
        Err(cause) => {
            let category = ErrorCategory::SessionEstablishment;
            return Err(inner.normalizer.normalize(
                cause,
                &kind.error_id(category),
                category,
                &host,
            ));
        }
    };

    inner.trace.verbose(&format!(
        "{verb}: task '{qualified}' on {host} (session {})",
        session.id()
    ));

    if let Err(cause) = inner.capability.invoke(&session, call).await {
        let category = ErrorCategory::OperationFailure;
        return Err(inner.normalizer.normalize(
            cause,
            &kind.error_id(category),
            category,
            &task,
        ));
    }

    inner
        .trace
        .verbose(&format!("Completed {verb} for task '{qualified}'"));

    #[cfg(feature = "tracing")]
    tracing::info!(action = verb, task = %qualified, %host, "scheduled task request done");

    Ok(())
}
