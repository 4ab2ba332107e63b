use crate::types::target::Target;
use crate::{Result, TaskBusOptions};

use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// How a failure during session establishment is handled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorPolicy {
    /// Abort and report the failure; a partially opened session is never returned.
    #[default]
    Stop,
}

/// WS-Management authentication mechanism.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Authentication {
    #[default]
    Default,
    Negotiate,
    Kerberos,
    CredSsp,
    Basic,
}

impl Authentication {
    /// Value accepted by `New-CimSession -Authentication`.
    pub fn as_cim_str(&self) -> &'static str {
        match self {
            Authentication::Default => "Default",
            Authentication::Negotiate => "Negotiate",
            Authentication::Kerberos => "Kerberos",
            Authentication::CredSsp => "CredSsp",
            Authentication::Basic => "Basic",
        }
    }
}

/// Options applied identically to every session.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct SessionOptions {
    /// Timeout for session establishment and each CIM operation.
    pub operation_timeout: Duration,
    pub authentication: Authentication,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
            authentication: Authentication::Default,
        }
    }
}

/// Everything a [`SessionFactory`] needs to open a session.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct SessionRequest {
    pub target: Target,
    pub error_policy: ErrorPolicy,
    pub options: SessionOptions,
}

/// The only place a `SessionRequest` is built, so every action gets the same policy.
pub(crate) fn request_for(target: Target, opts: &TaskBusOptions) -> SessionRequest {
    SessionRequest {
        target,
        error_policy: ErrorPolicy::Stop,
        options: opts.session.clone(),
    }
}

/// Opens execution contexts for task actions.
///
/// For a remote target the session must be established eagerly: connectivity and
/// authentication failures are returned here, not on first use.
pub trait SessionFactory: Send + Sync + Debug {
    fn new_session(&self, request: SessionRequest) -> BoxFuture<'_, Result<SessionHandle>>;
}

/// Execution context bound to one target for the duration of one action.
///
/// Handles are not `Clone` and are dropped when the action returns. A factory may attach its
/// live connection as the handle's context; it is released together with the handle.
pub struct SessionHandle {
    id: u64,
    target: Target,
    options: SessionOptions,
    context: Option<Box<dyn Any + Send + Sync>>,
}

impl SessionHandle {
    /// Wrap an established session for `request`.
    ///
    /// Factories call this only once the session is known to be usable.
    pub fn open(request: SessionRequest) -> Self {
        Self {
            id: SESSION_COUNTER.fetch_add(1, Ordering::Relaxed),
            target: request.target,
            options: request.options,
            context: None,
        }
    }

    /// Attach the factory's live connection to this handle.
    pub fn with_context<C: Any + Send + Sync>(mut self, context: C) -> Self {
        self.context = Some(Box::new(context));
        self
    }

    /// The attached connection, if it is a `C`.
    pub fn context<C: Any>(&self) -> Option<&C> {
        self.context.as_deref()?.downcast_ref::<C>()
    }

    /// Process-unique session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn is_local(&self) -> bool {
        self.target.is_local()
    }

    pub fn host(&self) -> Option<&str> {
        self.target.host()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

impl Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("options", &self.options)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(session = self.id, host = %self.target, "session released");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::Credential;

    #[test]
    fn request_for_always_stops_on_error_and_copies_options() {
        let mut opts = TaskBusOptions::default();
        opts.session.operation_timeout = Duration::from_secs(7);
        opts.session.authentication = Authentication::Kerberos;

        let target = Target::remote("srv01").with_credential(Credential::new("u", "p"));
        let req = request_for(target.clone(), &opts);

        assert_eq!(req.error_policy, ErrorPolicy::Stop);
        assert_eq!(req.target, target);
        assert_eq!(req.options.operation_timeout, Duration::from_secs(7));
        assert_eq!(req.options.authentication, Authentication::Kerberos);
    }

    #[test]
    fn handles_get_distinct_ids() {
        let opts = TaskBusOptions::default();
        let a = SessionHandle::open(request_for(Target::local(), &opts));
        let b = SessionHandle::open(request_for(Target::remote("srv01"), &opts));

        assert_ne!(a.id(), b.id());
        assert!(a.is_local());
        assert_eq!(b.host(), Some("srv01"));
    }

    #[test]
    fn context_is_only_returned_as_its_own_type() {
        let opts = TaskBusOptions::default();
        let handle =
            SessionHandle::open(request_for(Target::local(), &opts)).with_context(7_u32);

        assert_eq!(handle.context::<u32>(), Some(&7));
        assert!(handle.context::<String>().is_none());
        assert!(format!("{handle:?}").contains("has_context: true"));
    }
}
