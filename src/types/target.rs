use std::fmt;

/// Account used to authenticate a remote session.
#[derive(Clone, Eq, PartialEq)]
pub struct Credential {
    user: String,
    secret: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Principal, e.g. `CONTOSO\svc-tasks`.
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Where an action executes: the local machine or a named remote host.
///
/// A credential on a local target is kept but has no effect on the session; the session
/// factory reports that it was ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Target {
    host: Option<String>,
    credential: Option<Credential>,
}

impl Target {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn remote(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// `localhost` for local targets, the host name otherwise.
    pub fn display_name(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    pub(crate) fn set_host(&mut self, host: String) {
        self.host = Some(host);
    }

    pub(crate) fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A failover cluster that owns clustered scheduled tasks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterTarget {
    cluster: String,
    credential: Option<Credential>,
}

impl ClusterTarget {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Sessions for clustered tasks are opened against the cluster name.
    pub(crate) fn session_target(&self) -> Target {
        let target = Target::remote(self.cluster.clone());
        match &self.credential {
            Some(c) => target.with_credential(c.clone()),
            None => target,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn credential_debug_hides_secret() {
        let c = Credential::new("CONTOSO\\svc", "hunter2");
        let s = format!("{c:?}");
        assert!(s.contains("CONTOSO"));
        assert!(!s.contains("hunter2"));
    }

    #[test]
    fn local_target_keeps_credential() {
        let t = Target::local().with_credential(Credential::new("u", "p"));
        assert!(t.is_local());
        assert_eq!(t.display_name(), "localhost");
        assert_eq!(t.credential().map(Credential::user), Some("u"));
    }

    #[test]
    fn cluster_session_target_is_remote() {
        let c = ClusterTarget::new("CL01").with_credential(Credential::new("u", "p"));
        let t = c.session_target();
        assert_eq!(t.host(), Some("CL01"));
        assert_eq!(t.credential(), c.credential());
    }
}
