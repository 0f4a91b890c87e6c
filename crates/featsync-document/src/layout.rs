//! Where each (scope, role) document lives
//!
//! Resolution is a pure function; nothing here touches the file system.

use crate::scope::{Role, Scope, SessionId};
use std::path::PathBuf;

/// Maps a (scope, role, file name) triple to a path
pub trait PathResolver: Send + Sync {
    /// Resolve the document path
    fn resolve(&self, scope: Scope, role: Role, file_name: &str) -> PathBuf;
}

/// Directory scheme used by the engine
///
/// ```text
/// durable:  <root>/<consumer>/<role>/<file>
/// shared:   <root>/shared/<role>/<file>
/// session:  <root>/<consumer>/sessions/<session>/<role>/<file>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    root: PathBuf,
    consumer: String,
    session: Option<SessionId>,
}

impl DirectoryLayout {
    /// Directory name used for session files when no session is bound
    pub const DETACHED_SESSION: &'static str = "detached";

    /// Layout rooted at `root` for one consumer
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, consumer: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            consumer: consumer.into(),
            session: None,
        }
    }

    /// Same layout bound to a session
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Bound session, if any
    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Consumer id
    #[inline]
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }
}

impl PathResolver for DirectoryLayout {
    fn resolve(&self, scope: Scope, role: Role, file_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        match scope {
            Scope::Shared => path.push("shared"),
            Scope::Durable => path.push(&self.consumer),
            Scope::Session => {
                path.push(&self.consumer);
                path.push("sessions");
                match self.session {
                    Some(session) => path.push(session.to_string()),
                    None => path.push(Self::DETACHED_SESSION),
                }
            }
        }
        path.push(role.as_str());
        path.push(file_name);
        path
    }
}
