//! Scopes, execution roles and session identity
//!
//! A [`Scope`] selects how long a settings document lives and who shares it;
//! a [`Role`] selects which of the two execution roles owns it. Together they
//! name exactly one document.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Lifetime and sharing class of a settings document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Tied to one hosted session, discarded when it ends
    Session,
    /// Persists across sessions for one consumer
    Durable,
    /// Persists across sessions and is shared by every consumer
    Shared,
}

impl Scope {
    /// All scopes, in registration order
    pub const ALL: [Scope; 3] = [Scope::Session, Scope::Durable, Scope::Shared];

    /// Stable lowercase name, used in paths and logs
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Session => "session",
            Scope::Durable => "durable",
            Scope::Shared => "shared",
        }
    }

    /// Whether documents of this scope outlive a session
    #[inline]
    #[must_use]
    pub fn is_persistent(self) -> bool {
        !matches!(self, Scope::Session)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two execution roles a process may host
///
/// Settings obtained under one role are never visible to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The user-facing side (rendering, input)
    Interactive,
    /// The side that owns the simulation state
    Authoritative,
}

impl Role {
    /// Both roles
    pub const ALL: [Role; 2] = [Role::Interactive, Role::Authoritative];

    /// Stable lowercase name, used in paths and logs
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Interactive => "interactive",
            Role::Authoritative => "authoritative",
        }
    }

    /// The other role
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Role::Interactive => Role::Authoritative,
            Role::Authoritative => Role::Interactive,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one hosted session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Fresh random session id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing id
    #[inline]
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
