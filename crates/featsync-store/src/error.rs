//! Error types for scope stores and the engine
//!
//! Data problems (unreadable documents, failed writes, stale subtrees) are
//! recovered inside the document layer and never show up here. What remains
//! are caller mistakes: asking for a scope that was never registered, mixing
//! roles, or naming a field the type does not have.

use featsync_document::{DocumentError, Role, Scope, SessionId};

/// Main settings error type
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No store registered for this (role, scope)
    #[error("scope {scope} is not registered for role {role}")]
    ScopeNotRegistered { role: Role, scope: Scope },

    /// A store of one role handed to the other
    #[error("store belongs to role {actual}, expected {expected}")]
    RoleMismatch { expected: Role, actual: Role },

    /// Session scope requested or ended with no session running
    #[error("no active session")]
    NoActiveSession,

    /// A session is already running
    #[error("session {0} is already active")]
    SessionAlreadyActive(SessionId),

    /// Callback registered for a field the type does not declare
    #[error("{type_name} has no field '{field}'")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    /// Strict document operation failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl SettingsError {
    /// Create scope-not-registered error
    #[inline]
    #[must_use]
    pub fn scope_not_registered(role: Role, scope: Scope) -> Self {
        Self::ScopeNotRegistered { role, scope }
    }

    /// Whether this is a caller mistake rather than an IO problem
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Document(_))
    }
}

/// Result type alias for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;
