//! Settings engine
//!
//! Entry point owning both role contexts. Durable and shared scopes are
//! registered for both roles on construction; the session scope exists only
//! between [`SettingsEngine::begin_session`] and
//! [`SettingsEngine::end_session`].

use crate::config::EngineConfig;
use crate::context::RoleContext;
use crate::error::{SettingsError, SettingsResult};
use crate::store::ScopeStore;
use featsync_binder::FeatureSettings;
use featsync_document::{
    DirectoryLayout, FileStore, FsStore, PathResolver, Role, Scope, ScopedDocument, SessionId,
};
use std::fmt;
use std::sync::Arc;

/// Observable settings for both execution roles
pub struct SettingsEngine {
    config: EngineConfig,
    files: Arc<dyn FileStore>,
    session: Option<SessionId>,
    interactive: RoleContext,
    authoritative: RoleContext,
}

impl SettingsEngine {
    /// Engine over `files`, with durable and shared scopes registered
    #[must_use]
    pub fn new(config: EngineConfig, files: Arc<dyn FileStore>) -> Self {
        let mut engine = Self {
            config,
            files,
            session: None,
            interactive: RoleContext::new(Role::Interactive),
            authoritative: RoleContext::new(Role::Authoritative),
        };
        let layout = engine.config.layout();
        for role in Role::ALL {
            for scope in [Scope::Durable, Scope::Shared] {
                engine.register(scope, role, &layout);
            }
        }
        tracing::info!(
            root = %engine.config.root.display(),
            consumer = %engine.config.consumer,
            "settings engine started"
        );
        engine
    }

    /// Engine over plain files
    #[must_use]
    pub fn with_fs(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(FsStore::new()))
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Running session, if any
    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Context of `role`
    #[inline]
    #[must_use]
    pub fn context(&self, role: Role) -> &RoleContext {
        match role {
            Role::Interactive => &self.interactive,
            Role::Authoritative => &self.authoritative,
        }
    }

    /// Register session-scope stores for both roles
    ///
    /// # Errors
    /// Returns `SettingsError::SessionAlreadyActive` if a session is running
    pub fn begin_session(&mut self, session: SessionId) -> SettingsResult<()> {
        if let Some(active) = self.session {
            return Err(SettingsError::SessionAlreadyActive(active));
        }
        let layout = self.config.layout().with_session(session);
        for role in Role::ALL {
            self.register(Scope::Session, role, &layout);
        }
        self.session = Some(session);
        tracing::info!(%session, "settings session started");
        Ok(())
    }

    /// Dispose and drop both session-scope stores
    ///
    /// # Errors
    /// Returns `SettingsError::NoActiveSession` if no session is running
    pub fn end_session(&mut self) -> SettingsResult<SessionId> {
        let session = self.session.take().ok_or(SettingsError::NoActiveSession)?;
        for role in Role::ALL {
            self.context_mut(role).remove(Scope::Session);
        }
        tracing::info!(%session, "settings session ended");
        Ok(session)
    }

    /// Store of `role` for `scope`
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` for the session scope
    /// outside a session
    pub fn store(&self, role: Role, scope: Scope) -> SettingsResult<&Arc<ScopeStore>> {
        self.context(role).resolve(scope)
    }

    /// Live instance of `T` under its default feature name
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` for the session scope
    /// outside a session
    pub fn feature<T: FeatureSettings>(&self, role: Role, scope: Scope) -> SettingsResult<Arc<T>> {
        self.context(role).feature::<T>(scope)
    }

    /// Live instance of `T` stored under `feature`
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` for the session scope
    /// outside a session
    pub fn feature_named<T: FeatureSettings>(
        &self,
        role: Role,
        scope: Scope,
        feature: &str,
    ) -> SettingsResult<Arc<T>> {
        self.context(role).feature_named::<T>(scope, feature)
    }

    /// Copy one scope's document over another's, for one role
    ///
    /// # Errors
    /// - `SettingsError::ScopeNotRegistered` if either scope has no store
    /// - `SettingsError::Document` if the copy fails
    pub fn copy_scope(&self, role: Role, from: Scope, to: Scope) -> SettingsResult<()> {
        self.context(role).copy_scope(from, to)
    }

    /// Dispose every store of both roles
    ///
    /// Stores stay registered; lookups afterwards bind fresh instances.
    pub fn dispose(&self) {
        for role in Role::ALL {
            self.context(role).dispose();
        }
    }

    fn context_mut(&mut self, role: Role) -> &mut RoleContext {
        match role {
            Role::Interactive => &mut self.interactive,
            Role::Authoritative => &mut self.authoritative,
        }
    }

    fn register(&mut self, scope: Scope, role: Role, layout: &DirectoryLayout) {
        let path = layout.resolve(scope, role, &self.config.file_name);
        let document =
            ScopedDocument::open(Arc::clone(&self.files), path).with_pretty(self.config.pretty);
        let store = ScopeStore::new(scope, role, document);
        if let Err(e) = self.context_mut(role).set(store) {
            // Stores are built for the context they are registered in.
            tracing::error!(error = %e, "scope store registration failed");
        }
    }
}

impl Drop for SettingsEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SettingsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsEngine")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("interactive", &self.interactive.scopes())
            .field("authoritative", &self.authoritative.scopes())
            .finish_non_exhaustive()
    }
}
