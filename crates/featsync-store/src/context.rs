//! Role context
//!
//! Each execution role owns its own [`RoleContext`], mapping scopes to that
//! role's stores. There is no shared map behind it: a context is a plain
//! value passed to the code running under its role, so resolving a scope
//! can never return the other role's store.

use crate::error::{SettingsError, SettingsResult};
use crate::store::ScopeStore;
use featsync_binder::FeatureSettings;
use featsync_document::{Role, Scope};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scope stores of one execution role
#[derive(Debug)]
pub struct RoleContext {
    role: Role,
    stores: BTreeMap<Scope, Arc<ScopeStore>>,
}

impl RoleContext {
    /// Empty context for `role`
    #[inline]
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            stores: BTreeMap::new(),
        }
    }

    /// Role this context belongs to
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Register the store for its scope
    ///
    /// Returns the store it replaced, already disposed.
    ///
    /// # Errors
    /// Returns `SettingsError::RoleMismatch` if the store belongs to the
    /// other role
    pub fn set(&mut self, store: ScopeStore) -> SettingsResult<Option<Arc<ScopeStore>>> {
        if store.role() != self.role {
            return Err(SettingsError::RoleMismatch {
                expected: self.role,
                actual: store.role(),
            });
        }
        tracing::debug!(role = %self.role, scope = %store.scope(), "registering scope store");
        let previous = self.stores.insert(store.scope(), Arc::new(store));
        if let Some(previous) = &previous {
            previous.dispose();
        }
        Ok(previous)
    }

    /// Store registered for `scope`
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` if none is registered
    pub fn resolve(&self, scope: Scope) -> SettingsResult<&Arc<ScopeStore>> {
        self.stores
            .get(&scope)
            .ok_or_else(|| SettingsError::scope_not_registered(self.role, scope))
    }

    /// Unregister and dispose the store for `scope`
    pub fn remove(&mut self, scope: Scope) -> Option<Arc<ScopeStore>> {
        let removed = self.stores.remove(&scope)?;
        removed.dispose();
        Some(removed)
    }

    /// Whether `scope` has a store
    #[inline]
    #[must_use]
    pub fn is_registered(&self, scope: Scope) -> bool {
        self.stores.contains_key(&scope)
    }

    /// Registered scopes
    #[must_use]
    pub fn scopes(&self) -> Vec<Scope> {
        self.stores.keys().copied().collect()
    }

    /// Live instance of `T` in `scope`, under its default feature name
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` if `scope` has no store
    pub fn feature<T: FeatureSettings>(&self, scope: Scope) -> SettingsResult<Arc<T>> {
        Ok(self.resolve(scope)?.feature::<T>())
    }

    /// Live instance of `T` in `scope`, stored under `feature`
    ///
    /// # Errors
    /// Returns `SettingsError::ScopeNotRegistered` if `scope` has no store
    pub fn feature_named<T: FeatureSettings>(&self, scope: Scope, feature: &str) -> SettingsResult<Arc<T>> {
        Ok(self.resolve(scope)?.feature_named::<T>(feature))
    }

    /// Copy the document of `from` over the document of `to`
    ///
    /// # Errors
    /// - `SettingsError::ScopeNotRegistered` if either scope has no store
    /// - `SettingsError::Document` if the copy fails
    pub fn copy_scope(&self, from: Scope, to: Scope) -> SettingsResult<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if from == to {
            return Ok(());
        }
        target.copy_from(source)
    }

    /// Dispose every store of this role
    pub fn dispose(&self) {
        for store in self.stores.values() {
            store.dispose();
        }
    }
}
