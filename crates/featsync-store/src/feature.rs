//! A live, bound feature instance
//!
//! [`BoundFeature`] is the binder record of one (type, feature name) pair in
//! one store: the shared instance, its binding and the per-field callbacks
//! run after each save.

use featsync_binder::{Binding, FeatureSettings};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback run with the new value of a written field
pub type FieldCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Per-field side-effect callbacks
#[derive(Default)]
pub struct FieldCallbacks {
    by_field: RwLock<HashMap<String, Vec<FieldCallback>>>,
}

impl FieldCallbacks {
    /// Add a callback for `field`
    pub fn register(&self, field: &str, callback: FieldCallback) {
        self.by_field
            .write()
            .entry(field.to_string())
            .or_default()
            .push(callback);
    }

    /// Callbacks for `field`, in registration order
    #[must_use]
    pub fn listeners(&self, field: &str) -> Vec<FieldCallback> {
        self.by_field.read().get(field).cloned().unwrap_or_default()
    }

    /// Number of callbacks across all fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_field.read().values().map(Vec::len).sum()
    }

    /// Whether no callback is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FieldCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCallbacks")
            .field("count", &self.len())
            .finish()
    }
}

/// One bound feature instance
pub struct BoundFeature<T: FeatureSettings> {
    feature: String,
    instance: Arc<T>,
    binding: Binding,
    callbacks: Arc<FieldCallbacks>,
}

impl<T: FeatureSettings> BoundFeature<T> {
    /// Assemble a record from its parts
    #[must_use]
    pub fn new(
        feature: impl Into<String>,
        instance: Arc<T>,
        binding: Binding,
        callbacks: Arc<FieldCallbacks>,
    ) -> Self {
        Self {
            feature: feature.into(),
            instance,
            binding,
            callbacks,
        }
    }

    /// Shared instance
    #[inline]
    #[must_use]
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    /// Field callbacks
    #[inline]
    #[must_use]
    pub fn callbacks(&self) -> &Arc<FieldCallbacks> {
        &self.callbacks
    }

    /// Binding of the instance
    #[inline]
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl<T: FeatureSettings> fmt::Debug for BoundFeature<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFeature")
            .field("feature", &self.feature)
            .field("binding", &self.binding)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a [`BoundFeature`] used for store-wide operations
pub(crate) trait LiveFeature: Send + Sync {
    /// Feature name
    fn feature(&self) -> &str;

    /// Binding of the instance
    fn binding(&self) -> &Binding;

    /// Replace the instance's values from `subtree` with the binding off
    ///
    /// A missing or unusable subtree resets the instance to defaults in
    /// memory only; the document is left as it is.
    fn reload(&self, subtree: Option<&Value>);
}

impl<T: FeatureSettings> LiveFeature for BoundFeature<T> {
    fn feature(&self) -> &str {
        &self.feature
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn reload(&self, subtree: Option<&Value>) {
        let was_active = self.binding.is_active();
        self.binding.set_active(false);

        let hydrated = subtree.is_some_and(|value| match self.instance.hydrate(value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(feature = %self.feature, error = %e, "stored feature unusable, resetting to defaults");
                false
            }
        });
        if !hydrated {
            if let Err(e) = self.instance.hydrate(&T::defaults().to_value()) {
                tracing::warn!(feature = %self.feature, error = %e, "defaults could not be applied");
            }
        }

        self.binding.set_active(was_active);
    }
}
