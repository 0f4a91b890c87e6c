//! Scope store
//!
//! One store per (scope, role): it owns the scope's document, the feature
//! cache and the binder that instruments instances handed out from it.
//!
//! # Lookup
//!
//! ```text
//! feature::<T>(name)
//!   → FeatureCache hit?  ─yes→ cached Arc<T>
//!   → no: document.get(name) → from_value / persist defaults
//!         → binder.bind(instance, save-handler) → activate → cache
//! ```

use crate::cache::FeatureCache;
use crate::error::{SettingsError, SettingsResult};
use crate::feature::{BoundFeature, FieldCallbacks};
use featsync_binder::{FeatureSettings, InterceptionBinder};
use featsync_document::{Role, SaveOutcome, Scope, ScopedDocument};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Feature lookup and persistence for one scope and role
pub struct ScopeStore {
    scope: Scope,
    role: Role,
    document: Arc<ScopedDocument>,
    cache: FeatureCache,
    binder: InterceptionBinder,
}

impl ScopeStore {
    /// Store over `document`
    #[must_use]
    pub fn new(scope: Scope, role: Role, document: ScopedDocument) -> Self {
        tracing::debug!(%scope, %role, path = %document.path().display(), "opening scope store");
        Self {
            scope,
            role,
            document: Arc::new(document),
            cache: FeatureCache::new(),
            binder: InterceptionBinder::new(),
        }
    }

    /// Scope of this store
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Role owning this store
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Backing document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &ScopedDocument {
        &self.document
    }

    /// Feature cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Binder instrumenting this store's instances
    #[inline]
    #[must_use]
    pub fn binder(&self) -> &InterceptionBinder {
        &self.binder
    }

    /// Live instance of `T` under its default feature name
    ///
    /// See [`ScopeStore::feature_named`].
    #[must_use]
    pub fn feature<T: FeatureSettings>(&self) -> Arc<T> {
        self.feature_named::<T>(T::default_feature_name())
    }

    /// Live instance of `T` stored under `feature`
    ///
    /// The first call reads the feature's subtree (persisting defaults when
    /// it is missing or unusable), binds the instance and caches it; every
    /// later call returns the same `Arc`. From then on each setter call on
    /// the instance saves the feature synchronously.
    #[must_use]
    pub fn feature_named<T: FeatureSettings>(&self, feature: &str) -> Arc<T> {
        self.cache
            .get_or_create::<T, _>(feature, || self.create_bound::<T>(feature))
    }

    /// Whether feature `feature` of `T` is live in this store
    #[must_use]
    pub fn is_live<T: FeatureSettings>(&self, feature: &str) -> bool {
        self.cache.contains::<T>(feature)
    }

    /// Persist `instance` under its type's default feature name
    pub fn save<T: FeatureSettings>(&self, instance: &T) -> SaveOutcome {
        self.save_named(instance, T::default_feature_name())
    }

    /// Persist `instance` under `feature`, bypassing interception
    pub fn save_named<T: FeatureSettings>(&self, instance: &T, feature: &str) -> SaveOutcome {
        self.document.save(feature, instance.to_value())
    }

    /// Run `callback` with the new value after every save triggered by a
    /// write to `field` of feature `feature`
    ///
    /// Binds the feature if it is not live yet.
    ///
    /// # Errors
    /// Returns `SettingsError::UnknownField` if `T` has no such field
    pub fn on_field_changed<T, F>(&self, feature: &str, field: &str, callback: F) -> SettingsResult<()>
    where
        T: FeatureSettings,
        F: Fn(&Value) + Send + Sync + 'static,
    {
        if !T::FIELDS.contains(&field) {
            return Err(SettingsError::UnknownField {
                type_name: T::TYPE_NAME,
                field: field.to_string(),
            });
        }

        let bound = self
            .cache
            .get_or_create_bound::<T, _>(feature, || self.create_bound::<T>(feature));
        bound.callbacks().register(field, Arc::new(callback));
        Ok(())
    }

    /// Re-read the document into every live instance without saving
    ///
    /// Changes still pending from a failed write are what the instance gets
    /// back. Features the document lacks reset to defaults in memory. If the
    /// document cannot be read, instances keep their current values.
    pub fn reload(&self) {
        let live = self.cache.live_features();
        tracing::debug!(scope = %self.scope, role = %self.role, features = live.len(), "reloading scope store");
        for feature in live {
            match self.document.try_get(feature.feature()) {
                Ok(subtree) => feature.reload(subtree.as_ref()),
                Err(e) => {
                    tracing::warn!(feature = feature.feature(), error = %e, "settings document unreadable, keeping live values");
                }
            }
        }
    }

    /// Replace this store's document with `source`'s, verbatim, then reload
    ///
    /// Live features the source lacks fall back to defaults in memory; the
    /// copied text is not touched.
    ///
    /// # Errors
    /// - `SettingsError::RoleMismatch` if `source` belongs to the other role
    /// - `SettingsError::Document` if the source cannot be read or the
    ///   target cannot be written
    pub fn copy_from(&self, source: &ScopeStore) -> SettingsResult<()> {
        if source.role != self.role {
            return Err(SettingsError::RoleMismatch {
                expected: self.role,
                actual: source.role,
            });
        }

        source.document.flush();
        let text = match source.document.read_text()? {
            Some(text) => text,
            None => serde_json::to_string(&ScopedDocument::skeleton())
                .map_err(featsync_document::DocumentError::from)?,
        };
        self.document.write_text(&text)?;
        tracing::info!(
            from = %source.scope,
            to = %self.scope,
            role = %self.role,
            "copied settings scope"
        );
        self.reload();
        Ok(())
    }

    /// Feature names live in this store
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.cache
            .keys()
            .into_iter()
            .map(|key| key.feature().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Silence and unbind every live instance, then clear the cache
    ///
    /// Instances handed out earlier stay usable; writing to them no longer
    /// saves anything. Calling this twice is harmless.
    pub fn dispose(&self) {
        let live = self.cache.live_features();
        if live.is_empty() {
            return;
        }

        for feature in &live {
            feature.binding().set_active(false);
        }
        for feature in &live {
            self.binder.unbind_type(feature.binding().type_id());
        }
        self.cache.clear();
        tracing::debug!(scope = %self.scope, role = %self.role, features = live.len(), "disposed scope store");
    }

    fn create_bound<T: FeatureSettings>(&self, feature: &str) -> BoundFeature<T> {
        let instance = match self.document.try_get(feature) {
            Ok(Some(subtree)) => match T::from_value(&subtree) {
                Ok(instance) => Arc::new(instance),
                Err(e) => {
                    tracing::warn!(feature, error = %e, "stored feature unusable, using defaults");
                    self.persist_defaults::<T>(feature)
                }
            },
            Ok(None) => self.persist_defaults::<T>(feature),
            Err(e) => {
                // Saving defaults now could overwrite a stored value we never saw.
                tracing::warn!(feature, error = %e, "settings document unreadable, using defaults unsaved");
                Arc::new(T::defaults())
            }
        };

        let callbacks = Arc::new(FieldCallbacks::default());
        let binding = {
            let document = Arc::clone(&self.document);
            let callbacks = Arc::clone(&callbacks);
            let name = feature.to_string();
            self.binder.bind(&instance, feature, move |instance: &T, field| {
                document.save(&name, instance.to_value());
                let listeners = callbacks.listeners(field);
                if !listeners.is_empty() {
                    let value = instance.field_value(field).unwrap_or(Value::Null);
                    for listener in listeners {
                        listener(&value);
                    }
                }
            })
        };

        // Activate only once hydration and binding are both done.
        binding.set_active(true);
        tracing::debug!(feature, type_name = T::TYPE_NAME, scope = %self.scope, role = %self.role, "feature bound");

        BoundFeature::new(feature, instance, binding, callbacks)
    }

    fn persist_defaults<T: FeatureSettings>(&self, feature: &str) -> Arc<T> {
        let instance = T::defaults();
        self.save_named(&instance, feature);
        Arc::new(instance)
    }
}

impl Drop for ScopeStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ScopeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStore")
            .field("scope", &self.scope)
            .field("role", &self.role)
            .field("document", &self.document)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featsync_document::MemoryStore;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    featsync_binder::feature_settings! {
        struct DisplaySettings {
            brightness: f64 = 1.0,
        }
    }

    featsync_binder::feature_settings! {
        struct AudioSettings {
            volume: i64 = 80,
            muted: bool = false,
        }
    }

    fn store_over(files: &Arc<MemoryStore>, scope: Scope) -> ScopeStore {
        let path = format!("{scope}.json");
        let document = ScopedDocument::open(files.clone(), path).with_pretty(false);
        ScopeStore::new(scope, Role::Interactive, document)
    }

    fn stored(files: &MemoryStore, scope: Scope) -> Value {
        serde_json::from_str(&files.contents(format!("{scope}.json")).unwrap()).unwrap()
    }

    #[test]
    fn first_lookup_persists_defaults() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);

        let display = store.feature::<DisplaySettings>();

        assert!((display.brightness() - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            stored(&files, Scope::Durable),
            json!({"Features": {"Display": {"Brightness": 1.0}}})
        );
        assert_eq!(files.total_writes(), 1);
    }

    #[test]
    fn existing_feature_hydrates_without_writing() {
        let files = Arc::new(
            MemoryStore::new().with_file("durable.json", r#"{"Features":{"Display":{"Brightness":0.3}}}"#),
        );
        let store = store_over(&files, Scope::Durable);

        let display = store.feature::<DisplaySettings>();

        assert!((display.brightness() - 0.3).abs() < f64::EPSILON);
        assert_eq!(files.total_writes(), 0);
    }

    #[test]
    fn unusable_subtree_is_replaced_by_defaults() {
        let files = Arc::new(
            MemoryStore::new().with_file("durable.json", r#"{"Features":{"Display":"broken"}}"#),
        );
        let store = store_over(&files, Scope::Durable);

        let display = store.feature::<DisplaySettings>();

        assert!((display.brightness() - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            stored(&files, Scope::Durable),
            json!({"Features": {"Display": {"Brightness": 1.0}}})
        );
    }

    #[test]
    fn every_write_saves_once() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let audio = store.feature::<AudioSettings>();
        let before = files.total_writes();

        audio.set_volume(20);
        assert_eq!(files.total_writes(), before + 1);
        audio.set_muted(true);
        assert_eq!(files.total_writes(), before + 2);

        assert_eq!(
            stored(&files, Scope::Durable)["Features"]["Audio"],
            json!({"Volume": 20, "Muted": true})
        );
    }

    #[test]
    fn lookups_share_one_instance() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);

        let a = store.feature::<DisplaySettings>();
        let b = store.feature_named::<DisplaySettings>("Display");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.binder().bound_instances::<DisplaySettings>(), 1);
    }

    #[test]
    fn one_type_under_two_names() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);

        let left = store.feature_named::<DisplaySettings>("LeftMonitor");
        let right = store.feature_named::<DisplaySettings>("RightMonitor");
        left.set_brightness(0.1);

        assert!((right.brightness() - 1.0).abs() < f64::EPSILON);
        assert_eq!(store.feature_names(), vec!["LeftMonitor", "RightMonitor"]);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"],
            json!({"LeftMonitor": {"Brightness": 0.1}, "RightMonitor": {"Brightness": 1.0}})
        );
    }

    #[test]
    fn explicit_save_bypasses_handler() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        store
            .on_field_changed::<DisplaySettings, _>("Display", "brightness", move |_| *counter.lock() += 1)
            .unwrap();

        let detached = DisplaySettings::new();
        detached.set_brightness(0.7);
        assert!(store.save_named(&detached, "Display").is_written());

        assert_eq!(*seen.lock(), 0);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"]["Display"],
            json!({"Brightness": 0.7})
        );
    }

    #[test]
    fn field_callbacks_run_after_save() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let disk = Arc::clone(&files);
        store
            .on_field_changed::<AudioSettings, _>("Audio", "volume", move |value| {
                let on_disk: Value = serde_json::from_str(&disk.contents("durable.json").unwrap()).unwrap();
                sink.lock().push((value.clone(), on_disk["Features"]["Audio"]["Volume"].clone()));
            })
            .unwrap();

        let audio = store.feature::<AudioSettings>();
        audio.set_volume(5);
        audio.set_muted(true);

        assert_eq!(*seen.lock(), vec![(json!(5), json!(5))]);
    }

    #[test]
    fn unknown_callback_field_is_rejected() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let err = store
            .on_field_changed::<AudioSettings, _>("Audio", "bass", |_| {})
            .unwrap_err();
        assert!(matches!(err, SettingsError::UnknownField { field, .. } if field == "bass"));
        assert!(!store.is_live::<AudioSettings>("Audio"));
    }

    #[test]
    fn dispose_silences_and_is_idempotent() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let display = store.feature::<DisplaySettings>();
        let before = files.total_writes();

        store.dispose();
        store.dispose();
        display.set_brightness(0.2);

        assert_eq!(files.total_writes(), before);
        assert!(store.cache().is_empty());
        assert_eq!(store.binder().instrumented_count(), 0);
        assert!(!display.write_hook().is_attached());
    }

    #[test]
    fn lookup_after_dispose_builds_fresh_instance() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let old = store.feature::<DisplaySettings>();
        old.set_brightness(0.4);
        store.dispose();

        let fresh = store.feature::<DisplaySettings>();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!((fresh.brightness() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn drop_disposes() {
        let files = Arc::new(MemoryStore::new());
        let display = {
            let store = store_over(&files, Scope::Durable);
            store.feature::<DisplaySettings>()
        };
        let before = files.total_writes();
        display.set_brightness(0.9);
        assert_eq!(files.total_writes(), before);
    }

    #[test]
    fn copy_from_replaces_document_and_reloads() {
        let files = Arc::new(MemoryStore::new());
        let session = store_over(&files, Scope::Session);
        let durable = store_over(&files, Scope::Durable);

        let live = durable.feature::<DisplaySettings>();
        session.feature::<DisplaySettings>().set_brightness(0.25);
        session.feature::<AudioSettings>().set_volume(3);
        let writes_before = files.total_writes();

        durable.copy_from(&session).unwrap();

        assert_eq!(
            files.contents("durable.json"),
            files.contents("session.json")
        );
        assert!((live.brightness() - 0.25).abs() < f64::EPSILON);
        // One verbatim copy, no saves from reloading.
        assert_eq!(files.total_writes(), writes_before + 1);

        live.set_brightness(0.5);
        assert_eq!(stored(&files, Scope::Durable)["Features"]["Audio"]["Volume"], json!(3));
    }

    #[test]
    fn copy_from_other_role_is_rejected() {
        let files = Arc::new(MemoryStore::new());
        let ours = store_over(&files, Scope::Durable);
        let theirs = ScopeStore::new(
            Scope::Session,
            Role::Authoritative,
            ScopedDocument::open(files.clone(), "theirs.json"),
        );

        let err = ours.copy_from(&theirs).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::RoleMismatch {
                expected: Role::Interactive,
                actual: Role::Authoritative
            }
        ));
    }

    #[test]
    fn write_failure_keeps_value_and_heals_later() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let display = store.feature::<DisplaySettings>();
        let audio = store.feature::<AudioSettings>();

        files.set_fail_writes(true);
        display.set_brightness(0.6);
        assert!((display.brightness() - 0.6).abs() < f64::EPSILON);
        assert!(store.document().has_pending());

        files.set_fail_writes(false);
        audio.set_volume(1);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"],
            json!({"Display": {"Brightness": 0.6}, "Audio": {"Volume": 1, "Muted": false}})
        );
    }

    #[test]
    fn reload_after_failed_write_keeps_pending_value() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let display = store.feature::<DisplaySettings>();
        let audio = store.feature::<AudioSettings>();

        files.set_fail_writes(true);
        display.set_brightness(0.6);
        files.set_fail_writes(false);

        store.reload();
        assert!((display.brightness() - 0.6).abs() < f64::EPSILON);

        audio.set_volume(1);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"]["Display"],
            json!({"Brightness": 0.6})
        );
        assert!((display.brightness() - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn lookup_after_dispose_sees_pending_value() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let display = store.feature::<DisplaySettings>();

        files.set_fail_writes(true);
        display.set_brightness(0.2);
        files.set_fail_writes(false);
        store.dispose();

        let fresh = store.feature::<DisplaySettings>();
        assert!((fresh.brightness() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn unreadable_document_on_lookup_keeps_stored_value() {
        let files = Arc::new(
            MemoryStore::new().with_file("durable.json", r#"{"Features":{"Display":{"Brightness":0.3}}}"#),
        );
        let store = store_over(&files, Scope::Durable);

        files.fail_next_reads(1);
        let display = store.feature::<DisplaySettings>();

        assert!((display.brightness() - 1.0).abs() < f64::EPSILON);
        assert_eq!(files.total_writes(), 0);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"]["Display"],
            json!({"Brightness": 0.3})
        );
    }

    #[test]
    fn reload_with_unreadable_document_keeps_live_values() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let display = store.feature::<DisplaySettings>();
        display.set_brightness(0.8);

        files.fail_next_reads(1);
        store.reload();
        assert!((display.brightness() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn callback_registered_on_cold_feature_is_kept() {
        let files = Arc::new(MemoryStore::new());
        let store = store_over(&files, Scope::Durable);
        let old = store.feature::<AudioSettings>();
        store.dispose();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .on_field_changed::<AudioSettings, _>("Audio", "muted", move |value| sink.lock().push(value.clone()))
            .unwrap();
        assert!(store.is_live::<AudioSettings>("Audio"));

        old.set_muted(true);
        assert!(seen.lock().is_empty());

        let audio = store.feature::<AudioSettings>();
        assert!(!Arc::ptr_eq(&old, &audio));
        audio.set_muted(true);
        assert_eq!(*seen.lock(), vec![json!(true)]);
    }

    #[test]
    fn copy_from_leaves_missing_features_out_of_the_copy() {
        let files = Arc::new(MemoryStore::new());
        let session = store_over(&files, Scope::Session);
        let durable = store_over(&files, Scope::Durable);

        let audio = durable.feature::<AudioSettings>();
        audio.set_volume(5);
        session.feature::<DisplaySettings>().set_brightness(0.4);
        let writes_before = files.total_writes();

        durable.copy_from(&session).unwrap();

        assert_eq!(files.contents("durable.json"), files.contents("session.json"));
        assert_eq!(files.total_writes(), writes_before + 1);
        assert_eq!(audio.volume(), 80);
        assert!(stored(&files, Scope::Durable)["Features"].get("Audio").is_none());

        audio.set_volume(6);
        assert_eq!(
            stored(&files, Scope::Durable)["Features"],
            json!({"Display": {"Brightness": 0.4}, "Audio": {"Volume": 6, "Muted": false}})
        );
    }
}
