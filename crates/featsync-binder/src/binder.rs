//! Interception binder
//!
//! Routes every field write on a bound instance to a handler. The binder
//! keeps a registry of instrumented types, keyed by `TypeId`, so that a
//! type is instrumented once and a later [`InterceptionBinder::unbind`]
//! detaches every handler it installed for that type.
//!
//! The registry is owned by the binder value, not by the process: two
//! binders never see each other's types.

use crate::hook::{HookHandler, WriteHook};
use crate::settings::FeatureSettings;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Bookkeeping for one instrumented type
#[derive(Debug)]
struct Instrumented {
    type_name: &'static str,
    fields: &'static [&'static str],
    /// Hooks of every instance bound under this type
    hooks: Vec<WriteHook>,
}

/// Registry of instrumented settings types
#[derive(Debug, Default)]
pub struct InterceptionBinder {
    instrumented: Mutex<HashMap<TypeId, Instrumented>>,
}

impl InterceptionBinder {
    /// Create an empty binder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `on_changed` to `instance`
    ///
    /// Instruments `T` on first use; later binds of the same type only
    /// register the new handler. The returned binding starts inactive: writes
    /// are ignored until [`Binding::set_active`] turns it on.
    ///
    /// The handler holds the instance weakly, so a bound instance is freed
    /// once its last owner drops it.
    pub fn bind<T, F>(&self, instance: &Arc<T>, feature: &str, on_changed: F) -> Binding
    where
        T: FeatureSettings,
        F: Fn(&T, &'static str) + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(false));
        let handler: HookHandler = {
            let active = Arc::clone(&active);
            let instance = Arc::downgrade(instance);
            Arc::new(move |field| {
                if !active.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(instance) = instance.upgrade() {
                    on_changed(&instance, field);
                }
            })
        };

        let hook = instance.write_hook().clone();
        hook.attach(handler);

        let mut instrumented = self.instrumented.lock();
        let entry = instrumented.entry(TypeId::of::<T>()).or_insert_with(|| {
            tracing::debug!(type_name = T::TYPE_NAME, fields = T::FIELDS.len(), "instrumenting settings type");
            Instrumented {
                type_name: T::TYPE_NAME,
                fields: T::FIELDS,
                hooks: Vec::new(),
            }
        });
        if !entry.hooks.iter().any(|h| h.same_slot(&hook)) {
            entry.hooks.push(hook.clone());
        }

        Binding {
            type_id: TypeId::of::<T>(),
            type_name: T::TYPE_NAME,
            feature: feature.to_string(),
            active,
            hook,
        }
    }

    /// Detach every handler installed for `T`
    ///
    /// Returns whether `T` was instrumented; unbinding an unknown type is a
    /// no-op.
    pub fn unbind<T: FeatureSettings>(&self) -> bool {
        self.unbind_type(TypeId::of::<T>())
    }

    /// Detach every handler installed for the type with `type_id`
    pub fn unbind_type(&self, type_id: TypeId) -> bool {
        let removed = self.instrumented.lock().remove(&type_id);
        match removed {
            Some(entry) => {
                for hook in &entry.hooks {
                    hook.detach();
                }
                tracing::debug!(
                    type_name = entry.type_name,
                    instances = entry.hooks.len(),
                    "unbound settings type"
                );
                true
            }
            None => false,
        }
    }

    /// Detach everything
    pub fn unbind_all(&self) {
        let drained: Vec<_> = self.instrumented.lock().drain().collect();
        for (_, entry) in drained {
            for hook in &entry.hooks {
                hook.detach();
            }
        }
    }

    /// Whether `T` is instrumented
    #[must_use]
    pub fn is_instrumented<T: FeatureSettings>(&self) -> bool {
        self.instrumented.lock().contains_key(&TypeId::of::<T>())
    }

    /// Number of instrumented types
    #[must_use]
    pub fn instrumented_count(&self) -> usize {
        self.instrumented.lock().len()
    }

    /// Fields hooked for `T`, if instrumented
    #[must_use]
    pub fn hooked_fields<T: FeatureSettings>(&self) -> Option<&'static [&'static str]> {
        self.instrumented
            .lock()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.fields)
    }

    /// Number of instances bound under `T`
    #[must_use]
    pub fn bound_instances<T: FeatureSettings>(&self) -> usize {
        self.instrumented
            .lock()
            .get(&TypeId::of::<T>())
            .map_or(0, |entry| entry.hooks.len())
    }
}

/// Handle to one bound instance
///
/// Carries the active switch consulted on every intercepted write.
pub struct Binding {
    type_id: TypeId,
    type_name: &'static str,
    feature: String,
    active: Arc<AtomicBool>,
    hook: WriteHook,
}

impl Binding {
    /// Turn persistence for this instance on or off
    #[inline]
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether intercepted writes reach the handler
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the handler is still attached
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.hook.is_attached()
    }

    /// Feature name this instance was bound under
    #[inline]
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Bound type
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Bound type name
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("type_name", &self.type_name)
            .field("feature", &self.feature)
            .field("active", &self.is_active())
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    crate::feature_settings! {
        struct DisplaySettings {
            brightness: f64 = 1.0,
            contrast: u8 = 50,
        }
    }

    crate::feature_settings! {
        struct AudioSettings {
            volume: u8 = 80,
        }
    }

    type Log = Arc<Mutex<Vec<(String, &'static str)>>>;

    fn recorder(log: &Log, tag: &str) -> impl Fn(&DisplaySettings, &'static str) + Send + Sync + 'static {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        move |_, field| log.lock().push((tag.clone(), field))
    }

    #[test]
    fn inactive_binding_ignores_writes() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let display = Arc::new(DisplaySettings::new());
        let binding = binder.bind(&display, "Display", recorder(&log, "d"));

        display.set_brightness(0.2);
        display.set_contrast(10);
        assert!(log.lock().is_empty());
        assert!(!binding.is_active());

        binding.set_active(true);
        display.set_contrast(11);
        assert_eq!(*log.lock(), vec![("d".to_string(), "contrast")]);
    }

    #[test]
    fn every_field_is_hooked() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let display = Arc::new(DisplaySettings::new());
        binder.bind(&display, "Display", recorder(&log, "d")).set_active(true);

        display.set_brightness(0.5);
        display.set_contrast(1);

        let fields: Vec<_> = log.lock().iter().map(|(_, f)| *f).collect();
        assert_eq!(fields, vec!["brightness", "contrast"]);
        assert_eq!(
            binder.hooked_fields::<DisplaySettings>(),
            Some(&["brightness", "contrast"][..])
        );
    }

    #[test]
    fn handler_sees_new_value() {
        let binder = InterceptionBinder::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let display = Arc::new(DisplaySettings::new());
        binder
            .bind(&display, "Display", move |d, field| {
                *sink.lock() = d.field_value(field);
            })
            .set_active(true);

        display.set_brightness(0.75);
        assert_eq!(*seen.lock(), Some(serde_json::json!(0.75)));
    }

    #[test]
    fn type_is_instrumented_once() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let a = Arc::new(DisplaySettings::new());
        let b = Arc::new(DisplaySettings::new());

        binder.bind(&a, "DisplayA", recorder(&log, "a")).set_active(true);
        binder.bind(&b, "DisplayB", recorder(&log, "b")).set_active(true);

        assert_eq!(binder.instrumented_count(), 1);
        assert_eq!(binder.bound_instances::<DisplaySettings>(), 2);

        a.set_contrast(1);
        b.set_contrast(2);
        assert_eq!(
            *log.lock(),
            vec![("a".to_string(), "contrast"), ("b".to_string(), "contrast")]
        );
    }

    #[test]
    fn rebinding_same_instance_replaces_handler() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let display = Arc::new(DisplaySettings::new());

        binder.bind(&display, "Display", recorder(&log, "first")).set_active(true);
        binder.bind(&display, "Display", recorder(&log, "second")).set_active(true);
        assert_eq!(binder.bound_instances::<DisplaySettings>(), 1);

        display.set_contrast(3);
        assert_eq!(*log.lock(), vec![("second".to_string(), "contrast")]);
    }

    #[test]
    fn unbind_detaches_and_is_idempotent() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let display = Arc::new(DisplaySettings::new());
        let audio = Arc::new(AudioSettings::new());

        let binding = binder.bind(&display, "Display", recorder(&log, "d"));
        binding.set_active(true);
        binder.bind(&audio, "Audio", |_, _| {}).set_active(true);

        assert!(binder.unbind::<DisplaySettings>());
        assert!(!binding.is_attached());
        assert!(!binder.is_instrumented::<DisplaySettings>());
        assert!(binder.is_instrumented::<AudioSettings>());

        display.set_brightness(0.1);
        assert!(log.lock().is_empty());

        assert!(!binder.unbind::<DisplaySettings>());
    }

    #[test]
    fn unbind_of_never_bound_type_is_noop() {
        let binder = InterceptionBinder::new();
        assert!(!binder.unbind::<AudioSettings>());
        assert_eq!(binder.instrumented_count(), 0);
    }

    #[test]
    fn unbind_all_clears_registry() {
        let binder = InterceptionBinder::new();
        let display = Arc::new(DisplaySettings::new());
        let audio = Arc::new(AudioSettings::new());
        binder.bind(&display, "Display", |_, _| {});
        binder.bind(&audio, "Audio", |_, _| {});

        binder.unbind_all();
        assert_eq!(binder.instrumented_count(), 0);
        assert!(!display.write_hook().is_attached());
        assert!(!audio.write_hook().is_attached());
    }

    #[test]
    fn binders_are_independent() {
        let first = InterceptionBinder::new();
        let second = InterceptionBinder::new();
        let a = Arc::new(DisplaySettings::new());
        let b = Arc::new(DisplaySettings::new());
        first.bind(&a, "Display", |_, _| {});
        second.bind(&b, "Display", |_, _| {});

        first.unbind::<DisplaySettings>();
        assert!(!a.write_hook().is_attached());
        assert!(b.write_hook().is_attached());
        assert!(second.is_instrumented::<DisplaySettings>());
    }

    #[test]
    fn dropped_instance_makes_handler_inert() {
        let binder = InterceptionBinder::new();
        let log = Log::default();
        let display = Arc::new(DisplaySettings::new());
        let hook = display.write_hook().clone();
        binder.bind(&display, "Display", recorder(&log, "d")).set_active(true);

        drop(display);
        hook.notify("brightness");
        assert!(log.lock().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_active_writes_notify_exactly_once(
            writes in proptest::collection::vec((proptest::bool::ANY, 0u8..=255), 0..40),
        ) {
            let binder = InterceptionBinder::new();
            let log = Log::default();
            let display = Arc::new(DisplaySettings::new());
            let binding = binder.bind(&display, "Display", recorder(&log, "d"));

            let mut expected = 0;
            for (active, contrast) in writes {
                binding.set_active(active);
                display.set_contrast(contrast);
                if active {
                    expected += 1;
                }
                proptest::prop_assert_eq!(display.contrast(), contrast);
            }
            proptest::prop_assert_eq!(log.lock().len(), expected);
        }
    }
}
