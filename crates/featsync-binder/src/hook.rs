//! Per-instance write hook
//!
//! Every settings instance carries one [`WriteHook`]. Setters call
//! [`WriteHook::notify`] after the value is stored; with no handler attached
//! that is a no-op.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Handler invoked with the name of the written field
pub type HookHandler = Arc<dyn Fn(&'static str) + Send + Sync>;

/// Slot holding the handler attached to one instance
///
/// Cloning shares the slot, so the binder can detach a handler from an
/// instance it does not own.
#[derive(Clone, Default)]
pub struct WriteHook {
    slot: Arc<RwLock<Option<HookHandler>>>,
}

impl WriteHook {
    /// Empty hook
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a write to `field`
    pub fn notify(&self, field: &'static str) {
        // Clone out so the handler may write other fields of the same instance.
        let handler = self.slot.read().clone();
        if let Some(handler) = handler {
            handler(field);
        }
    }

    /// Attach `handler`, replacing any previous one
    pub fn attach(&self, handler: HookHandler) {
        *self.slot.write() = Some(handler);
    }

    /// Remove the handler; returns whether one was attached
    pub fn detach(&self) -> bool {
        self.slot.write().take().is_some()
    }

    /// Whether a handler is attached
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Whether both hooks share one slot
    #[inline]
    #[must_use]
    pub fn same_slot(&self, other: &WriteHook) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for WriteHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHook")
            .field("attached", &self.is_attached())
            .finish()
    }
}
