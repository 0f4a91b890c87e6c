//! Featsync Binder
//!
//! Makes plain feature settings types observable without them implementing
//! any notification contract of their own.
//!
//! # Core Concepts
//!
//! - [`feature_settings!`]: declares a settings type; every field gets a
//!   getter and a `set_<field>` setter that reports the write to the
//!   instance's [`WriteHook`]
//! - [`FeatureSettings`]: what the store needs from a settings type (name,
//!   field list, JSON conversion, in-place hydration)
//! - [`InterceptionBinder`]: attaches handlers to instances, tracks which
//!   types are instrumented, and detaches everything on unbind
//! - [`Binding`]: per-instance handle with the active switch
//!
//! # Example
//!
//! ```rust,ignore
//! use featsync_binder::{feature_settings, InterceptionBinder};
//! use std::sync::Arc;
//!
//! feature_settings! {
//!     pub struct DisplaySettings {
//!         brightness: f64 = 1.0,
//!     }
//! }
//!
//! let binder = InterceptionBinder::new();
//! let display = Arc::new(DisplaySettings::new());
//! let binding = binder.bind(&display, "Display", |settings, field| {
//!     println!("{field} changed: {:?}", settings.field_value(field));
//! });
//! binding.set_active(true);
//! display.set_brightness(0.5); // handler runs here
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod binder;
pub mod error;
pub mod hook;
mod macros;
pub mod settings;

pub use binder::{Binding, InterceptionBinder};
pub use error::HydrateError;
pub use hook::{HookHandler, WriteHook};
pub use settings::FeatureSettings;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Support items for [`feature_settings!`] expansions
#[doc(hidden)]
pub mod __private {
    pub use paste::paste;
    pub use parking_lot::RwLock;
    pub use serde_json::{Map, Value};

    /// Encode one field, logging values JSON cannot represent
    pub fn encode_field<T: serde::Serialize>(type_name: &str, field: &str, value: &T) -> Value {
        serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(type_name, field, error = %e, "settings field is not representable");
            Value::Null
        })
    }

    /// Decode one field, `None` (logged) when the stored shape does not fit
    pub fn decode_field<T: serde::de::DeserializeOwned>(
        type_name: &str,
        key: &str,
        raw: &Value,
    ) -> Option<T> {
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(type_name, key, error = %e, "stored settings field ignored");
                None
            }
        }
    }
}
