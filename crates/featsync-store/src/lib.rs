//! Featsync Store
//!
//! Hands out live feature settings instances and keeps their scoped
//! documents in sync with every field write.
//!
//! # Core Concepts
//!
//! - [`SettingsEngine`]: owns one [`RoleContext`] per execution role and the
//!   session lifecycle
//! - [`RoleContext`]: scope → [`ScopeStore`] map of a single role
//! - [`ScopeStore`]: feature lookup for one (scope, role); binds instances so
//!   that each setter call saves the feature
//! - [`FeatureCache`]: one live instance per (type, feature name)
//!
//! # Example
//!
//! ```rust,ignore
//! use featsync_binder::feature_settings;
//! use featsync_store::{EngineConfig, SettingsEngine};
//! use featsync_document::{Role, Scope};
//!
//! feature_settings! {
//!     pub struct DisplaySettings {
//!         brightness: f64 = 1.0,
//!     }
//! }
//!
//! let engine = SettingsEngine::with_fs(EngineConfig::new().with_consumer("minimap"));
//! let display = engine.feature::<DisplaySettings>(Role::Interactive, Scope::Durable)?;
//! display.set_brightness(0.5); // {"Features":{"Display":{"Brightness":0.5}}}
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod feature;
pub mod store;

pub use cache::{FeatureCache, FeatureKey};
pub use config::EngineConfig;
pub use context::RoleContext;
pub use engine::SettingsEngine;
pub use error::{SettingsError, SettingsResult};
pub use feature::{BoundFeature, FieldCallback, FieldCallbacks};
pub use store::ScopeStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with feature settings
    pub use crate::config::EngineConfig;
    pub use crate::context::RoleContext;
    pub use crate::engine::SettingsEngine;
    pub use crate::error::{SettingsError, SettingsResult};
    pub use crate::store::ScopeStore;
    pub use featsync_binder::{feature_settings, FeatureSettings};
    pub use featsync_document::{Role, SaveOutcome, Scope, SessionId};
}
